use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::source::SourceLocation;

const GIST_ROOT: &str = "https://gist.githubusercontent.com/erdevanshusharma";
const MAP_SEARCH: &str = "https://www.google.com/maps/search/";
const WEB_SEARCH: &str = "https://www.google.com/search";

/// Optional extras a subject's questions know how to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderHints {
    /// Explanations are markdown rather than plain text
    pub markdown: bool,
    /// Questions carry a `location` that can be opened on a map
    pub map_lookup: bool,
    /// Show `ponderingThought` and `experiment` after checking
    pub experiment_callout: bool,
    /// Offer a web search for the question's concept
    pub concept_lookup: bool,
}

impl Default for RenderHints {
    fn default() -> Self {
        Self {
            markdown: true,
            map_lookup: false,
            experiment_callout: false,
            concept_lookup: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfig {
    pub key: String,
    pub title: String,
    pub source: String,
    #[serde(default = "default_concept_label")]
    pub concept_label: String,
    #[serde(default)]
    pub hints: RenderHints,
}

fn default_concept_label() -> String {
    "Concept".to_string()
}

impl SubjectConfig {
    pub fn new(key: &str, title: &str, source: &str) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            source: source.to_string(),
            concept_label: default_concept_label(),
            hints: RenderHints::default(),
        }
    }

    pub fn with_hints(mut self, hints: RenderHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_concept_label(mut self, label: &str) -> Self {
        self.concept_label = label.to_string();
        self
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation::parse(&self.source)
    }
}

/// Ordered set of subjects offered in the picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectCatalog {
    subjects: Vec<SubjectConfig>,
}

impl SubjectCatalog {
    pub fn new(subjects: Vec<SubjectConfig>) -> Self {
        Self { subjects }
    }

    pub fn builtin() -> Self {
        let gist = |id: &str, file: &str| format!("{GIST_ROOT}/{id}/raw/{file}");

        Self::new(vec![
            SubjectConfig::new(
                "math",
                "Maths Challenge",
                &gist("104ae6bc9843f34512d0b1f559e7c582", "mathsQuestions.json"),
            ),
            SubjectConfig::new(
                "science",
                "Science Challenge",
                &gist("9e12748907fd91ce25a4d2fd23963e49", "scienceQuestions.json"),
            )
            .with_concept_label("Sense")
            .with_hints(RenderHints {
                experiment_callout: true,
                ..RenderHints::default()
            }),
            SubjectConfig::new(
                "geography",
                "Geography Challenge",
                &gist("84c09f63952963e9e7bb2d24c91b2e63", "geographyQuestions.json"),
            )
            .with_hints(RenderHints {
                map_lookup: true,
                ..RenderHints::default()
            }),
            SubjectConfig::new(
                "english",
                "English Grammar Challenge",
                &gist("32f73472dc5793a88a0c69eb449b791d", "englishGrammarQuestions.json"),
            )
            .with_hints(RenderHints {
                concept_lookup: true,
                ..RenderHints::default()
            }),
            SubjectConfig::new(
                "ethics",
                "Ethics Challenge",
                &gist("3e04a3e7e1085ce5c6b8d7f997f93422", "ethics.json"),
            ),
            SubjectConfig::new(
                "space",
                "Space Challenge",
                &gist("19a59404e47e9b8bd0d4172792a50bbc", "space.json"),
            ),
            SubjectConfig::new(
                "big-picture",
                "Big Picture Challenge",
                &gist("56a206859b9138a9d71d2420cbebe738", "bigPicture.json"),
            ),
            SubjectConfig::new("demo-math", "Offline Maths Warm-up", "bundled:math"),
            SubjectConfig::new("demo-science", "Offline Science Warm-up", "bundled:science")
                .with_concept_label("Sense")
                .with_hints(RenderHints {
                    experiment_callout: true,
                    ..RenderHints::default()
                }),
        ])
    }

    pub fn get(&self, key: &str) -> Option<&SubjectConfig> {
        self.subjects
            .iter()
            .find(|s| s.key.eq_ignore_ascii_case(key))
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.subjects
            .iter()
            .position(|s| s.key.eq_ignore_ascii_case(key))
    }

    pub fn first(&self) -> Option<&SubjectConfig> {
        self.subjects.first()
    }

    pub fn by_index(&self, index: usize) -> Option<&SubjectConfig> {
        self.subjects.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubjectConfig> {
        self.subjects.iter()
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Add or replace a subject, keyed case-insensitively.
    pub fn upsert(&mut self, subject: SubjectConfig) {
        match self.position(&subject.key) {
            Some(idx) => self.subjects[idx] = subject,
            None => self.subjects.push(subject),
        }
    }
}

impl Default for SubjectCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Map search for a question's `location` extra
pub fn map_lookup_url(location: &str) -> Option<String> {
    let location = location.trim();
    if location.is_empty() {
        return None;
    }
    Url::parse_with_params(MAP_SEARCH, &[("api", "1"), ("query", location)])
        .ok()
        .map(String::from)
}

/// Web search for an exact concept name
pub fn concept_lookup_url(concept: &str) -> Option<String> {
    let concept = concept.trim();
    if concept.is_empty() {
        return None;
    }
    let query = format!("\"{concept}\"");
    Url::parse_with_params(WEB_SEARCH, &[("q", query.as_str())])
        .ok()
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_starts_with_math() {
        let catalog = SubjectCatalog::builtin();
        assert_eq!(catalog.first().unwrap().key, "math");
        assert!(catalog.len() >= 7);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let catalog = SubjectCatalog::builtin();
        assert_eq!(catalog.get("Geography").unwrap().title, "Geography Challenge");
        assert_eq!(catalog.position("SCIENCE"), Some(1));
        assert!(catalog.get("history").is_none());
    }

    #[test]
    fn builtin_hints_follow_subject() {
        let catalog = SubjectCatalog::builtin();
        assert!(catalog.get("geography").unwrap().hints.map_lookup);
        assert!(catalog.get("science").unwrap().hints.experiment_callout);
        assert_eq!(catalog.get("science").unwrap().concept_label, "Sense");
        assert!(catalog.get("english").unwrap().hints.concept_lookup);
        assert!(catalog.get("math").unwrap().hints.markdown);
    }

    #[test]
    fn demo_subjects_are_bundled() {
        let catalog = SubjectCatalog::builtin();
        assert_eq!(
            catalog.get("demo-math").unwrap().location(),
            SourceLocation::Bundled("math".into())
        );
    }

    #[test]
    fn upsert_replaces_or_appends() {
        let mut catalog = SubjectCatalog::builtin();
        let before = catalog.len();

        catalog.upsert(SubjectConfig::new("MATH", "My Maths", "bundled:math"));
        assert_eq!(catalog.len(), before);
        assert_eq!(catalog.get("math").unwrap().title, "My Maths");

        catalog.upsert(SubjectConfig::new("history", "History", "/tmp/history.json"));
        assert_eq!(catalog.len(), before + 1);
    }

    #[test]
    fn subject_config_defaults_when_deserialized() {
        let cfg: SubjectConfig =
            serde_json::from_str(r#"{"key": "art", "title": "Art", "source": "art.json"}"#).unwrap();
        assert_eq!(cfg.concept_label, "Concept");
        assert_eq!(cfg.hints, RenderHints::default());
    }

    #[test]
    fn lookup_urls_are_encoded() {
        let url = map_lookup_url("Kathmandu, Nepal").unwrap();
        assert!(url.starts_with(MAP_SEARCH));
        assert!(url.contains("query=Kathmandu%2C+Nepal"));
        assert_eq!(map_lookup_url("  "), None);

        let url = concept_lookup_url("Past Perfect").unwrap();
        assert!(url.contains("q=%22Past+Perfect%22"));
        assert_eq!(concept_lookup_url(""), None);
    }
}
