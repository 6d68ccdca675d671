use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Smallest number of choices a multiple-choice question can carry
pub const MIN_OPTIONS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestionError {
    #[error("question needs at least {MIN_OPTIONS} options, got {count}")]
    TooFewOptions { count: usize },
    #[error("correct option {index} is out of range for {len} options")]
    CorrectIndexOutOfRange { index: usize, len: usize },
}

/// A single multiple-choice question, immutable once loaded.
///
/// Subject specific fields (`location`, `experiment`, `ponderingThought`, ...)
/// are kept verbatim in [`Question::extras`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawQuestion")]
pub struct Question {
    prompt: String,
    options: Vec<String>,
    correct_option_index: usize,
    concept: Option<String>,
    concept_summary: Option<String>,
    explanation: String,
    extras: BTreeMap<String, Value>,
}

impl Question {
    pub fn new(
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_option_index: usize,
    ) -> Result<Self, QuestionError> {
        if options.len() < MIN_OPTIONS {
            return Err(QuestionError::TooFewOptions {
                count: options.len(),
            });
        }
        if correct_option_index >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: correct_option_index,
                len: options.len(),
            });
        }

        Ok(Self {
            prompt: prompt.into(),
            options,
            correct_option_index,
            concept: None,
            concept_summary: None,
            explanation: String::new(),
            extras: BTreeMap::new(),
        })
    }

    pub fn with_concept(mut self, concept: impl Into<String>) -> Self {
        self.concept = Some(concept.into());
        self
    }

    pub fn with_concept_summary(mut self, summary: impl Into<String>) -> Self {
        self.concept_summary = Some(summary.into());
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    pub fn correct_option_index(&self) -> usize {
        self.correct_option_index
    }

    pub fn concept(&self) -> Option<&str> {
        self.concept.as_deref()
    }

    pub fn concept_summary(&self) -> Option<&str> {
        self.concept_summary.as_deref()
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn extras(&self) -> &BTreeMap<String, Value> {
        &self.extras
    }

    /// Text value of an extension field; non-empty strings only.
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn is_correct_option(&self, option_index: usize) -> bool {
        option_index == self.correct_option_index
    }
}

// Wire shape. The question banks grew per subject, so several spellings of the
// same field are accepted here and normalized before anything else sees them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    #[serde(alias = "prompt")]
    question: String,
    options: Vec<String>,
    #[serde(alias = "correctOptionIndex")]
    correct_answer: usize,
    #[serde(default, alias = "grammarConcept", alias = "sense")]
    concept: Option<String>,
    #[serde(default, alias = "conceptSummary")]
    concept_short_definition: Option<String>,
    #[serde(default)]
    explanation: String,
    #[serde(flatten)]
    extras: BTreeMap<String, Value>,
}

impl TryFrom<RawQuestion> for Question {
    type Error = QuestionError;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        let mut question = Question::new(raw.question, raw.options, raw.correct_answer)?;
        question.concept = raw.concept.filter(|c| !c.trim().is_empty());
        question.concept_summary = raw.concept_short_definition.filter(|c| !c.trim().is_empty());
        question.explanation = raw.explanation;
        question.extras = raw.extras;
        Ok(question)
    }
}
