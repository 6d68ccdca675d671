use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::loader::RetryPolicy;
use crate::session::{
    AnswerLock, RevealMode, ScoringStrategy, SessionOptions, MAX_POINTS_PER_QUESTION,
    POINTS_PER_QUESTION,
};
use crate::subject::{SubjectCatalog, SubjectConfig};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub default_subject: String,
    /// Subject open when the app last exited; wins over `default_subject`
    pub last_subject: Option<String>,
    pub scoring: ScoringStrategy,
    pub reveal: RevealMode,
    pub lock_after_reveal: bool,
    pub points_per_question: u32,
    pub cache_bust: bool,
    pub sound: bool,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    /// Added to (or replacing, by key) the built-in subjects
    pub subjects: Vec<SubjectConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_subject: "math".to_string(),
            last_subject: None,
            scoring: ScoringStrategy::SelfReported,
            reveal: RevealMode::OnCheck,
            lock_after_reveal: false,
            points_per_question: POINTS_PER_QUESTION,
            cache_bust: true,
            sound: true,
            retry_attempts: 2,
            retry_backoff_ms: 500,
            subjects: Vec::new(),
        }
    }
}

impl Config {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            points_per_question: self.points_per_question.clamp(1, MAX_POINTS_PER_QUESTION),
            scoring: self.scoring,
            reveal: self.reveal,
            lock: if self.lock_after_reveal {
                AnswerLock::AfterReveal
            } else {
                AnswerLock::Never
            },
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts.max(1),
            backoff: std::time::Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn catalog(&self) -> SubjectCatalog {
        let mut catalog = SubjectCatalog::builtin();
        for subject in &self.subjects {
            catalog.upsert(subject.clone());
        }
        catalog
    }

    /// Subject to open on start: the last one used if it still exists.
    pub fn start_subject(&self, catalog: &SubjectCatalog) -> Option<String> {
        [self.last_subject.as_deref(), Some(self.default_subject.as_str())]
            .into_iter()
            .flatten()
            .find_map(|key| catalog.get(key))
            .or_else(|| catalog.first())
            .map(|s| s.key.clone())
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return Config::default(),
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "ignoring unreadable config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
