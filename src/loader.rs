use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::bank::parse_bank;
use crate::question::Question;
use crate::session::{QuizSession, SessionOptions};
use crate::sound::SoundPort;
use crate::source::{QuestionSource, SourceLocation};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered with status {0}")]
    Status(u16),
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no bundled question bank named `{0}`")]
    UnknownBundle(String),
    #[error("response is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("unexpected document shape: {0}")]
    UnexpectedShape(String),
    #[error("question {} is invalid: {source}", .index + 1)]
    InvalidQuestion {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Coarse failure class shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum LoadErrorKind {
    #[strum(to_string = "could not reach question source")]
    Network,
    #[strum(to_string = "failed to parse question bank")]
    Parse,
}

impl LoadError {
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            LoadError::Http(_)
            | LoadError::Status(_)
            | LoadError::Io { .. }
            | LoadError::UnknownBundle(_) => LoadErrorKind::Network,
            LoadError::Parse(_)
            | LoadError::UnexpectedShape(_)
            | LoadError::InvalidQuestion { .. } => LoadErrorKind::Parse,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, LoadError::Http(_) | LoadError::Status(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

/// Fetch and parse a bank, retrying transient network failures.
pub fn load_with_retry(
    source: &dyn QuestionSource,
    location: &SourceLocation,
    policy: RetryPolicy,
) -> Result<Vec<Question>, LoadError> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match source.fetch(location).and_then(|bytes| parse_bank(&bytes)) {
            Ok(questions) => return Ok(questions),
            Err(err) if err.is_retryable() && attempt < attempts => {
                tracing::warn!(%location, attempt, error = %err, "load failed, retrying");
                thread::sleep(policy.backoff * attempt);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Identifies one load request; only the newest ticket is honored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub subject: String,
}

#[derive(Debug, Default)]
pub struct LoadTracker {
    current: u64,
}

impl LoadTracker {
    pub fn begin(&mut self, subject: impl Into<String>) -> LoadTicket {
        self.current += 1;
        LoadTicket {
            generation: self.current,
            subject: subject.into(),
        }
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.current
    }

    pub fn generation(&self) -> u64 {
        self.current
    }
}

/// Result of a background load, tagged with the ticket that requested it
#[derive(Debug)]
pub struct LoadOutcome {
    pub ticket: LoadTicket,
    pub result: Result<Vec<Question>, LoadError>,
}

/// Runs bank loads off the UI thread
pub struct Loader {
    source: Arc<dyn QuestionSource>,
    policy: RetryPolicy,
}

impl Loader {
    pub fn new(source: Arc<dyn QuestionSource>, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// Load on a fresh thread and deliver the outcome through `tx`.
    pub fn spawn<E>(&self, ticket: LoadTicket, location: SourceLocation, tx: Sender<E>)
    where
        E: From<LoadOutcome> + Send + 'static,
    {
        let source = Arc::clone(&self.source);
        let policy = self.policy;
        thread::spawn(move || {
            let result = load_with_retry(source.as_ref(), &location, policy);
            // receiver gone means the app is shutting down
            let _ = tx.send(E::from(LoadOutcome { ticket, result }));
        });
    }

    pub fn load_blocking(&self, location: &SourceLocation) -> Result<Vec<Question>, LoadError> {
        load_with_retry(self.source.as_ref(), location, self.policy)
    }
}

#[derive(Debug)]
pub enum LoadState {
    Idle,
    Loading { ticket: LoadTicket },
    Ready(QuizSession),
    Failed { error: LoadError, kind: LoadErrorKind },
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading { .. })
    }

    pub fn session(&self) -> Option<&QuizSession> {
        match self {
            LoadState::Ready(session) => Some(session),
            _ => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut QuizSession> {
        match self {
            LoadState::Ready(session) => Some(session),
            _ => None,
        }
    }
}

/// The active subject's load state plus the generation guard for it
pub struct SubjectSlot {
    tracker: LoadTracker,
    state: LoadState,
    subject: Option<String>,
    options: SessionOptions,
    sound: Rc<dyn SoundPort>,
}

impl SubjectSlot {
    pub fn new(options: SessionOptions, sound: Rc<dyn SoundPort>) -> Self {
        Self {
            tracker: LoadTracker::default(),
            state: LoadState::Idle,
            subject: None,
            options,
            sound,
        }
    }

    /// Start loading `subject`, discarding whatever session was active.
    pub fn begin(&mut self, subject: &str) -> LoadTicket {
        let ticket = self.tracker.begin(subject);
        tracing::info!(subject, generation = ticket.generation, "loading subject");
        self.subject = Some(subject.to_string());
        self.state = LoadState::Loading {
            ticket: ticket.clone(),
        };
        ticket
    }

    /// Apply a finished load. Returns false when the ticket is stale.
    pub fn complete(&mut self, outcome: LoadOutcome) -> bool {
        let LoadOutcome { ticket, result } = outcome;
        if !self.tracker.is_current(&ticket) {
            tracing::debug!(
                subject = %ticket.subject,
                generation = ticket.generation,
                current = self.tracker.generation(),
                "dropping stale load result"
            );
            return false;
        }

        self.state = match result {
            Ok(questions) => {
                tracing::info!(subject = %ticket.subject, count = questions.len(), "subject ready");
                LoadState::Ready(QuizSession::new(
                    questions,
                    self.options,
                    Rc::clone(&self.sound),
                ))
            }
            Err(error) => {
                let kind = error.kind();
                tracing::error!(subject = %ticket.subject, %error, "subject failed to load");
                LoadState::Failed { error, kind }
            }
        };
        true
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut LoadState {
        &mut self.state
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ScoringStrategy;
    use crate::sound::Silent;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::mpsc;

    struct Canned {
        calls: AtomicU32,
        responses: Vec<fn() -> Result<Vec<u8>, LoadError>>,
    }

    impl Canned {
        fn new(responses: Vec<fn() -> Result<Vec<u8>, LoadError>>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                responses,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl QuestionSource for Canned {
        fn fetch(&self, _location: &SourceLocation) -> Result<Vec<u8>, LoadError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            let respond = self.responses[n.min(self.responses.len() - 1)];
            respond()
        }
    }

    fn three_questions() -> Result<Vec<u8>, LoadError> {
        Ok(br#"{"data": [
            {"question": "a", "options": ["x", "y", "z"], "correctAnswer": 2},
            {"question": "b", "options": ["x", "y"], "correctAnswer": 0},
            {"question": "c", "options": ["x", "y"], "correctAnswer": 1}
        ]}"#
        .to_vec())
    }

    fn unavailable() -> Result<Vec<u8>, LoadError> {
        Err(LoadError::Status(503))
    }

    fn garbage() -> Result<Vec<u8>, LoadError> {
        Ok(b"not json".to_vec())
    }

    fn empty() -> Result<Vec<u8>, LoadError> {
        Ok(b"[]".to_vec())
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            attempts: 2,
            backoff: Duration::from_millis(1),
        }
    }

    fn loc() -> SourceLocation {
        SourceLocation::Http("https://example.test/bank.json".into())
    }

    fn slot() -> SubjectSlot {
        SubjectSlot::new(SessionOptions::default(), Rc::new(Silent))
    }

    #[test]
    fn retries_network_failure_once() {
        let source = Canned::new(vec![unavailable, three_questions]);
        let questions = load_with_retry(&source, &loc(), fast_retry()).unwrap();
        assert_eq!(questions.len(), 3);
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn gives_up_after_policy_attempts() {
        let source = Canned::new(vec![unavailable]);
        let err = load_with_retry(&source, &loc(), fast_retry()).unwrap_err();
        assert_matches!(err, LoadError::Status(503));
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn parse_errors_are_not_retried() {
        let source = Canned::new(vec![garbage, three_questions]);
        let err = load_with_retry(&source, &loc(), fast_retry()).unwrap_err();
        assert_eq!(err.kind(), LoadErrorKind::Parse);
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn tracker_generations_increase() {
        let mut tracker = LoadTracker::default();
        let first = tracker.begin("math");
        let second = tracker.begin("science");
        assert!(second.generation > first.generation);
        assert!(!tracker.is_current(&first));
        assert!(tracker.is_current(&second));
    }

    #[test]
    fn slot_moves_from_loading_to_ready() {
        let mut slot = slot();
        assert_matches!(slot.state(), LoadState::Idle);

        let ticket = slot.begin("math");
        assert!(slot.state().is_loading());
        assert_eq!(slot.subject(), Some("math"));

        let result = load_with_retry(&Canned::new(vec![three_questions]), &loc(), fast_retry());
        assert!(slot.complete(LoadOutcome { ticket, result }));
        let session = slot.state().session().unwrap();
        assert_eq!(session.len(), 3);
        assert_eq!(session.total_points(), 0);
    }

    #[test]
    fn stale_result_is_dropped() {
        let mut slot = slot();
        let stale = slot.begin("math");
        let current = slot.begin("science");

        let result = load_with_retry(&Canned::new(vec![three_questions]), &loc(), fast_retry());
        assert!(!slot.complete(LoadOutcome {
            ticket: stale,
            result
        }));
        assert_matches!(slot.state(), LoadState::Loading { ticket } if *ticket == current);
        assert_eq!(slot.subject(), Some("science"));
    }

    #[test]
    fn empty_bank_is_ready_with_zero_questions() {
        let mut slot = slot();
        let ticket = slot.begin("space");
        let result = load_with_retry(&Canned::new(vec![empty]), &loc(), fast_retry());
        slot.complete(LoadOutcome { ticket, result });

        let session = slot.state().session().unwrap();
        assert!(session.is_empty());
        assert_eq!(session.total_points(), 0);
        assert_eq!(session.max_points(), 0);
    }

    #[test]
    fn malformed_bank_fails_distinctly() {
        let mut slot = slot();
        let ticket = slot.begin("ethics");
        let result = load_with_retry(&Canned::new(vec![garbage]), &loc(), fast_retry());
        slot.complete(LoadOutcome { ticket, result });

        assert!(!slot.state().is_loading());
        assert!(slot.state().session().is_none());
        assert_matches!(
            slot.state(),
            LoadState::Failed {
                kind: LoadErrorKind::Parse,
                ..
            }
        );
    }

    #[test]
    fn unreachable_source_fails_with_network_kind() {
        let mut slot = slot();
        let ticket = slot.begin("ethics");
        let result = load_with_retry(&Canned::new(vec![unavailable]), &loc(), fast_retry());
        slot.complete(LoadOutcome { ticket, result });

        assert_matches!(
            slot.state(),
            LoadState::Failed {
                kind: LoadErrorKind::Network,
                error: LoadError::Status(503)
            }
        );
    }

    #[test]
    fn switching_subjects_resets_session_state() {
        let mut slot = slot();
        let ticket = slot.begin("math");
        let result = load_with_retry(&Canned::new(vec![three_questions]), &loc(), fast_retry());
        slot.complete(LoadOutcome { ticket, result });

        let session = slot.state_mut().session_mut().unwrap();
        session.select_option(0, 2).unwrap();
        session.reveal_explanation(0).unwrap();
        session.toggle_score(0).unwrap();
        assert_eq!(session.total_points(), 10);

        let ticket = slot.begin("science");
        let result = load_with_retry(&Canned::new(vec![three_questions]), &loc(), fast_retry());
        slot.complete(LoadOutcome { ticket, result });

        let session = slot.state().session().unwrap();
        assert_eq!(session.total_points(), 0);
        assert_eq!(session.answered_count(), 0);
        assert!((0..session.len()).all(|i| !session.is_explanation_visible(i)));
        assert!((0..session.len()).all(|i| !session.is_score_awarded(i)));
    }

    #[test]
    fn slot_sessions_use_configured_options() {
        let options = SessionOptions {
            scoring: ScoringStrategy::AutoGraded,
            ..SessionOptions::default()
        };
        let mut slot = SubjectSlot::new(options, Rc::new(Silent));
        let ticket = slot.begin("math");
        let result = load_with_retry(&Canned::new(vec![three_questions]), &loc(), fast_retry());
        slot.complete(LoadOutcome { ticket, result });

        assert_eq!(
            slot.state().session().unwrap().options().scoring,
            ScoringStrategy::AutoGraded
        );
    }

    #[test]
    fn loader_thread_delivers_outcome() {
        let loader = Loader::new(Arc::new(Canned::new(vec![three_questions])), fast_retry());
        let mut tracker = LoadTracker::default();
        let ticket = tracker.begin("math");
        let (tx, rx) = mpsc::channel::<LoadOutcome>();

        loader.spawn(ticket.clone(), loc(), tx);

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome.ticket, ticket);
        assert_eq!(outcome.result.unwrap().len(), 3);
    }
}
