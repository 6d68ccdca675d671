use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use kwiz::config::Config;
use kwiz::loader::{LoadState, Loader, RetryPolicy, SubjectSlot};
use kwiz::runtime::{FixedTicker, QuizEvent, Runner, TestEventSource};
use kwiz::session::ScoringStrategy;
use kwiz::sound::{RecordingSound, SoundCue};
use kwiz::source::{DefaultSource, SourceLocation};
use kwiz::subject::SubjectCatalog;

fn runner() -> Runner<TestEventSource, FixedTicker> {
    Runner::new(TestEventSource::new(), FixedTicker::new(Duration::from_millis(5)))
}

fn loader() -> Loader {
    Loader::new(
        Arc::new(DefaultSource::new(false).unwrap()),
        RetryPolicy::no_retry(),
    )
}

// Drive the loop until the pending load lands, or give up after a bounded number of steps
fn pump_until_loaded(runner: &Runner<TestEventSource, FixedTicker>, slot: &mut SubjectSlot) -> bool {
    for _ in 0..400u32 {
        if let QuizEvent::Loaded(outcome) = runner.step() {
            if slot.complete(outcome) {
                return true;
            }
        }
    }
    false
}

// Headless flow: load a bundled bank through the background loader, answer and score it.
#[test]
fn headless_bundled_quiz_flow() {
    let sound = Rc::new(RecordingSound::default());
    let mut slot = SubjectSlot::new(Config::default().session_options(), sound.clone());
    let runner = runner();
    let loader = loader();

    let subject = SubjectCatalog::builtin().get("demo-math").cloned().unwrap();
    let ticket = slot.begin(&subject.key);
    loader.spawn(ticket, subject.location(), runner.sender());

    assert!(pump_until_loaded(&runner, &mut slot), "bank should load");
    let session = slot.state_mut().session_mut().expect("session ready");
    assert_eq!(session.len(), 4);
    assert_eq!(session.max_points(), 40);

    let correct = session.question(0).unwrap().correct_option_index();
    let selection = session.select_option(0, correct).unwrap();
    assert_eq!(selection.advance_to, Some(1));
    session.reveal_explanation(0).unwrap();
    assert!(session.toggle_score(0).unwrap());

    assert_eq!(session.total_points(), 10);
    assert_eq!(session.answered_count(), 1);
    assert_eq!(sound.cues(), vec![SoundCue::Advance, SoundCue::PointsAdded]);
}

#[test]
fn headless_switch_drops_stale_load() {
    let mut slot = SubjectSlot::new(Config::default().session_options(), Rc::new(RecordingSound::default()));
    let runner = runner();
    let loader = loader();

    let first = slot.begin("demo-math");
    loader.spawn(first, SourceLocation::Bundled("math".into()), runner.sender());
    let second = slot.begin("demo-science");
    loader.spawn(second, SourceLocation::Bundled("science".into()), runner.sender());

    assert!(pump_until_loaded(&runner, &mut slot));
    assert_eq!(slot.subject(), Some("demo-science"));
    assert_eq!(slot.state().session().unwrap().len(), 3);
}

#[test]
fn headless_auto_graded_flow() {
    let config = Config {
        scoring: ScoringStrategy::AutoGraded,
        ..Config::default()
    };
    let mut slot = SubjectSlot::new(config.session_options(), Rc::new(RecordingSound::default()));
    let runner = runner();

    let ticket = slot.begin("demo-science");
    loader().spawn(ticket, SourceLocation::Bundled("science".into()), runner.sender());
    assert!(pump_until_loaded(&runner, &mut slot));

    let session = slot.state_mut().session_mut().unwrap();
    let correct = session.question(2).unwrap().correct_option_index();
    let wrong = (correct + 1) % session.question(2).unwrap().option_count();

    session.select_option(2, wrong).unwrap();
    session.reveal_explanation(2).unwrap();
    assert_eq!(session.is_correct(2), Some(false));
    assert_eq!(session.total_points(), 0);

    session.select_option(2, correct).unwrap();
    assert_eq!(session.is_correct(2), Some(true));
    assert_eq!(session.total_points(), 10);
    assert!(session.toggle_score(2).is_err());
}

#[test]
fn headless_missing_file_fails_without_session() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.json");

    let mut slot = SubjectSlot::new(Config::default().session_options(), Rc::new(RecordingSound::default()));
    let runner = runner();
    let ticket = slot.begin("custom");
    loader().spawn(ticket, SourceLocation::File(missing), runner.sender());

    assert!(pump_until_loaded(&runner, &mut slot));
    assert!(matches!(slot.state(), LoadState::Failed { .. }));
    assert!(slot.state().session().is_none());
}
