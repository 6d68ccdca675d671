use std::cell::RefCell;
use std::io::{self, Write};

/// Feedback cues the quiz emits on user actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SoundCue {
    Advance,
    PointsAdded,
    PointsRemoved,
    Correct,
    Incorrect,
}

/// Audio output boundary. Implementations decide what (if anything) a cue sounds like.
pub trait SoundPort {
    fn play(&self, cue: SoundCue);
}

/// Plays nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl SoundPort for Silent {
    fn play(&self, _cue: SoundCue) {}
}

/// Rings the terminal bell for cues that reward or undo points
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl SoundPort for TerminalBell {
    fn play(&self, cue: SoundCue) {
        tracing::trace!(%cue, "sound cue");
        if matches!(cue, SoundCue::PointsAdded | SoundCue::Correct) {
            let mut out = io::stdout();
            let _ = out.write_all(b"\x07").and_then(|_| out.flush());
        }
    }
}

/// Remembers every cue, for tests and headless runs
#[derive(Debug, Default)]
pub struct RecordingSound {
    cues: RefCell<Vec<SoundCue>>,
}

impl RecordingSound {
    pub fn cues(&self) -> Vec<SoundCue> {
        self.cues.borrow().clone()
    }
}

impl SoundPort for RecordingSound {
    fn play(&self, cue: SoundCue) {
        self.cues.borrow_mut().push(cue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sound_keeps_order() {
        let sound = RecordingSound::default();
        sound.play(SoundCue::Advance);
        sound.play(SoundCue::PointsAdded);
        assert_eq!(sound.cues(), vec![SoundCue::Advance, SoundCue::PointsAdded]);
    }

    #[test]
    fn cue_display() {
        assert_eq!(SoundCue::PointsRemoved.to_string(), "PointsRemoved");
    }
}
