use std::fmt;
use std::rc::Rc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::question::Question;
use crate::sound::{SoundCue, SoundPort};

pub const POINTS_PER_QUESTION: u32 = 10;
/// Upper bound accepted from the command line and config
pub const MAX_POINTS_PER_QUESTION: u32 = 1000;

/// How points get awarded
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ScoringStrategy {
    /// The user claims points after checking an answer, on their honor
    #[default]
    SelfReported,
    /// Points follow the answer key once the explanation is shown
    AutoGraded,
}

/// When the explanation of a question becomes visible
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RevealMode {
    #[default]
    OnCheck,
    OnSelect,
}

/// Whether answers can still change after the explanation is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerLock {
    #[default]
    Never,
    AfterReveal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    pub points_per_question: u32,
    pub scoring: ScoringStrategy,
    pub reveal: RevealMode,
    pub lock: AnswerLock,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            points_per_question: POINTS_PER_QUESTION,
            scoring: ScoringStrategy::default(),
            reveal: RevealMode::default(),
            lock: AnswerLock::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("question {index} does not exist ({len} loaded)")]
    QuestionOutOfRange { index: usize, len: usize },
    #[error("question {question} has no option {index} ({len} options)")]
    OptionOutOfRange {
        question: usize,
        index: usize,
        len: usize,
    },
    #[error("answer to question {question} is locked")]
    AnswerLocked { question: usize },
    #[error("points are awarded automatically in this session")]
    ManualScoringDisabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreState {
    Unclaimed,
    Claimed,
}

/// Where a single question sits in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionState {
    Unanswered,
    Answered { option: usize },
    ExplanationShown {
        option: Option<usize>,
        score: ScoreState,
    },
}

/// What a selection did besides recording the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Next question to bring into view, if any
    pub advance_to: Option<usize>,
}

/// Answer, reveal and scoring state for one loaded question set
pub struct QuizSession {
    questions: Vec<Question>,
    selected: Vec<Option<usize>>,
    explanation_visible: Vec<bool>,
    score_awarded: Vec<bool>,
    options: SessionOptions,
    sound: Rc<dyn SoundPort>,
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("questions", &self.questions.len())
            .field("selected", &self.selected)
            .field("explanation_visible", &self.explanation_visible)
            .field("score_awarded", &self.score_awarded)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl QuizSession {
    pub fn new(questions: Vec<Question>, options: SessionOptions, sound: Rc<dyn SoundPort>) -> Self {
        let len = questions.len();
        Self {
            questions,
            selected: vec![None; len],
            explanation_visible: vec![false; len],
            score_awarded: vec![false; len],
            options,
            sound,
        }
    }

    pub fn select_option(
        &mut self,
        question: usize,
        option: usize,
    ) -> Result<Selection, SessionError> {
        let q = self.question_checked(question)?;
        if option >= q.option_count() {
            return Err(SessionError::OptionOutOfRange {
                question,
                index: option,
                len: q.option_count(),
            });
        }
        if self.options.lock == AnswerLock::AfterReveal && self.explanation_visible[question] {
            return Err(SessionError::AnswerLocked { question });
        }

        self.selected[question] = Some(option);

        if self.options.reveal == RevealMode::OnSelect && !self.explanation_visible[question] {
            self.reveal(question);
        } else if self.explanation_visible[question] {
            self.grade(question);
        }

        let advance_to = (question + 1 < self.len()).then_some(question + 1);
        if advance_to.is_some() {
            self.sound.play(SoundCue::Advance);
        }
        Ok(Selection { advance_to })
    }

    /// Show the explanation for `question`. Repeated calls change nothing.
    pub fn reveal_explanation(&mut self, question: usize) -> Result<(), SessionError> {
        self.question_checked(question)?;
        if !self.explanation_visible[question] {
            self.reveal(question);
        }
        Ok(())
    }

    /// Claim or give back the points for `question`; returns the new claim state.
    pub fn toggle_score(&mut self, question: usize) -> Result<bool, SessionError> {
        self.question_checked(question)?;
        if self.options.scoring == ScoringStrategy::AutoGraded {
            return Err(SessionError::ManualScoringDisabled);
        }

        let awarded = !self.score_awarded[question];
        self.score_awarded[question] = awarded;
        self.sound.play(if awarded {
            SoundCue::PointsAdded
        } else {
            SoundCue::PointsRemoved
        });
        Ok(awarded)
    }

    /// `None` until the question has been answered
    pub fn is_correct(&self, question: usize) -> Option<bool> {
        let q = self.questions.get(question)?;
        self.selected[question].map(|option| q.is_correct_option(option))
    }

    pub fn question_state(&self, question: usize) -> Option<QuestionState> {
        let option = *self.selected.get(question)?;
        let state = if self.explanation_visible[question] {
            QuestionState::ExplanationShown {
                option,
                score: if self.score_awarded[question] {
                    ScoreState::Claimed
                } else {
                    ScoreState::Unclaimed
                },
            }
        } else if let Some(option) = option {
            QuestionState::Answered { option }
        } else {
            QuestionState::Unanswered
        };
        Some(state)
    }

    pub fn selected_option(&self, question: usize) -> Option<usize> {
        self.selected.get(question).copied().flatten()
    }

    pub fn is_explanation_visible(&self, question: usize) -> bool {
        self.explanation_visible.get(question).copied().unwrap_or(false)
    }

    pub fn is_score_awarded(&self, question: usize) -> bool {
        self.score_awarded.get(question).copied().unwrap_or(false)
    }

    pub fn total_points(&self) -> u32 {
        let claimed = self.score_awarded.iter().filter(|&&a| a).count() as u32;
        claimed.saturating_mul(self.options.points_per_question)
    }

    pub fn max_points(&self) -> u32 {
        u32::try_from(self.len())
            .unwrap_or(u32::MAX)
            .saturating_mul(self.options.points_per_question)
    }

    pub fn answered_count(&self) -> usize {
        self.selected.iter().filter(|s| s.is_some()).count()
    }

    pub fn question(&self, question: usize) -> Option<&Question> {
        self.questions.get(question)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    fn question_checked(&self, question: usize) -> Result<&Question, SessionError> {
        self.questions
            .get(question)
            .ok_or(SessionError::QuestionOutOfRange {
                index: question,
                len: self.questions.len(),
            })
    }

    fn reveal(&mut self, question: usize) {
        self.explanation_visible[question] = true;
        self.grade(question);
    }

    // Only auto-graded sessions derive points from the answer key.
    fn grade(&mut self, question: usize) {
        if self.options.scoring != ScoringStrategy::AutoGraded {
            return;
        }
        if let Some(correct) = self.is_correct(question) {
            self.score_awarded[question] = correct;
            self.sound.play(if correct {
                SoundCue::Correct
            } else {
                SoundCue::Incorrect
            });
        }
    }
}
