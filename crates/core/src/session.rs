use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    Answer, AnswerSheet, AttemptId, PresentedQuestion, QuizId, QuizSettings, Score, ScoreReport,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Why a quiz could not be opened.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LoadError {
    #[error("no questions exist for quiz {quiz_id}")]
    NotFound { quiz_id: QuizId },

    #[error("quiz {quiz_id} has {raw} records but {normalized} usable questions")]
    Malformed {
        quiz_id: QuizId,
        raw: usize,
        normalized: usize,
    },

    #[error("failed to fetch questions: {0}")]
    FetchFailed(String),
}

impl LoadError {
    /// Only transport failures are worth a manual retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoadError::FetchFailed(_))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("select an answer before continuing")]
    NoSelection,

    #[error("option {option:?} is not offered for the current question")]
    UnknownOption { option: String },

    #[error("option number {position} is out of range (1-{len})")]
    OptionOutOfRange { position: usize, len: usize },

    #[error("already at the first question")]
    AtFirstQuestion,

    #[error("cannot {operation} while the session is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },

    #[error("score total ({total}) exceeds session length ({len})")]
    ScoreExceedsSession { total: u32, len: usize },

    #[error("session was cancelled")]
    Cancelled,
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Scored(Score),
    Unavailable(LoadError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Active { index: usize },
    Submitting,
    Finished(SessionOutcome),
}

impl SessionState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Loading => "loading",
            SessionState::Active { .. } => "active",
            SessionState::Submitting => "submitting",
            SessionState::Finished(_) => "finished",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Finished(_))
    }
}

/// Answers handed to a grader once the last question is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub quiz_id: QuizId,
    pub answers: Vec<Answer>,
}

/// Result of confirming the current answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Moved { index: usize },
    Submit(Submission),
}

/// Progress snapshot for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub current: Option<usize>,
    pub is_complete: bool,
}

/// Shared flag telling a session its owner has gone away.
///
/// Results that arrive after cancellation are rejected with
/// `SessionError::Cancelled` and never mutate the session.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt at a sampled quiz.
///
/// Holds only presented questions; grading happens elsewhere against an
/// answer key the taker never sees.
pub struct QuizSession {
    attempt_id: AttemptId,
    quiz_id: QuizId,
    state: SessionState,
    questions: Vec<PresentedQuestion>,
    answers: AnswerSheet,
    selection: Option<String>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    cancel: CancelHandle,
}

impl QuizSession {
    #[must_use]
    pub fn new(quiz_id: QuizId, started_at: DateTime<Utc>) -> Self {
        Self {
            attempt_id: AttemptId::random(),
            quiz_id,
            state: SessionState::Loading,
            questions: Vec::new(),
            answers: AnswerSheet::new(),
            selection: None,
            started_at,
            completed_at: None,
            cancel: CancelHandle::default(),
        }
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn quiz_id(&self) -> &QuizId {
        &self.quiz_id
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn questions(&self) -> &[PresentedQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            SessionState::Active { index } => Some(index),
            _ => None,
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&PresentedQuestion> {
        self.current_index().and_then(|i| self.questions.get(i))
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current_index()
            .is_some_and(|i| i + 1 == self.questions.len())
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    #[must_use]
    pub fn score(&self) -> Option<Score> {
        match &self.state {
            SessionState::Finished(SessionOutcome::Scored(score)) => Some(*score),
            _ => None,
        }
    }

    #[must_use]
    pub fn report(&self, settings: &QuizSettings) -> Option<ScoreReport> {
        self.score().map(|score| ScoreReport::new(score, settings))
    }

    #[must_use]
    pub fn unavailable(&self) -> Option<&LoadError> {
        match &self.state {
            SessionState::Finished(SessionOutcome::Unavailable(err)) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            answered: self.answers.len(),
            current: self.current_index(),
            is_complete: self.is_finished(),
        }
    }

    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Accept the result of fetching the question sample.
    ///
    /// An empty sample or a load error ends the session as unavailable.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Cancelled` if the owner cancelled in the meantime,
    /// or `SessionError::InvalidTransition` outside `Loading`.
    pub fn apply_load(
        &mut self,
        loaded: Result<Vec<PresentedQuestion>, LoadError>,
    ) -> Result<&SessionState, SessionError> {
        self.ensure_live()?;
        if self.state != SessionState::Loading {
            return Err(self.invalid("load questions"));
        }

        self.state = match loaded {
            Ok(questions) if questions.is_empty() => {
                SessionState::Finished(SessionOutcome::Unavailable(LoadError::NotFound {
                    quiz_id: self.quiz_id.clone(),
                }))
            }
            Ok(questions) => {
                self.questions = questions;
                self.selection = None;
                SessionState::Active { index: 0 }
            }
            Err(err) => SessionState::Finished(SessionOutcome::Unavailable(err)),
        };
        Ok(&self.state)
    }

    /// Select an option of the current question by value.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownOption` if the option is not offered.
    pub fn select(&mut self, option: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_live()?;
        let index = self.active_index("select an option")?;
        let option = option.into();
        if !self.questions[index].has_option(&option) {
            return Err(SessionError::UnknownOption { option });
        }
        self.selection = Some(option);
        Ok(())
    }

    /// Select an option of the current question by its 1-based position.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::OptionOutOfRange` for positions outside the list.
    pub fn select_position(&mut self, position: usize) -> Result<&str, SessionError> {
        self.ensure_live()?;
        let index = self.active_index("select an option")?;
        let options = self.questions[index].options();
        let option = position
            .checked_sub(1)
            .and_then(|i| options.get(i))
            .ok_or(SessionError::OptionOutOfRange {
                position,
                len: options.len(),
            })?;
        Ok(self.selection.insert(option.clone()).as_str())
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `Active`.
    pub fn clear_selection(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.active_index("clear the selection")?;
        self.selection = None;
        Ok(())
    }

    /// Record the current selection and move on.
    ///
    /// On the last question the session moves to `Submitting` and returns
    /// the submission to grade. Otherwise the cursor moves forward and the
    /// selection is restored from any earlier answer to the next question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSelection` without changing anything when no
    /// option is selected.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        self.ensure_live()?;
        let index = self.active_index("advance")?;
        let Some(selected) = self.selection.clone() else {
            return Err(SessionError::NoSelection);
        };

        let question_id = self.questions[index].id().clone();
        self.answers.record(Answer::new(question_id, selected));

        if index + 1 >= self.questions.len() {
            self.state = SessionState::Submitting;
            return Ok(Advance::Submit(self.submission()));
        }

        let next = index + 1;
        self.state = SessionState::Active { index: next };
        self.selection = self.stored_answer(next);
        Ok(Advance::Moved { index: next })
    }

    /// Step back one question, restoring its recorded answer if there is one.
    ///
    /// The current selection is not recorded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AtFirstQuestion` on the first question.
    pub fn retreat(&mut self) -> Result<usize, SessionError> {
        self.ensure_live()?;
        let index = self.active_index("go back")?;
        if index == 0 {
            return Err(SessionError::AtFirstQuestion);
        }
        let prev = index - 1;
        self.state = SessionState::Active { index: prev };
        self.selection = self.stored_answer(prev);
        Ok(prev)
    }

    /// Store the graded score and end the attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ScoreExceedsSession` if the grader reports more
    /// answers than the session has questions.
    pub fn finish(
        &mut self,
        score: Score,
        completed_at: DateTime<Utc>,
    ) -> Result<Score, SessionError> {
        self.ensure_live()?;
        if self.state != SessionState::Submitting {
            return Err(self.invalid("finish"));
        }
        let total = usize::try_from(score.total()).unwrap_or(usize::MAX);
        if total > self.questions.len() {
            return Err(SessionError::ScoreExceedsSession {
                total: score.total(),
                len: self.questions.len(),
            });
        }
        self.state = SessionState::Finished(SessionOutcome::Scored(score));
        self.completed_at = Some(completed_at);
        Ok(score)
    }

    /// Return to the last question after grading failed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` outside `Submitting`.
    pub fn resume_after_failed_submit(&mut self) -> Result<usize, SessionError> {
        self.ensure_live()?;
        if self.state != SessionState::Submitting {
            return Err(self.invalid("resume"));
        }
        let last = self.questions.len().saturating_sub(1);
        self.state = SessionState::Active { index: last };
        self.selection = self.stored_answer(last);
        Ok(last)
    }

    #[must_use]
    pub fn submission(&self) -> Submission {
        Submission {
            quiz_id: self.quiz_id.clone(),
            answers: self.answers.as_slice().to_vec(),
        }
    }

    fn stored_answer(&self, index: usize) -> Option<String> {
        self.questions
            .get(index)
            .and_then(|q| self.answers.get(q.id()))
            .map(ToString::to_string)
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }
        Ok(())
    }

    fn active_index(&self, operation: &'static str) -> Result<usize, SessionError> {
        match self.state {
            SessionState::Active { index } => Ok(index),
            _ => Err(self.invalid(operation)),
        }
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            operation,
            state: self.state.name(),
        }
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("attempt_id", &self.attempt_id)
            .field("quiz_id", &self.quiz_id)
            .field("state", &self.state)
            .field("questions_len", &self.questions.len())
            .field("answers_len", &self.answers.len())
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
