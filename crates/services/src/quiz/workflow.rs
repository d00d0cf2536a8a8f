use std::sync::Arc;

use log::{debug, info, warn};
use quiz_core::Clock;
use quiz_core::model::{QuizId, QuizSettings, ScoreReport, ViewerContext};
use quiz_core::session::{Advance, QuizSession, SessionState};
use storage::repository::QuestionSource;

use super::pool::QuestionPoolService;
use super::sample::SessionSampler;
use crate::error::QuizFlowError;
use crate::grading::Grader;

/// Result of confirming an answer through the loop service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizStep {
    Moved { index: usize },
    Finished(ScoreReport),
}

/// Orchestrates loading, sampling, navigation and grading for quiz attempts.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    settings: QuizSettings,
    pool: QuestionPoolService,
    grader: Arc<dyn Grader>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: QuizSettings,
        source: Arc<dyn QuestionSource>,
        grader: Arc<dyn Grader>,
    ) -> Self {
        Self {
            clock,
            settings,
            pool: QuestionPoolService::new(source),
            grader,
        }
    }

    /// Open an attempt in `Loading` after checking the viewer may take the quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError::AccessDenied` for students not enrolled in the quiz.
    pub fn begin(
        &self,
        viewer: &ViewerContext,
        quiz_id: QuizId,
    ) -> Result<QuizSession, QuizFlowError> {
        if !viewer.can_take(&quiz_id) {
            warn!("user {} denied access to quiz {quiz_id}", viewer.user_id());
            return Err(QuizFlowError::AccessDenied {
                user_id: viewer.user_id().to_string(),
                quiz_id,
            });
        }
        let session = QuizSession::new(quiz_id, self.clock.now());
        info!(
            "attempt {} started on quiz {} by {}",
            session.attempt_id(),
            session.quiz_id(),
            viewer.user_id()
        );
        Ok(session)
    }

    /// Fetch, normalize and sample questions into a `Loading` session.
    ///
    /// Load failures end the session as unavailable rather than erroring.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError::Session` if the session was cancelled while
    /// loading or is not in `Loading`.
    pub async fn load_into(
        &self,
        session: &mut QuizSession,
    ) -> Result<SessionState, QuizFlowError> {
        let quiz_id = session.quiz_id().clone();
        let loaded = match self.pool.load_pool(&quiz_id).await {
            Ok(pool) => {
                let plan = SessionSampler::new(&self.settings).sample(pool.questions);
                debug!(
                    "attempt {}: sampled {} of {} questions",
                    session.attempt_id(),
                    plan.total(),
                    plan.pool_size
                );
                Ok(plan.presented())
            }
            Err(err) => {
                warn!("attempt {}: quiz unavailable: {err}", session.attempt_id());
                Err(err)
            }
        };

        if session.is_cancelled() {
            debug!("attempt {}: discarding late load", session.attempt_id());
        }
        let state = session.apply_load(loaded)?.clone();
        Ok(state)
    }

    /// Check access, open a session and load it.
    ///
    /// # Errors
    ///
    /// See [`Self::begin`] and [`Self::load_into`].
    pub async fn start(
        &self,
        viewer: &ViewerContext,
        quiz_id: QuizId,
    ) -> Result<QuizSession, QuizFlowError> {
        let mut session = self.begin(viewer, quiz_id)?;
        self.load_into(&mut session).await?;
        Ok(session)
    }

    /// Confirm the current selection; on the last question, grade and finish.
    ///
    /// A grading failure returns the session to its last question with the
    /// answer still selected so the caller can retry.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError::Session` for navigation errors (including
    /// `NoSelection`) and `QuizFlowError::Grading` when grading fails.
    pub async fn advance(&self, session: &mut QuizSession) -> Result<QuizStep, QuizFlowError> {
        let submission = match session.advance()? {
            Advance::Moved { index } => return Ok(QuizStep::Moved { index }),
            Advance::Submit(submission) => submission,
        };

        debug!(
            "attempt {}: submitting {} answers",
            session.attempt_id(),
            submission.answers.len()
        );
        let score = match self.grader.check_answers(&submission).await {
            Ok(score) => score,
            Err(err) => {
                warn!("attempt {}: grading failed: {err}", session.attempt_id());
                if let Err(resume) = session.resume_after_failed_submit() {
                    debug!("attempt {}: not resumed: {resume}", session.attempt_id());
                }
                return Err(err.into());
            }
        };

        if session.is_cancelled() {
            debug!("attempt {}: discarding late score", session.attempt_id());
        }
        session.finish(score, self.clock.now())?;
        let report = ScoreReport::new(score, &self.settings);
        info!(
            "attempt {} finished: {}/{} ({}%, {})",
            session.attempt_id(),
            report.score,
            report.total,
            report.percentage,
            if report.passed { "passed" } else { "failed" }
        );
        Ok(QuizStep::Finished(report))
    }

    /// # Errors
    ///
    /// Returns `QuizFlowError::Session` on the first question or outside `Active`.
    pub fn retreat(&self, session: &mut QuizSession) -> Result<usize, QuizFlowError> {
        Ok(session.retreat()?)
    }

    /// Select the option at a 1-based position of the current question.
    ///
    /// # Errors
    ///
    /// Returns `QuizFlowError::Session` for out-of-range positions.
    pub fn select_position(
        &self,
        session: &mut QuizSession,
        position: usize,
    ) -> Result<String, QuizFlowError> {
        session
            .select_position(position)
            .map(ToString::to_string)
            .map_err(QuizFlowError::from)
    }

    #[must_use]
    pub fn report(&self, session: &QuizSession) -> Option<ScoreReport> {
        session.report(&self.settings)
    }

    /// Mark the session as abandoned; later results are discarded.
    pub fn abandon(&self, session: &QuizSession) {
        session.cancel_handle().cancel();
        debug!("attempt {} abandoned", session.attempt_id());
    }
}
