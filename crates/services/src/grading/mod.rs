//! Server-side answer checking.
//!
//! Correct answers never reach a `QuizSession`; a submission is scored by a
//! `Grader` that holds or fetches the answer key on its own.

mod http;
mod local;

use async_trait::async_trait;
use quiz_core::model::Score;
use quiz_core::session::Submission;

use crate::error::GradingError;

pub use http::{HttpGrader, HttpGraderConfig};
pub use local::PoolGrader;

#[async_trait]
pub trait Grader: Send + Sync {
    /// Score a submission.
    ///
    /// # Errors
    ///
    /// Returns `GradingError` if the answer key cannot be reached or the
    /// result is inconsistent with the submission.
    async fn check_answers(&self, submission: &Submission) -> Result<Score, GradingError>;
}
