//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuizId, ScoreError};
use quiz_core::session::SessionError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by answer graders.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GradingError {
    #[error("invalid grader endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("grader request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("grader returned an invalid score: {0}")]
    InvalidScore(#[from] ScoreError),
    #[error("grader counted {total} answers but {submitted} were submitted")]
    TotalMismatch { submitted: usize, total: u32 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while driving a quiz attempt.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizFlowError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("grading failed: {0}")]
    Grading(#[from] GradingError),
    #[error("user {user_id} may not take quiz {quiz_id}")]
    AccessDenied { user_id: String, quiz_id: QuizId },
    #[error("no user is signed in")]
    SignedOut,
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
