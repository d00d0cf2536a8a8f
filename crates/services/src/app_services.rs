use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::QuizSettings;
use storage::repository::{QuestionStore, QuizSummary, Storage};

use crate::auth::AuthContext;
use crate::error::AppServicesError;
use crate::grading::{Grader, HttpGrader, HttpGraderConfig, PoolGrader};
use crate::quiz::QuizLoopService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    auth: AuthContext,
    quiz_loop: Arc<QuizLoopService>,
    question_store: Arc<dyn QuestionStore>,
    remote_grading: bool,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// Grading goes to `grader` when given, otherwise it runs in-process
    /// against the same store.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: QuizSettings,
        grader: Option<HttpGraderConfig>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock, settings, grader))
    }

    #[must_use]
    pub fn from_storage(
        storage: Storage,
        clock: Clock,
        settings: QuizSettings,
        grader: Option<HttpGraderConfig>,
    ) -> Self {
        let remote_grading = grader.is_some();
        let grader: Arc<dyn Grader> = match grader {
            Some(config) => Arc::new(HttpGrader::new(config)),
            None => Arc::new(PoolGrader::new(Arc::clone(&storage.questions))),
        };
        let quiz_loop = Arc::new(QuizLoopService::new(
            clock,
            settings,
            Arc::clone(&storage.questions),
            grader,
        ));

        Self {
            auth: AuthContext::new(),
            quiz_loop,
            question_store: storage.question_store,
            remote_grading,
        }
    }

    #[must_use]
    pub fn auth(&self) -> AuthContext {
        self.auth.clone()
    }

    #[must_use]
    pub fn quiz_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz_loop)
    }

    #[must_use]
    pub fn remote_grading(&self) -> bool {
        self.remote_grading
    }

    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if the store cannot be read.
    pub async fn quiz_summaries(&self) -> Result<Vec<QuizSummary>, AppServicesError> {
        Ok(self.question_store.list_quizzes().await?)
    }
}
