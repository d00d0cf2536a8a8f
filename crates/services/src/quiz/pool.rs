use std::sync::Arc;

use log::{debug, warn};
use quiz_core::model::QuizId;
use quiz_core::normalize::{Normalizer, QuestionPool};
use quiz_core::session::LoadError;
use storage::repository::QuestionSource;

/// Fetches a quiz's stored records and normalizes them into questions.
#[derive(Clone)]
pub struct QuestionPoolService {
    source: Arc<dyn QuestionSource>,
    normalizer: Normalizer,
}

impl QuestionPoolService {
    #[must_use]
    pub fn new(source: Arc<dyn QuestionSource>) -> Self {
        Self {
            source,
            normalizer: Normalizer::default(),
        }
    }

    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    #[must_use]
    pub fn normalizer(&self) -> Normalizer {
        self.normalizer
    }

    /// Load and normalize every question stored for `quiz_id`.
    ///
    /// Rejected records are logged and dropped.
    ///
    /// # Errors
    ///
    /// - `LoadError::FetchFailed` if the source errors.
    /// - `LoadError::NotFound` if the quiz has no records.
    /// - `LoadError::Malformed` if records exist but none normalize.
    pub async fn load_pool(&self, quiz_id: &QuizId) -> Result<QuestionPool, LoadError> {
        let records = self
            .source
            .fetch_questions(quiz_id)
            .await
            .map_err(|e| LoadError::FetchFailed(e.to_string()))?;

        if records.is_empty() {
            debug!("quiz {quiz_id}: no records stored");
            return Err(LoadError::NotFound {
                quiz_id: quiz_id.clone(),
            });
        }

        let pool = self.normalizer.normalize_all(&records);
        debug!(
            "quiz {quiz_id}: {} raw records, {} usable questions",
            pool.raw_count,
            pool.len()
        );
        for rejected in &pool.rejected {
            warn!(
                "quiz {quiz_id}: skipping record {:?}: {}",
                rejected.record_id, rejected.reason
            );
        }

        if pool.is_empty() {
            return Err(LoadError::Malformed {
                quiz_id: quiz_id.clone(),
                raw: pool.raw_count,
                normalized: 0,
            });
        }
        Ok(pool)
    }
}
