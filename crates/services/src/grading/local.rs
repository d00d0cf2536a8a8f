use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use quiz_core::model::Score;
use quiz_core::normalize::Normalizer;
use quiz_core::scoring::AnswerKey;
use quiz_core::session::Submission;
use storage::repository::QuestionSource;

use super::Grader;
use crate::error::GradingError;

/// Grades in-process against the question store.
///
/// Each answered question is fetched individually and normalized with the
/// same rules used to build the session. Questions that are missing or no
/// longer normalize count as wrong.
#[derive(Clone)]
pub struct PoolGrader {
    source: Arc<dyn QuestionSource>,
    normalizer: Normalizer,
}

impl PoolGrader {
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
}

#[async_trait]
impl Grader for PoolGrader {
    async fn check_answers(&self, submission: &Submission) -> Result<Score, GradingError> {
        let quiz_id = &submission.quiz_id;
        let mut key = AnswerKey::new();

        for answer in &submission.answers {
            let question_id = answer.question_id();
            let Some(record) = self.source.fetch_question(quiz_id, question_id).await? else {
                warn!("quiz {quiz_id}: answered question {question_id} no longer exists");
                continue;
            };
            match self.normalizer.normalize(&record) {
                Ok(question) => key.insert(&question),
                Err(reason) => warn!("quiz {quiz_id}: question {question_id} unusable: {reason}"),
            }
        }

        Ok(key.grade(&submission.answers))
    }
}
