use quiz_core::model::{PresentedQuestion, Question, QuizSettings};
use rand::Rng;
use rand::rng;
use rand::seq::SliceRandom;

/// Questions drawn for one attempt, in the order they will be asked.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub questions: Vec<Question>,
    pub pool_size: usize,
}

impl SessionPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Strip correct answers before handing questions to a session.
    #[must_use]
    pub fn presented(&self) -> Vec<PresentedQuestion> {
        self.questions.iter().map(Question::present).collect()
    }
}

/// Draws a fixed-size random sample, without replacement, from a question pool.
#[derive(Debug, Clone, Copy)]
pub struct SessionSampler {
    sample_size: usize,
}

impl SessionSampler {
    #[must_use]
    pub fn new(settings: &QuizSettings) -> Self {
        Self {
            sample_size: usize::try_from(settings.sample_size()).unwrap_or(usize::MAX),
        }
    }

    #[must_use]
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Shuffle uniformly and keep `min(sample_size, pool)` questions.
    #[must_use]
    pub fn sample(&self, pool: Vec<Question>) -> SessionPlan {
        let mut rng = rng();
        self.sample_with(pool, &mut rng)
    }

    pub fn sample_with<R: Rng + ?Sized>(
        &self,
        mut pool: Vec<Question>,
        rng: &mut R,
    ) -> SessionPlan {
        let pool_size = pool.len();
        pool.as_mut_slice().shuffle(rng);
        pool.truncate(self.sample_size);
        SessionPlan {
            questions: pool,
            pool_size,
        }
    }
}
