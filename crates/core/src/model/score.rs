use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::settings::QuizSettings;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("score ({score}) cannot exceed total ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },
}

/// Final result of a submitted attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScoreWire", into = "ScoreWire")]
pub struct Score {
    score: u32,
    total: u32,
}

impl Score {
    /// # Errors
    ///
    /// Returns `ScoreError::ScoreExceedsTotal` when `score > total`.
    pub fn new(score: u32, total: u32) -> Result<Self, ScoreError> {
        if score > total {
            return Err(ScoreError::ScoreExceedsTotal { score, total });
        }
        Ok(Self { score, total })
    }

    /// Caps `score` at `total`; for counts that are correct by construction.
    pub(crate) fn clamped(score: u32, total: u32) -> Self {
        Self {
            score: score.min(total),
            total,
        }
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// `round(100 * score / total)` with halves rounded up; 0 for an empty total.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let score = u64::from(self.score);
        let total = u64::from(self.total);
        let rounded = (200 * score + total) / (2 * total);
        u32::try_from(rounded).unwrap_or(100)
    }
}

#[derive(Serialize, Deserialize)]
struct ScoreWire {
    score: u32,
    total: u32,
}

impl TryFrom<ScoreWire> for Score {
    type Error = ScoreError;

    fn try_from(wire: ScoreWire) -> Result<Self, Self::Error> {
        Score::new(wire.score, wire.total)
    }
}

impl From<Score> for ScoreWire {
    fn from(score: Score) -> Self {
        Self {
            score: score.score,
            total: score.total,
        }
    }
}

/// Presentation-agnostic view of a score under a pass policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreReport {
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
    pub passed: bool,
}

impl ScoreReport {
    #[must_use]
    pub fn new(score: Score, settings: &QuizSettings) -> Self {
        let percentage = score.percentage();
        Self {
            score: score.score(),
            total: score.total(),
            percentage,
            passed: settings.passes(percentage),
        }
    }
}
