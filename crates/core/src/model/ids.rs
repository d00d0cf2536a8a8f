use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdError {
    #[error("{kind} cannot be empty")]
    Empty { kind: &'static str },
}

fn non_empty(kind: &'static str, raw: String) -> Result<String, IdError> {
    if raw.trim().is_empty() {
        return Err(IdError::Empty { kind });
    }
    Ok(raw)
}

/// Key naming a question pool, usually a lesson identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuizId(String);

impl QuizId {
    /// # Errors
    ///
    /// Returns `IdError::Empty` for blank identifiers.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        non_empty("quiz id", raw.into()).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a question, unique within its quiz.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuestionId(String);

impl QuestionId {
    /// # Errors
    ///
    /// Returns `IdError::Empty` for blank identifiers.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        non_empty("question id", raw.into()).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Random identifier attached to a single quiz attempt, used to correlate logs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(Uuid);

impl AttemptId {
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

// ─── Conversions ───────────────────────────────────────────────────────────────

impl TryFrom<String> for QuizId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QuizId> for String {
    fn from(id: QuizId) -> Self {
        id.0
    }
}

impl TryFrom<String> for QuestionId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QuestionId> for String {
    fn from(id: QuestionId) -> Self {
        id.0
    }
}

impl FromStr for QuizId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for QuestionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ─── Formatting ────────────────────────────────────────────────────────────────

impl fmt::Debug for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuizId({:?})", self.0)
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({:?})", self.0)
    }
}

impl fmt::Debug for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttemptId({})", self.0)
    }
}

impl fmt::Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_id_rejects_blank() {
        assert_eq!(
            QuizId::new("   ").unwrap_err(),
            IdError::Empty { kind: "quiz id" }
        );
        assert!("".parse::<QuestionId>().is_err());
    }

    #[test]
    fn quiz_id_display_and_parse() {
        let id: QuizId = "circuit-design".parse().unwrap();
        assert_eq!(id.to_string(), "circuit-design");
        assert_eq!(format!("{id:?}"), "QuizId(\"circuit-design\")");
    }

    #[test]
    fn question_id_deserialize_validates() {
        let ok: QuestionId = serde_json::from_str("\"q1\"").unwrap();
        assert_eq!(ok.as_str(), "q1");
        assert!(serde_json::from_str::<QuestionId>("\"\"").is_err());
    }

    #[test]
    fn attempt_ids_are_distinct() {
        assert_ne!(AttemptId::random(), AttemptId::random());
    }
}
