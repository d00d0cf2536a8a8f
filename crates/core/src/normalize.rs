//! Table-driven normalization of stored question documents.
//!
//! Question documents come from several authoring tools and do not agree on
//! field names. Each canonical field is resolved by walking an ordered rule
//! table against the generic record; the first rule that yields a value wins.
//! A record either becomes a [`Question`] or is rejected with a [`Rejection`].

use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;

use crate::model::{Question, QuestionId, RawRecord};

/// Where the question text may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRule {
    Field(&'static str),
    RecordId,
}

/// Where the option list may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsRule {
    /// An array of strings under one key. Matches only when every entry is a
    /// non-blank string.
    Array(&'static str),
    /// One string per key, collected in table order. Absent or blank keys
    /// leave a hole that an index rule cannot land on.
    Fields(&'static [&'static str]),
}

/// Where the correct answer may come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerRule {
    /// The answer text itself.
    Value(&'static str),
    /// A zero-based index into the stored option positions.
    Index(&'static str),
}

pub const TEXT_RULES: &[TextRule] = &[
    TextRule::Field("questionText"),
    TextRule::Field("question"),
    TextRule::Field("text"),
    TextRule::Field("prompt"),
    TextRule::RecordId,
];

pub const OPTIONS_RULES: &[OptionsRule] = &[
    OptionsRule::Array("options"),
    OptionsRule::Array("choices"),
    OptionsRule::Fields(&["optionA", "optionB", "optionC", "optionD"]),
    OptionsRule::Fields(&["option1", "option2", "option3", "option4"]),
];

pub const ANSWER_RULES: &[AnswerRule] = &[
    AnswerRule::Value("correctAnswer"),
    AnswerRule::Value("answer"),
    AnswerRule::Index("correctIndex"),
    AnswerRule::Index("correctOptionIndex"),
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Rejection {
    #[error("record id is empty")]
    EmptyId,

    #[error("duplicate record id")]
    DuplicateId,

    #[error("no question text could be resolved")]
    MissingText,

    #[error("no options could be resolved")]
    NoOptions,

    #[error("no correct answer field is present")]
    MissingAnswer,

    #[error("correct answer {answer:?} is not one of the options")]
    AnswerNotInOptions { answer: String },

    #[error("correct index {index} is out of range for {len} options")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("correct index {index} points at a missing option")]
    IndexOnMissingOption { index: i64 },
}

/// A record that did not survive normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub record_id: String,
    pub reason: Rejection,
}

/// Outcome of normalizing every record stored for one quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionPool {
    pub questions: Vec<Question>,
    pub rejected: Vec<RejectedRecord>,
    pub raw_count: usize,
}

impl QuestionPool {
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Rule tables used to turn raw records into questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    text: &'static [TextRule],
    options: &'static [OptionsRule],
    answers: &'static [AnswerRule],
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(TEXT_RULES, OPTIONS_RULES, ANSWER_RULES)
    }
}

impl Normalizer {
    #[must_use]
    pub fn new(
        text: &'static [TextRule],
        options: &'static [OptionsRule],
        answers: &'static [AnswerRule],
    ) -> Self {
        Self {
            text,
            options,
            answers,
        }
    }

    /// Normalize a single record.
    ///
    /// # Errors
    ///
    /// Returns the first `Rejection` encountered.
    pub fn normalize(&self, record: &RawRecord) -> Result<Question, Rejection> {
        let id = QuestionId::new(record.id()).map_err(|_| Rejection::EmptyId)?;
        let text = self.resolve_text(record).ok_or(Rejection::MissingText)?;
        let slots = self.resolve_options(record).ok_or(Rejection::NoOptions)?;
        let answer = self.resolve_answer(record, &slots)?;
        let options: Vec<String> = slots.into_iter().flatten().collect();

        if !options.iter().any(|o| *o == answer) {
            return Err(Rejection::AnswerNotInOptions { answer });
        }

        Question::new(id, text, options, answer.clone())
            .map_err(|_| Rejection::AnswerNotInOptions { answer })
    }

    /// Normalize every record for a quiz, keeping rejections for diagnostics.
    ///
    /// Later records reusing an id already accepted are rejected.
    #[must_use]
    pub fn normalize_all(&self, records: &[RawRecord]) -> QuestionPool {
        let mut seen = HashSet::new();
        let mut questions = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();

        for record in records {
            let result = self.normalize(record).and_then(|q| {
                if seen.insert(q.id().clone()) {
                    Ok(q)
                } else {
                    Err(Rejection::DuplicateId)
                }
            });
            match result {
                Ok(question) => questions.push(question),
                Err(reason) => rejected.push(RejectedRecord {
                    record_id: record.id().to_string(),
                    reason,
                }),
            }
        }

        QuestionPool {
            questions,
            rejected,
            raw_count: records.len(),
        }
    }

    fn resolve_text(&self, record: &RawRecord) -> Option<String> {
        self.text.iter().find_map(|rule| match rule {
            TextRule::Field(key) => record.get_str(key).map(ToString::to_string),
            TextRule::RecordId => {
                Some(record.id().to_string()).filter(|id| !id.trim().is_empty())
            }
        })
    }

    /// Option slots in stored order; `None` marks an absent single field.
    fn resolve_options(&self, record: &RawRecord) -> Option<Vec<Option<String>>> {
        self.options.iter().find_map(|rule| {
            let slots: Vec<Option<String>> = match rule {
                OptionsRule::Array(key) => record
                    .get(key)
                    .and_then(Value::as_array)
                    .and_then(|items| items.iter().map(option_text).collect::<Option<Vec<_>>>())
                    .map(|items| items.into_iter().map(Some).collect())
                    .unwrap_or_default(),
                OptionsRule::Fields(keys) => {
                    let mut slots: Vec<Option<String>> = keys
                        .iter()
                        .map(|key| record.get(key).and_then(option_text))
                        .collect();
                    while slots.last().is_some_and(Option::is_none) {
                        slots.pop();
                    }
                    slots
                }
            };
            slots.iter().any(Option::is_some).then_some(slots)
        })
    }

    fn resolve_answer(
        &self,
        record: &RawRecord,
        slots: &[Option<String>],
    ) -> Result<String, Rejection> {
        for rule in self.answers {
            match rule {
                AnswerRule::Value(key) => {
                    if let Some(answer) = record.get_str(key) {
                        return Ok(answer.to_string());
                    }
                }
                AnswerRule::Index(key) => {
                    if let Some(index) = record.get(key).and_then(Value::as_i64) {
                        let slot = usize::try_from(index).ok().and_then(|i| slots.get(i));
                        return match slot {
                            Some(Some(option)) => Ok(option.clone()),
                            Some(None) => Err(Rejection::IndexOnMissingOption { index }),
                            None => Err(Rejection::IndexOutOfRange {
                                index,
                                len: slots.len(),
                            }),
                        };
                    }
                }
            }
        }
        Err(Rejection::MissingAnswer)
    }
}

fn option_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(doc: Value) -> RawRecord {
        RawRecord::from_document(doc).unwrap()
    }

    #[test]
    fn correct_index_resolves_against_options() {
        let q = Normalizer::default()
            .normalize(&record(json!({
                "id": "q1",
                "questionText": "Pick b",
                "options": ["a", "b", "c"],
                "correctIndex": 1
            })))
            .unwrap();
        assert_eq!(q.correct_answer(), "b");
    }

    #[test]
    fn explicit_answer_wins_over_index() {
        let q = Normalizer::default()
            .normalize(&record(json!({
                "id": "q1",
                "question": "Pick",
                "options": ["a", "b"],
                "correctAnswer": "a",
                "correctIndex": 1
            })))
            .unwrap();
        assert_eq!(q.text(), "Pick");
        assert_eq!(q.correct_answer(), "a");
    }

    #[test]
    fn text_falls_back_to_record_id() {
        let q = Normalizer::default()
            .normalize(&record(json!({
                "id": "What is 2+2?",
                "choices": ["3", "4"],
                "answer": "4"
            })))
            .unwrap();
        assert_eq!(q.text(), "What is 2+2?");
        assert_eq!(q.options(), ["3", "4"]);
    }

    #[test]
    fn options_rebuilt_from_single_fields() {
        let q = Normalizer::default()
            .normalize(&record(json!({
                "id": "q2",
                "text": "Noble gas?",
                "optionA": "Neon",
                "optionB": "Sodium",
                "optionD": "Iron",
                "correctOptionIndex": 0
            })))
            .unwrap();
        assert_eq!(q.options(), ["Neon", "Sodium", "Iron"]);
        assert_eq!(q.correct_answer(), "Neon");
    }

    #[test]
    fn empty_options_array_falls_through_to_next_rule() {
        let q = Normalizer::default()
            .normalize(&record(json!({
                "id": "q3",
                "prompt": "Pick",
                "options": [],
                "option1": "x",
                "option2": "y",
                "correctAnswer": "y"
            })))
            .unwrap();
        assert_eq!(q.options(), ["x", "y"]);
    }

    #[test]
    fn array_with_unusable_entries_does_not_match() {
        let n = Normalizer::default();
        assert_eq!(
            n.normalize(&record(json!({
                "id": "q1",
                "questionText": "2+2?",
                "options": ["3", 4, "5"],
                "correctIndex": 1
            })))
            .unwrap_err(),
            Rejection::NoOptions
        );

        let q = n
            .normalize(&record(json!({
                "id": "q2",
                "questionText": "Pick c",
                "options": ["a", "", "c", "d"],
                "choices": ["a", "b", "c", "d"],
                "correctIndex": 2
            })))
            .unwrap();
        assert_eq!(q.options(), ["a", "b", "c", "d"]);
        assert_eq!(q.correct_answer(), "c");
    }

    #[test]
    fn index_resolves_against_field_positions() {
        let n = Normalizer::default();
        let q = n
            .normalize(&record(json!({
                "id": "q1",
                "text": "Pick D",
                "optionA": "A",
                "optionB": "",
                "optionD": "D",
                "correctOptionIndex": 3
            })))
            .unwrap();
        assert_eq!(q.options(), ["A", "D"]);
        assert_eq!(q.correct_answer(), "D");

        assert_eq!(
            n.normalize(&record(json!({
                "id": "q2",
                "text": "Pick",
                "optionA": "A",
                "optionC": "C",
                "correctOptionIndex": 1
            })))
            .unwrap_err(),
            Rejection::IndexOnMissingOption { index: 1 }
        );
    }

    #[test]
    fn rejections_are_typed() {
        let n = Normalizer::default();
        assert_eq!(
            n.normalize(&record(json!({ "id": "q", "questionText": "t", "correctAnswer": "a" })))
                .unwrap_err(),
            Rejection::NoOptions
        );
        assert_eq!(
            n.normalize(&record(json!({ "id": "q", "options": ["a"] })))
                .unwrap_err(),
            Rejection::MissingAnswer
        );
        assert_eq!(
            n.normalize(&record(json!({ "id": "q", "options": ["a"], "correctAnswer": "b" })))
                .unwrap_err(),
            Rejection::AnswerNotInOptions {
                answer: "b".to_string()
            }
        );
        assert_eq!(
            n.normalize(&record(json!({ "id": "q", "options": ["a"], "correctIndex": 3 })))
                .unwrap_err(),
            Rejection::IndexOutOfRange { index: 3, len: 1 }
        );
        assert_eq!(
            n.normalize(&record(json!({ "id": "q", "options": ["a"], "correctIndex": -1 })))
                .unwrap_err(),
            Rejection::IndexOutOfRange { index: -1, len: 1 }
        );
    }

    #[test]
    fn normalize_all_reports_counts_and_duplicates() {
        let records = vec![
            record(json!({ "id": "q1", "options": ["a", "b"], "correctAnswer": "a" })),
            record(json!({ "id": "q1", "options": ["c"], "correctAnswer": "c" })),
            record(json!({ "id": "q2", "options": [] })),
        ];
        let pool = Normalizer::default().normalize_all(&records);

        assert_eq!(pool.raw_count, 3);
        assert_eq!(pool.len(), 1);
        assert_eq!(
            pool.rejected,
            vec![
                RejectedRecord {
                    record_id: "q1".to_string(),
                    reason: Rejection::DuplicateId
                },
                RejectedRecord {
                    record_id: "q2".to_string(),
                    reason: Rejection::NoOptions
                },
            ]
        );
    }

    #[test]
    fn custom_tables_are_honored() {
        const TEXT: &[TextRule] = &[TextRule::Field("body")];
        const OPTIONS: &[OptionsRule] = &[OptionsRule::Array("alts")];
        const ANSWERS: &[AnswerRule] = &[AnswerRule::Index("key")];

        let n = Normalizer::new(TEXT, OPTIONS, ANSWERS);
        let q = n
            .normalize(&record(json!({ "id": "x", "body": "B", "alts": ["p", "q"], "key": 1 })))
            .unwrap();
        assert_eq!(q.correct_answer(), "q");

        let err = n
            .normalize(&record(json!({ "id": "x", "alts": ["p"], "key": 0 })))
            .unwrap_err();
        assert_eq!(err, Rejection::MissingText);
    }
}
