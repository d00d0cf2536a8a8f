use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;

/// The option a quiz taker picked for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    question_id: QuestionId,
    answer: String,
}

impl Answer {
    #[must_use]
    pub fn new(question_id: QuestionId, answer: impl Into<String>) -> Self {
        Self {
            question_id,
            answer: answer.into(),
        }
    }

    #[must_use]
    pub fn question_id(&self) -> &QuestionId {
        &self.question_id
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }
}

/// Answers recorded during one attempt, at most one per question.
///
/// Recording an answer for a question that already has one replaces it in
/// place, so the sheet keeps first-answered order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    answers: Vec<Answer>,
}

impl AnswerSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert an answer. Returns the previously recorded option, if any.
    pub fn record(&mut self, answer: Answer) -> Option<String> {
        match self
            .answers
            .iter_mut()
            .find(|a| a.question_id == answer.question_id)
        {
            Some(existing) => Some(std::mem::replace(&mut existing.answer, answer.answer)),
            None => {
                self.answers.push(answer);
                None
            }
        }
    }

    #[must_use]
    pub fn get(&self, question_id: &QuestionId) -> Option<&str> {
        self.answers
            .iter()
            .find(|a| &a.question_id == question_id)
            .map(Answer::answer)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Answer] {
        &self.answers
    }

    pub fn iter(&self) -> impl Iterator<Item = &Answer> {
        self.answers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qid(raw: &str) -> QuestionId {
        QuestionId::new(raw).unwrap()
    }

    #[test]
    fn record_overwrites_instead_of_duplicating() {
        let mut sheet = AnswerSheet::new();
        assert_eq!(sheet.record(Answer::new(qid("q1"), "a")), None);
        assert_eq!(sheet.record(Answer::new(qid("q2"), "c")), None);
        assert_eq!(
            sheet.record(Answer::new(qid("q1"), "b")),
            Some("a".to_string())
        );

        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.get(&qid("q1")), Some("b"));
        assert_eq!(sheet.as_slice()[0].question_id(), &qid("q1"));
    }

    #[test]
    fn answer_serializes_with_wire_names() {
        let json = serde_json::to_value(Answer::new(qid("q7"), "Rome")).unwrap();
        assert_eq!(json, serde_json::json!({ "questionId": "q7", "answer": "Rome" }));
    }
}
