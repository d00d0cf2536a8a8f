use std::collections::HashMap;

use crate::model::{Answer, Question, QuestionId, Score};

/// Correct answers keyed by question id, held only by the grading side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerKey {
    correct: HashMap<QuestionId, String>,
}

impl AnswerKey {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_questions<'a>(questions: impl IntoIterator<Item = &'a Question>) -> Self {
        let mut key = Self::new();
        for question in questions {
            key.insert(question);
        }
        key
    }

    pub fn insert(&mut self, question: &Question) {
        self.correct
            .insert(question.id().clone(), question.correct_answer().to_string());
    }

    #[must_use]
    pub fn contains(&self, question_id: &QuestionId) -> bool {
        self.correct.contains_key(question_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.correct.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.correct.is_empty()
    }

    /// Grade a set of answers by exact value equality.
    ///
    /// Every answer counts toward `total`. Answers whose question is not in
    /// the key never count as correct.
    #[must_use]
    pub fn grade(&self, answers: &[Answer]) -> Score {
        let total = u32::try_from(answers.len()).unwrap_or(u32::MAX);
        let correct = answers
            .iter()
            .filter(|a| {
                self.correct
                    .get(a.question_id())
                    .is_some_and(|expected| expected == a.answer())
            })
            .count();
        let correct = u32::try_from(correct).unwrap_or(total);
        Score::clamped(correct, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, correct: &str) -> Question {
        Question::new(
            QuestionId::new(id).unwrap(),
            format!("Question {id}"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            correct,
        )
        .unwrap()
    }

    fn answer(id: &str, option: &str) -> Answer {
        Answer::new(QuestionId::new(id).unwrap(), option)
    }

    #[test]
    fn counts_exact_matches() {
        let key = AnswerKey::from_questions(&[question("q1", "a"), question("q2", "b")]);
        let score = key.grade(&[answer("q1", "a"), answer("q2", "c")]);
        assert_eq!(score, Score::new(1, 2).unwrap());
    }

    #[test]
    fn unknown_questions_count_toward_total_only() {
        let key = AnswerKey::from_questions(&[question("q1", "a")]);
        let score = key.grade(&[answer("q1", "a"), answer("ghost", "a")]);
        assert_eq!(score.score(), 1);
        assert_eq!(score.total(), 2);
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let key = AnswerKey::from_questions(&[question("q1", "a")]);
        assert_eq!(key.grade(&[answer("q1", "A")]).score(), 0);
    }

    #[test]
    fn empty_submission_scores_zero_of_zero() {
        let key = AnswerKey::new();
        assert!(key.is_empty());
        assert_eq!(key.grade(&[]), Score::new(0, 0).unwrap());
    }
}
