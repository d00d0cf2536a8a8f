use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::model::ids::QuizId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct RoleParseError(String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            _ => Err(RoleParseError(s.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is taking quizzes, passed explicitly to whatever needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerContext {
    user_id: String,
    display_name: Option<String>,
    role: Role,
    enrolled: BTreeSet<QuizId>,
}

impl ViewerContext {
    #[must_use]
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
            role,
            enrolled: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_enrollments(mut self, quizzes: impl IntoIterator<Item = QuizId>) -> Self {
        self.enrolled.extend(quizzes);
        self
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn is_enrolled(&self, quiz_id: &QuizId) -> bool {
        self.enrolled.contains(quiz_id)
    }

    /// Teachers may open any quiz; students only those they are enrolled in.
    #[must_use]
    pub fn can_take(&self, quiz_id: &QuizId) -> bool {
        match self.role {
            Role::Teacher => true,
            Role::Student => self.is_enrolled(quiz_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn students_need_enrollment() {
        let math = QuizId::new("math-1").unwrap();
        let chem = QuizId::new("circuit-design").unwrap();
        let student = ViewerContext::new("u1", Role::Student).with_enrollments([math.clone()]);
        assert!(student.can_take(&math));
        assert!(!student.can_take(&chem));

        let teacher = ViewerContext::new("t1", Role::Teacher);
        assert!(teacher.can_take(&chem));
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Teacher".parse::<Role>().unwrap(), Role::Teacher);
        assert!("admin".parse::<Role>().is_err());
    }
}
