mod answer;
mod ids;
mod question;
mod record;
mod score;
mod settings;
mod viewer;

pub use answer::{Answer, AnswerSheet};
pub use ids::{AttemptId, IdError, QuestionId, QuizId};
pub use question::{PresentedQuestion, Question, QuestionError};
pub use record::{RawRecord, RecordError};
pub use score::{Score, ScoreError, ScoreReport};
pub use settings::{QuizSettings, SettingsError};
pub use viewer::{Role, RoleParseError, ViewerContext};
