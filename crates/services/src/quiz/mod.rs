mod pool;
mod sample;
mod workflow;

// Public API of the quiz subsystem.
pub use pool::QuestionPoolService;
pub use sample::{SessionPlan, SessionSampler};
pub use workflow::{QuizLoopService, QuizStep};
