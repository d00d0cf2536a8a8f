#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth;
pub mod error;
pub mod grading;
pub mod quiz;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use auth::AuthContext;
pub use error::{AppServicesError, GradingError, QuizFlowError};
pub use grading::{Grader, HttpGrader, HttpGraderConfig, PoolGrader};
pub use quiz::{QuestionPoolService, QuizLoopService, QuizStep, SessionPlan, SessionSampler};
