//! Multiple-choice practice quizzes

pub mod attempt;
pub mod bank;
pub mod sampler;

pub use attempt::{format_elapsed, AttemptError, QuestionResult, QuizAttempt};
pub use bank::{QuestionBank, QuizQuestion};
pub use sampler::{select, QuizMode};
