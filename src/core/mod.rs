pub mod config;
pub mod error;
pub mod types;

pub use config::{config, set_config, LabConfig};
pub use error::{PbqError, Result};
pub use types::{Difficulty, DifficultyFilter, ModuleId, QuestionId, Score};
