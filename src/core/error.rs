use thiserror::Error;

#[derive(Error, Debug)]
pub enum PbqError {
    #[error("Invalid content in {source_name}: {problems:?}")]
    InvalidContent {
        source_name: String,
        problems: Vec<String>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl PbqError {
    pub fn invalid_content(source_name: impl Into<String>, problems: Vec<String>) -> Self {
        PbqError::InvalidContent {
            source_name: source_name.into(),
            problems,
        }
    }
}

pub type Result<T> = std::result::Result<T, PbqError>;
