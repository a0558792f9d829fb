//! Lab configuration with documented defaults
//!
//! Values can be overridden from a TOML file; anything left out of the file
//! keeps its default.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration for the lab host, quiz engine, and feedback display
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    // === QUIZ ===
    /// Number of questions drawn for a random "quick shuffle" quiz
    pub quiz_length: usize,

    /// Maximum number of questions drawn for a single-domain quiz
    ///
    /// Domains with fewer questions yield a shorter quiz.
    pub domain_quiz_length: usize,

    // === FEEDBACK ===
    /// Maximum number of violation lines shown after a failed submission
    ///
    /// The remainder is summarized as "...and N more". The verdict itself
    /// always keeps every violation.
    pub feedback_limit: usize,

    // === STORAGE ===
    /// Directory holding the durable key-value file
    pub store_dir: PathBuf,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            quiz_length: 10,
            domain_quiz_length: 10,
            feedback_limit: 5,
            store_dir: PathBuf::from(".pbq-labs"),
        }
    }
}

impl LabConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load overrides from a TOML file
    pub fn load(path: &Path) -> crate::core::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LabConfig = toml::from_str(&content)?;
        config
            .validate()
            .map_err(crate::core::PbqError::InvalidConfig)?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.quiz_length == 0 || self.domain_quiz_length == 0 {
            return Err("quiz lengths must be at least 1".into());
        }

        if self.feedback_limit == 0 {
            return Err("feedback_limit must be at least 1".into());
        }

        if self.store_dir.as_os_str().is_empty() {
            return Err("store_dir must not be empty".into());
        }

        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<LabConfig> = OnceLock::new();

/// Get the global lab config (initializes with defaults if not set)
pub fn config() -> &'static LabConfig {
    CONFIG.get_or_init(LabConfig::default)
}

/// Set the global lab config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: LabConfig) -> Result<(), LabConfig> {
    CONFIG.set(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(LabConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_quiz_length_rejected() {
        let config = LabConfig {
            quiz_length: 0,
            ..LabConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: LabConfig = toml::from_str("feedback_limit = 3").unwrap();
        assert_eq!(config.feedback_limit, 3);
        assert_eq!(config.quiz_length, 10);
        assert_eq!(config.store_dir, PathBuf::from(".pbq-labs"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.toml");
        std::fs::write(&path, "quiz_length = 5\nstore_dir = \"state\"\n").unwrap();

        let config = LabConfig::load(&path).unwrap();
        assert_eq!(config.quiz_length, 5);
        assert_eq!(config.store_dir, PathBuf::from("state"));
    }
}
