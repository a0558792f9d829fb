//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a training module (catalog entry and scenario)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(pub String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of a practice quiz question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub u32);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Percentage score in `0..=100`
pub type Score = u8;

/// Difficulty tier of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Foundational,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Foundational,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Foundational => "foundational",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Catalog filter selection; `All` shows every tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DifficultyFilter {
    #[default]
    All,
    Only(Difficulty),
}

impl DifficultyFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyFilter::All => "all",
            DifficultyFilter::Only(tier) => tier.as_str(),
        }
    }

    pub fn admits(&self, tier: Difficulty) -> bool {
        match self {
            DifficultyFilter::All => true,
            DifficultyFilter::Only(wanted) => *wanted == tier,
        }
    }
}

impl FromStr for DifficultyFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(DifficultyFilter::All),
            "foundational" => Ok(DifficultyFilter::Only(Difficulty::Foundational)),
            "intermediate" => Ok(DifficultyFilter::Only(Difficulty::Intermediate)),
            "advanced" => Ok(DifficultyFilter::Only(Difficulty::Advanced)),
            other => Err(format!("unknown difficulty filter '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_round_trips_through_storage_string() {
        for filter in [
            DifficultyFilter::All,
            DifficultyFilter::Only(Difficulty::Foundational),
            DifficultyFilter::Only(Difficulty::Advanced),
        ] {
            assert_eq!(filter.as_str().parse::<DifficultyFilter>(), Ok(filter));
        }
    }

    #[test]
    fn test_filter_rejects_unknown_tier() {
        assert!("expert".parse::<DifficultyFilter>().is_err());
    }

    #[test]
    fn test_all_admits_every_tier() {
        for tier in Difficulty::ALL {
            assert!(DifficultyFilter::All.admits(tier));
        }
        assert!(!DifficultyFilter::Only(Difficulty::Advanced).admits(Difficulty::Foundational));
    }
}
