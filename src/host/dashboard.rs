//! Learner progress summary

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::core::types::{Difficulty, ModuleId, Score};
use crate::host::catalog::Catalog;

/// Rank earned by overall completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Clearance {
    Trainee,
    JuniorAnalyst,
    SecurityAnalyst,
    SecurityArchitect,
    Ciso,
}

impl Clearance {
    pub fn from_completion(percent: u8) -> Self {
        match percent {
            90.. => Clearance::Ciso,
            70.. => Clearance::SecurityArchitect,
            50.. => Clearance::SecurityAnalyst,
            20.. => Clearance::JuniorAnalyst,
            _ => Clearance::Trainee,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Clearance::Trainee => "Trainee",
            Clearance::JuniorAnalyst => "Junior Analyst",
            Clearance::SecurityAnalyst => "Security Analyst",
            Clearance::SecurityArchitect => "Security Architect",
            Clearance::Ciso => "CISO",
        }
    }
}

impl fmt::Display for Clearance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierProgress {
    pub difficulty: Difficulty,
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub completed: usize,
    pub total: usize,
    pub completion_percent: u8,
    /// Mean of recorded scores, 0 when nothing is completed
    pub average_score: Score,
    pub tiers: Vec<TierProgress>,
    pub clearance: Clearance,
}

fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        0
    } else {
        ((part as f64 / whole as f64) * 100.0).round() as u8
    }
}

/// Summarize a user's recorded scores against the catalog
///
/// Scores for ids no longer in the catalog are ignored.
pub fn summarize(catalog: &Catalog, progress: &BTreeMap<ModuleId, Score>) -> DashboardStats {
    let scores: Vec<Score> = progress
        .iter()
        .filter(|(id, _)| catalog.contains(id))
        .map(|(_, score)| *score)
        .collect();

    let completed = scores.len();
    let total = catalog.len();
    let completion_percent = percent(completed, total);
    let average_score = if completed == 0 {
        0
    } else {
        let sum: u32 = scores.iter().map(|&s| s as u32).sum();
        (sum as f64 / completed as f64).round() as Score
    };

    let tiers = Difficulty::ALL
        .into_iter()
        .map(|difficulty| {
            let in_tier: Vec<&ModuleId> = catalog
                .modules()
                .iter()
                .filter(|m| m.difficulty == difficulty)
                .map(|m| &m.id)
                .collect();
            let done = in_tier.iter().filter(|id| progress.contains_key(**id)).count();
            TierProgress {
                difficulty,
                completed: done,
                total: in_tier.len(),
                percent: percent(done, in_tier.len()),
            }
        })
        .collect();

    DashboardStats {
        completed,
        total,
        completion_percent,
        average_score,
        tiers,
        clearance: Clearance::from_completion(completion_percent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clearance_thresholds() {
        assert_eq!(Clearance::from_completion(0), Clearance::Trainee);
        assert_eq!(Clearance::from_completion(19), Clearance::Trainee);
        assert_eq!(Clearance::from_completion(20), Clearance::JuniorAnalyst);
        assert_eq!(Clearance::from_completion(50), Clearance::SecurityAnalyst);
        assert_eq!(Clearance::from_completion(70), Clearance::SecurityArchitect);
        assert_eq!(Clearance::from_completion(90), Clearance::Ciso);
        assert_eq!(Clearance::from_completion(100).title(), "CISO");
    }

    #[test]
    fn test_summary_counts_catalog_modules_only() {
        let catalog = Catalog::builtin().unwrap();
        let mut progress = BTreeMap::new();
        progress.insert(ModuleId::from("password_policy"), 100);
        progress.insert(ModuleId::from("risk"), 80);
        progress.insert(ModuleId::from("retired_module"), 10);

        let stats = summarize(&catalog, &progress);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.total, 27);
        assert_eq!(stats.completion_percent, 7);
        assert_eq!(stats.average_score, 90);
        assert_eq!(stats.clearance, Clearance::Trainee);

        let tier_total: usize = stats.tiers.iter().map(|t| t.completed).sum();
        assert_eq!(tier_total, 2);
    }

    #[test]
    fn test_empty_progress() {
        let catalog = Catalog::builtin().unwrap();
        let stats = summarize(&catalog, &BTreeMap::new());
        assert_eq!(stats.average_score, 0);
        assert_eq!(stats.completion_percent, 0);
    }
}
