//! Grading: turn rule outcomes into a verdict

use serde::Serialize;
use tracing::debug;

use crate::core::types::Score;
use crate::scenario::model::{Scenario, ScoringPolicy};
use crate::simulation::rule_eval::{evaluate, violation_messages, Outcome};
use crate::simulation::selection::Selection;

/// Result of submitting a selection for grading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub passed: bool,
    pub score: Score,
    /// Every violation, in rule order
    pub violations: Vec<String>,
}

impl Verdict {
    /// Violations capped at `limit`, with a trailing count of the remainder
    pub fn feedback_lines(&self, limit: usize) -> Vec<String> {
        let mut lines: Vec<String> = self.violations.iter().take(limit).cloned().collect();
        if self.violations.len() > limit {
            lines.push(format!("...and {} more", self.violations.len() - limit));
        }
        lines
    }
}

/// Grade a selection against every effective rule of the scenario
pub fn validate(scenario: &Scenario, selection: &Selection) -> Verdict {
    let rules = scenario.effective_rules();
    let weights = scenario.weights();

    let outcomes: Vec<Outcome> = rules
        .iter()
        .map(|rule| evaluate(scenario, selection, &rule.check))
        .collect();

    let violations: Vec<String> = rules
        .iter()
        .zip(&outcomes)
        .flat_map(|(rule, outcome)| violation_messages(rule, outcome))
        .collect();

    let (score, passed) = score(&scenario.scoring, &weights, &outcomes);

    debug!(
        scenario = %scenario.id,
        score,
        passed,
        violations = violations.len(),
        "Graded selection"
    );

    Verdict {
        passed,
        score,
        violations,
    }
}

/// Score outcomes under a policy, returning `(score, passed)`
///
/// Weighted scores are rounded half away from zero before extra-selection
/// penalties apply, then clamped to 0..=100.
pub fn score(policy: &ScoringPolicy, weights: &[f64], outcomes: &[Outcome]) -> (Score, bool) {
    let all_satisfied = outcomes.iter().all(Outcome::is_satisfied);

    match *policy {
        ScoringPolicy::AllOrNothing => {
            if all_satisfied {
                (100, true)
            } else {
                (0, false)
            }
        }
        ScoringPolicy::Weighted {
            pass_threshold,
            extra_penalty,
        } => {
            let score = if all_satisfied {
                100
            } else {
                let earned: f64 = weights
                    .iter()
                    .zip(outcomes)
                    .map(|(weight, outcome)| weight * outcome.credit())
                    .sum();
                let extras: usize = outcomes.iter().map(Outcome::extras).sum();
                let penalty = extra_penalty as i64 * extras as i64;
                (earned.round() as i64 - penalty).clamp(0, 100) as Score
            };
            (score, score >= pass_threshold)
        }
    }
}
