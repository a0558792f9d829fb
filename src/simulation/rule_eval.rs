//! Rule evaluation against a selection

use crate::scenario::model::{Check, EntryKind, Expected, Rule, Scenario, Value};
use crate::simulation::selection::Selection;

/// Result of evaluating one check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Satisfied,
    Violated,
    /// The value the check reads was never set
    Incomplete,
    /// Set comparison: required members found, and selections outside the set
    Coverage {
        found: usize,
        required: usize,
        extra: usize,
    },
}

impl Outcome {
    pub fn is_satisfied(&self) -> bool {
        match self {
            Outcome::Satisfied => true,
            Outcome::Violated | Outcome::Incomplete => false,
            Outcome::Coverage {
                found,
                required,
                extra,
            } => found == required && *extra == 0,
        }
    }

    /// Fraction of the rule's weight earned
    pub fn credit(&self) -> f64 {
        match self {
            Outcome::Satisfied => 1.0,
            Outcome::Violated | Outcome::Incomplete => 0.0,
            Outcome::Coverage {
                found, required, ..
            } => {
                if *required == 0 {
                    1.0
                } else {
                    *found as f64 / *required as f64
                }
            }
        }
    }

    /// Selections that should not have been made
    pub fn extras(&self) -> usize {
        match self {
            Outcome::Coverage { extra, .. } => *extra,
            _ => 0,
        }
    }

    fn from_bool(holds: bool) -> Self {
        if holds {
            Outcome::Satisfied
        } else {
            Outcome::Violated
        }
    }
}

/// Evaluate a check against the current selection
pub fn evaluate(scenario: &Scenario, selection: &Selection, check: &Check) -> Outcome {
    match check {
        Check::Equals { field, value } => match selection.field(field) {
            None => Outcome::Incomplete,
            Some(actual) => Outcome::from_bool(values_match(actual, value)),
        },

        Check::NotEquals { field, value } => match selection.field(field) {
            None => Outcome::Satisfied,
            Some(actual) => Outcome::from_bool(!values_match(actual, value)),
        },

        Check::OneOf { field, values } => match text_of(selection, field) {
            None => Outcome::Incomplete,
            Some(text) => Outcome::from_bool(values.iter().any(|v| v == &text)),
        },

        Check::Contains { field, text } => match text_of(selection, field) {
            None => Outcome::Incomplete,
            Some(actual) => {
                Outcome::from_bool(actual.to_lowercase().contains(&text.to_lowercase()))
            }
        },

        Check::NotContains { field, text } => match text_of(selection, field) {
            None => Outcome::Satisfied,
            Some(actual) => {
                Outcome::from_bool(!actual.to_lowercase().contains(&text.to_lowercase()))
            }
        },

        Check::MinLength { field, min } => match text_of(selection, field) {
            None => Outcome::Incomplete,
            Some(actual) => Outcome::from_bool(actual.trim().chars().count() >= *min),
        },

        Check::Compare { field, op, value } => match number_of(selection, field) {
            NumberRead::Missing => Outcome::Incomplete,
            NumberRead::NotANumber => Outcome::Violated,
            NumberRead::Number(actual) => Outcome::from_bool(op.holds(actual, *value)),
        },

        Check::NumberEquals { field, expected } => {
            match (number_of(selection, field), resolve(scenario, expected)) {
                (NumberRead::Missing, _) => Outcome::Incomplete,
                (NumberRead::Number(actual), Some(expected)) => {
                    Outcome::from_bool(actual == expected)
                }
                _ => Outcome::Violated,
            }
        }

        Check::Decide {
            field,
            benefit,
            cost,
            yes,
            no,
        } => {
            let Some(answer) = text_of(selection, field) else {
                return Outcome::Incomplete;
            };
            match (resolve(scenario, benefit), resolve(scenario, cost)) {
                (Some(benefit), Some(cost)) => {
                    let wanted = if benefit > cost { yes } else { no };
                    Outcome::from_bool(&answer == wanted)
                }
                _ => Outcome::Violated,
            }
        }

        Check::When { condition, then } => {
            if evaluate(scenario, selection, condition).is_satisfied() {
                evaluate(scenario, selection, then)
            } else {
                Outcome::Satisfied
            }
        }

        Check::QuestionCorrect { question } => {
            let Some(question) = scenario.question(question) else {
                return Outcome::Violated;
            };
            match text_of(selection, &question.id) {
                None => Outcome::Incomplete,
                Some(answer) => Outcome::from_bool(answer == question.correct),
            }
        }

        Check::SlotAccepts { slot } => {
            let Some(slot) = scenario.slot(slot) else {
                return Outcome::Violated;
            };
            match selection.slot(&slot.id) {
                None => Outcome::Incomplete,
                Some(item) => Outcome::from_bool(slot.accepts.iter().any(|a| a == item)),
            }
        }

        Check::SetExact { set, required } => {
            let found = required
                .iter()
                .filter(|item| selection.set_contains(set, item))
                .count();
            let extra = selection
                .set(set)
                .filter(|item| !required.iter().any(|r| r == item))
                .count();
            Outcome::Coverage {
                found,
                required: required.len(),
                extra,
            }
        }

        Check::PrincipalPresent { entity, principal } => Outcome::from_bool(
            selection
                .acl(entity)
                .map_or(false, |acl| acl.contains(principal)),
        ),

        Check::PrincipalAbsent { entity, principal } => Outcome::from_bool(
            !selection
                .acl(entity)
                .map_or(false, |acl| acl.contains(principal)),
        ),

        Check::HasPermission {
            entity,
            principal,
            permission,
        } => match selection.acl(entity).and_then(|acl| acl.entry(principal)) {
            None => Outcome::Incomplete,
            Some(entry) => Outcome::from_bool(entry.allows(*permission)),
        },

        Check::LacksPermissions {
            entity,
            principal,
            permissions,
        } => match selection.acl(entity).and_then(|acl| acl.entry(principal)) {
            None => Outcome::Satisfied,
            Some(entry) => Outcome::from_bool(!permissions.iter().any(|p| entry.allows(*p))),
        },

        Check::KindIs {
            entity,
            principal,
            kind,
        } => match selection.acl(entity).and_then(|acl| acl.entry(principal)) {
            None => Outcome::Incomplete,
            Some(entry) => {
                // A deny entry with nothing checked denies nothing
                let effective = entry.kind == *kind
                    && (*kind == EntryKind::Allow || !entry.permissions.is_empty());
                Outcome::from_bool(effective)
            }
        },

        Check::TableHas { table, pattern } => {
            Outcome::from_bool(selection.table(table).iter().any(|rule| pattern.matches(rule)))
        }
    }
}

/// Feedback lines for a rule that did not fully hold
pub fn violation_messages(rule: &Rule, outcome: &Outcome) -> Vec<String> {
    match outcome {
        Outcome::Satisfied => Vec::new(),
        Outcome::Violated => vec![rule.message.clone()],
        Outcome::Incomplete => vec![rule
            .missing_message
            .clone()
            .unwrap_or_else(|| rule.message.clone())],
        Outcome::Coverage {
            found,
            required,
            extra,
        } => {
            let mut messages = Vec::new();
            if found < required {
                let base = rule.missing_message.as_deref().unwrap_or(&rule.message);
                messages.push(format!("{} ({}/{} identified)", base, found, required));
            }
            if *extra > 0 {
                let base = rule
                    .extra_message
                    .as_deref()
                    .unwrap_or("Incorrect items were selected.");
                let plural = if *extra == 1 { "" } else { "s" };
                messages.push(format!("{} ({} incorrect selection{})", base, extra, plural));
            }
            messages
        }
    }
}

enum NumberRead {
    Missing,
    NotANumber,
    Number(f64),
}

fn number_of(selection: &Selection, field: &str) -> NumberRead {
    match selection.field(field) {
        None => NumberRead::Missing,
        Some(Value::Text(text)) if text.trim().is_empty() => NumberRead::Missing,
        Some(value) => value
            .as_number()
            .map_or(NumberRead::NotANumber, NumberRead::Number),
    }
}

/// Text view of a field; flags and numbers use their display form
fn text_of(selection: &Selection, field: &str) -> Option<String> {
    match selection.field(field)? {
        Value::Text(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn values_match(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(_), Value::Number(b)) | (Value::Text(_), Value::Number(b)) => {
            actual.as_number() == Some(*b)
        }
        _ => actual == expected,
    }
}

fn resolve(scenario: &Scenario, expected: &Expected) -> Option<f64> {
    expected.resolve(&scenario.constants)
}
