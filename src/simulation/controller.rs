//! Learner actions and the pure transition function that applies them
//!
//! `apply` never mutates its input: it returns the next selection or the
//! reason the action was refused, leaving the caller's state untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scenario::model::{AccessEntry, EntryKind, FieldKind, Scenario, TrafficRule, Value};
use crate::scenario::permissions::{toggle_permission, Permission};
use crate::simulation::selection::Selection;

/// Every edit a learner can make to a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Answer a question or pick a choice-field option
    SelectOption { field: String, option: String },
    /// Advance a choice field to its next option, wrapping around
    CycleOption { field: String },
    EnterText { field: String, text: String },
    EnterNumber { field: String, value: f64 },
    SetFlag { field: String, value: bool },
    /// Return a field or question to unanswered
    ClearAnswer { field: String },
    ToggleMembership { set: String, item: String },
    AssignToSlot { slot: String, item: String },
    ClearSlot { slot: String },
    TogglePermission {
        entity: String,
        principal: String,
        permission: Permission,
    },
    SetEntryKind {
        entity: String,
        principal: String,
        kind: EntryKind,
    },
    AddPrincipal { entity: String, principal: String },
    RemovePrincipal { entity: String, principal: String },
    AddRule { table: String, rule: TrafficRule },
    RemoveRule { table: String, index: usize },
}

/// Why an action was refused
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("'{option}' is not an option for '{field}'")]
    UnknownOption { field: String, option: String },

    #[error("field '{field}' does not accept {attempted} input")]
    WrongKind { field: String, attempted: &'static str },

    #[error("'{0}' is not a finite number")]
    InvalidNumber(f64),

    #[error("unknown checklist '{0}'")]
    UnknownSet(String),

    #[error("'{item}' is not an option in '{set}'")]
    UnknownMember { set: String, item: String },

    #[error("unknown slot '{0}'")]
    UnknownSlot(String),

    #[error("unknown item '{0}'")]
    UnknownItem(String),

    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("'{principal}' is not on the ACL of '{entity}'")]
    PrincipalNotListed { entity: String, principal: String },

    #[error("'{0}' is not an available principal")]
    PrincipalUnavailable(String),

    #[error("'{principal}' already exists on the ACL of '{entity}'")]
    DuplicatePrincipal { entity: String, principal: String },

    #[error("unknown rule table '{0}'")]
    UnknownTable(String),

    #[error("rule is missing a source, destination, or port")]
    IncompleteRule,

    #[error("table '{table}' has no rule at position {index}")]
    RuleOutOfRange { table: String, index: usize },

    #[error("the module no longer accepts changes")]
    Locked,
}

/// Apply one action, returning the next selection
pub fn apply(scenario: &Scenario, state: &Selection, action: &Action) -> Result<Selection, Rejection> {
    let mut next = state.clone();

    match action {
        Action::SelectOption { field, option } => {
            let options = scenario
                .options_for(field)
                .ok_or_else(|| choice_rejection(scenario, field))?;
            if !options.iter().any(|o| &o.value == option) {
                return Err(Rejection::UnknownOption {
                    field: field.clone(),
                    option: option.clone(),
                });
            }
            next.set_field(field, Value::Text(option.clone()));
        }

        Action::CycleOption { field } => {
            let options = scenario
                .options_for(field)
                .ok_or_else(|| choice_rejection(scenario, field))?;
            let current = state
                .field(field)
                .and_then(Value::as_text)
                .and_then(|value| options.iter().position(|o| o.value == value));
            let index = current.map_or(0, |i| (i + 1) % options.len());
            if let Some(option) = options.get(index) {
                next.set_field(field, Value::Text(option.value.clone()));
            }
        }

        Action::EnterText { field, text } => {
            require_kind(scenario, field, FieldKind::Text, "text")?;
            next.set_field(field, Value::Text(text.clone()));
        }

        Action::EnterNumber { field, value } => {
            require_kind(scenario, field, FieldKind::Number, "numeric")?;
            if !value.is_finite() {
                return Err(Rejection::InvalidNumber(*value));
            }
            next.set_field(field, Value::Number(*value));
        }

        Action::SetFlag { field, value } => {
            require_kind(scenario, field, FieldKind::Flag, "on/off")?;
            next.set_field(field, Value::Flag(*value));
        }

        Action::ClearAnswer { field } => {
            if scenario.field(field).is_none() && scenario.question(field).is_none() {
                return Err(Rejection::UnknownField(field.clone()));
            }
            next.clear_field(field);
        }

        Action::ToggleMembership { set, item } => {
            let checklist = scenario
                .checklist(set)
                .ok_or_else(|| Rejection::UnknownSet(set.clone()))?;
            if !checklist.options.contains(item) {
                return Err(Rejection::UnknownMember {
                    set: set.clone(),
                    item: item.clone(),
                });
            }
            next.toggle_member(set, item);
        }

        Action::AssignToSlot { slot, item } => {
            if scenario.slot(slot).is_none() {
                return Err(Rejection::UnknownSlot(slot.clone()));
            }
            if scenario.item(item).is_none() {
                return Err(Rejection::UnknownItem(item.clone()));
            }
            next.assign(slot, item);
        }

        Action::ClearSlot { slot } => {
            if scenario.slot(slot).is_none() {
                return Err(Rejection::UnknownSlot(slot.clone()));
            }
            next.clear_slot(slot);
        }

        Action::TogglePermission {
            entity,
            principal,
            permission,
        } => {
            require_entity(scenario, entity)?;
            let entry = next
                .acl_mut(entity)
                .entry_mut(principal)
                .ok_or_else(|| not_listed(entity, principal))?;
            entry.permissions = toggle_permission(entry.permissions, *permission);
        }

        Action::SetEntryKind {
            entity,
            principal,
            kind,
        } => {
            require_entity(scenario, entity)?;
            let entry = next
                .acl_mut(entity)
                .entry_mut(principal)
                .ok_or_else(|| not_listed(entity, principal))?;
            entry.kind = *kind;
        }

        Action::AddPrincipal { entity, principal } => {
            require_entity(scenario, entity)?;
            if !scenario.principals.is_empty() && !scenario.principals.contains(principal) {
                return Err(Rejection::PrincipalUnavailable(principal.clone()));
            }
            let acl = next.acl_mut(entity);
            if acl.contains(principal) {
                return Err(Rejection::DuplicatePrincipal {
                    entity: entity.clone(),
                    principal: principal.clone(),
                });
            }
            acl.push(AccessEntry::with_default_permissions(principal.clone()));
        }

        Action::RemovePrincipal { entity, principal } => {
            require_entity(scenario, entity)?;
            if !next.acl_mut(entity).remove(principal) {
                return Err(not_listed(entity, principal));
            }
        }

        Action::AddRule { table, rule } => {
            if scenario.table(table).is_none() {
                return Err(Rejection::UnknownTable(table.clone()));
            }
            if !rule.is_complete() {
                return Err(Rejection::IncompleteRule);
            }
            let mut rule = rule.clone();
            rule.source = rule.source.trim().to_string();
            rule.destination = rule.destination.trim().to_string();
            rule.port = rule.port.trim().to_string();
            next.table_mut(table).push(rule);
        }

        Action::RemoveRule { table, index } => {
            if scenario.table(table).is_none() {
                return Err(Rejection::UnknownTable(table.clone()));
            }
            let rules = next.table_mut(table);
            if *index >= rules.len() {
                return Err(Rejection::RuleOutOfRange {
                    table: table.clone(),
                    index: *index,
                });
            }
            rules.remove(*index);
        }
    }

    Ok(next)
}

fn choice_rejection(scenario: &Scenario, field: &str) -> Rejection {
    if scenario.field(field).is_some() {
        Rejection::WrongKind {
            field: field.to_string(),
            attempted: "option",
        }
    } else {
        Rejection::UnknownField(field.to_string())
    }
}

fn require_kind(
    scenario: &Scenario,
    field: &str,
    kind: FieldKind,
    attempted: &'static str,
) -> Result<(), Rejection> {
    match scenario.field(field) {
        None => Err(Rejection::UnknownField(field.to_string())),
        Some(f) if f.kind != kind => Err(Rejection::WrongKind {
            field: field.to_string(),
            attempted,
        }),
        Some(_) => Ok(()),
    }
}

fn require_entity(scenario: &Scenario, entity: &str) -> Result<(), Rejection> {
    scenario
        .entity(entity)
        .map(|_| ())
        .ok_or_else(|| Rejection::UnknownEntity(entity.to_string()))
}

fn not_listed(entity: &str, principal: &str) -> Rejection {
    Rejection::PrincipalNotListed {
        entity: entity.to_string(),
        principal: principal.to_string(),
    }
}
