//! The learner's in-progress answer for one scenario

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::scenario::model::{AccessEntry, Scenario, TrafficRule, Value};

/// Access control list of one entity, in display order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Acl {
    entries: Vec<AccessEntry>,
}

impl Acl {
    pub fn new(entries: Vec<AccessEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[AccessEntry] {
        &self.entries
    }

    pub fn entry(&self, principal: &str) -> Option<&AccessEntry> {
        self.entries.iter().find(|e| e.principal == principal)
    }

    pub(crate) fn entry_mut(&mut self, principal: &str) -> Option<&mut AccessEntry> {
        self.entries.iter_mut().find(|e| e.principal == principal)
    }

    pub fn contains(&self, principal: &str) -> bool {
        self.entry(principal).is_some()
    }

    pub(crate) fn push(&mut self, entry: AccessEntry) {
        self.entries.push(entry);
    }

    /// Remove a principal's row, returning whether one existed
    pub(crate) fn remove(&mut self, principal: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.principal != principal);
        self.entries.len() != before
    }
}

/// Everything the learner has set, keyed by the ids declared in the scenario
///
/// Slot assignments are stored slot -> item; an item occupies at most one
/// slot because assignment moves it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    fields: BTreeMap<String, Value>,
    sets: BTreeMap<String, BTreeSet<String>>,
    slots: BTreeMap<String, String>,
    acls: BTreeMap<String, Acl>,
    tables: BTreeMap<String, Vec<TrafficRule>>,
}

impl Selection {
    /// Starting state: field defaults, baseline ACLs, and pre-populated tables
    pub fn initial(scenario: &Scenario) -> Self {
        let mut selection = Selection::default();

        for field in &scenario.fields {
            if let Some(default) = &field.default {
                selection.fields.insert(field.id.clone(), default.clone());
            }
        }
        for entity in &scenario.entities {
            selection
                .acls
                .insert(entity.id.clone(), Acl::new(entity.acl.clone()));
        }
        for table in &scenario.tables {
            selection.tables.insert(table.id.clone(), table.rules.clone());
        }

        selection
    }

    pub fn field(&self, id: &str) -> Option<&Value> {
        self.fields.get(id)
    }

    /// Members chosen from a checklist; empty when nothing is selected
    pub fn set(&self, id: &str) -> impl Iterator<Item = &str> {
        self.sets.get(id).into_iter().flatten().map(String::as_str)
    }

    pub fn set_contains(&self, id: &str, item: &str) -> bool {
        self.sets.get(id).map_or(false, |s| s.contains(item))
    }

    pub fn slot(&self, id: &str) -> Option<&str> {
        self.slots.get(id).map(String::as_str)
    }

    /// Slot currently holding `item`
    pub fn slot_of(&self, item: &str) -> Option<&str> {
        self.slots
            .iter()
            .find(|(_, filler)| filler.as_str() == item)
            .map(|(slot, _)| slot.as_str())
    }

    pub fn acl(&self, entity: &str) -> Option<&Acl> {
        self.acls.get(entity)
    }

    pub fn table(&self, id: &str) -> &[TrafficRule] {
        self.tables.get(id).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn set_field(&mut self, id: &str, value: Value) {
        self.fields.insert(id.to_string(), value);
    }

    pub(crate) fn clear_field(&mut self, id: &str) -> Option<Value> {
        self.fields.remove(id)
    }

    /// Flip membership, returning whether the item is now selected
    pub(crate) fn toggle_member(&mut self, set: &str, item: &str) -> bool {
        let members = self.sets.entry(set.to_string()).or_default();
        if members.remove(item) {
            false
        } else {
            members.insert(item.to_string());
            true
        }
    }

    /// Place `item` in `slot`, vacating whichever slot held it before
    pub(crate) fn assign(&mut self, slot: &str, item: &str) {
        self.slots.retain(|_, filler| filler != item);
        self.slots.insert(slot.to_string(), item.to_string());
    }

    pub(crate) fn clear_slot(&mut self, slot: &str) -> Option<String> {
        self.slots.remove(slot)
    }

    pub(crate) fn acl_mut(&mut self, entity: &str) -> &mut Acl {
        self.acls.entry(entity.to_string()).or_default()
    }

    pub(crate) fn table_mut(&mut self, id: &str) -> &mut Vec<TrafficRule> {
        self.tables.entry(id.to_string()).or_default()
    }
}
