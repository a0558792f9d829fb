//! Scenario schema types for TOML deserialization.
//!
//! A scenario describes one performance-based question: the prompt, the
//! configurable surface the learner edits, and the rules a finished
//! configuration is graded against. Scenarios are pure data; all behavior
//! lives in `crate::simulation`.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::core::types::{ModuleId, Score};
use crate::scenario::permissions::{Permission, PermissionSet};

/// A learner-entered value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Numeric view; text is parsed so typed-in answers compare as numbers
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(text) => text.trim().parse().ok(),
            Value::Flag(_) => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Flag(flag) => write!(f, "{}", flag),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(text) => f.write_str(text),
        }
    }
}

/// Input widget kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Choice,
    Text,
    Number,
    Flag,
}

/// One selectable option of a choice field or question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: String,
    #[serde(default)]
    pub label: String,
}

impl ChoiceOption {
    pub fn display(&self) -> &str {
        if self.label.is_empty() {
            &self.value
        } else {
            &self.label
        }
    }
}

/// A configurable setting, optionally seeded with an insecure baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub label: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub options: Vec<ChoiceOption>,
    #[serde(default)]
    pub default: Option<Value>,
}

/// Independent single-answer question with exactly one correct option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub options: Vec<ChoiceOption>,
    pub correct: String,
    /// Shown when the question is answered incorrectly
    pub feedback: String,
}

/// A placeable unit (device, phase, port)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// A slot accepting one item; several items may be valid answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub category: Option<String>,
    pub accepts: Vec<String>,
    /// Shown when the slot holds a wrong item
    #[serde(default)]
    pub message: Option<String>,
}

/// Multi-select list of findings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub id: String,
    pub label: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    Allow,
    Deny,
}

/// One row of an access control list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessEntry {
    pub principal: String,
    #[serde(default)]
    pub kind: EntryKind,
    pub permissions: PermissionSet,
}

impl AccessEntry {
    /// Row created when a principal is added to an ACL
    pub fn with_default_permissions(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            kind: EntryKind::Allow,
            permissions: [Permission::ReadExecute, Permission::List, Permission::Read]
                .into_iter()
                .collect(),
        }
    }

    /// Whether this row actually grants `permission`
    pub fn allows(&self, permission: Permission) -> bool {
        self.kind == EntryKind::Allow && self.permissions.contains(permission)
    }
}

/// A named object owning an ACL (folder, share, bucket)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub acl: Vec<AccessEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficAction {
    Allow,
    Deny,
}

/// One firewall rule in an editable rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficRule {
    pub action: TrafficAction,
    pub source: String,
    pub destination: String,
    pub port: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub log: bool,
}

fn default_protocol() -> String {
    "TCP".to_string()
}

impl TrafficRule {
    /// A rule is usable only when addressing fields are filled in
    pub fn is_complete(&self) -> bool {
        !self.source.trim().is_empty()
            && !self.destination.trim().is_empty()
            && !self.port.trim().is_empty()
    }
}

/// Editable list of traffic rules, optionally pre-populated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub rules: Vec<TrafficRule>,
}

/// Text matcher used by traffic rule patterns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    /// Case-insensitive equality with any listed value
    Exact(Vec<String>),
    /// Contains any listed fragment
    Contains(Vec<String>),
}

impl TextMatch {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            TextMatch::Exact(values) => values.iter().any(|v| v.eq_ignore_ascii_case(text.trim())),
            TextMatch::Contains(fragments) => fragments.iter().any(|f| text.contains(f.as_str())),
        }
    }
}

/// Shape a traffic rule must have; unset parts match anything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficPattern {
    #[serde(default)]
    pub action: Option<TrafficAction>,
    #[serde(default)]
    pub source: Option<TextMatch>,
    #[serde(default)]
    pub destination: Option<TextMatch>,
    #[serde(default)]
    pub port: Option<TextMatch>,
    #[serde(default)]
    pub log: Option<bool>,
}

impl TrafficPattern {
    pub fn matches(&self, rule: &TrafficRule) -> bool {
        self.action.map_or(true, |a| a == rule.action)
            && self.source.as_ref().map_or(true, |m| m.matches(&rule.source))
            && self.destination.as_ref().map_or(true, |m| m.matches(&rule.destination))
            && self.port.as_ref().map_or(true, |m| m.matches(&rule.port))
            && self.log.map_or(true, |l| l == rule.log)
    }
}

/// Expected numeric answer: a literal or a product of scenario constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expected {
    Literal(f64),
    Product { product: Vec<String> },
}

impl Expected {
    pub fn resolve(&self, constants: &BTreeMap<String, f64>) -> Option<f64> {
        match self {
            Expected::Literal(value) => Some(*value),
            Expected::Product { product } => product
                .iter()
                .try_fold(1.0, |acc, name| constants.get(name).map(|v| acc * v)),
        }
    }

    fn constant_names(&self) -> &[String] {
        match self {
            Expected::Literal(_) => &[],
            Expected::Product { product } => product,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl CompareOp {
    pub fn holds(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Gt => lhs > rhs,
        }
    }
}

fn default_yes() -> String {
    "yes".to_string()
}

fn default_no() -> String {
    "no".to_string()
}

/// Predicate over the selection state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Check {
    Equals {
        field: String,
        value: Value,
    },
    NotEquals {
        field: String,
        value: Value,
    },
    OneOf {
        field: String,
        values: Vec<String>,
    },
    /// Case-insensitive substring test
    Contains {
        field: String,
        text: String,
    },
    NotContains {
        field: String,
        text: String,
    },
    MinLength {
        field: String,
        min: usize,
    },
    Compare {
        field: String,
        op: CompareOp,
        value: f64,
    },
    /// Exact equality; formula answers are graded without tolerance
    NumberEquals {
        field: String,
        expected: Expected,
    },
    /// Choice must be `yes` when `benefit > cost`, otherwise `no`
    Decide {
        field: String,
        benefit: Expected,
        cost: Expected,
        #[serde(default = "default_yes")]
        yes: String,
        #[serde(default = "default_no")]
        no: String,
    },
    /// `then` is only checked when `condition` holds
    When {
        condition: Box<Check>,
        then: Box<Check>,
    },
    QuestionCorrect {
        question: String,
    },
    SlotAccepts {
        slot: String,
    },
    SetExact {
        set: String,
        required: Vec<String>,
    },
    PrincipalPresent {
        entity: String,
        principal: String,
    },
    /// An entry missing from the ACL satisfies this check
    PrincipalAbsent {
        entity: String,
        principal: String,
    },
    HasPermission {
        entity: String,
        principal: String,
        permission: Permission,
    },
    /// An entry missing from the ACL satisfies this check
    LacksPermissions {
        entity: String,
        principal: String,
        permissions: Vec<Permission>,
    },
    #[serde(rename = "entry_kind")]
    KindIs {
        entity: String,
        principal: String,
        kind: EntryKind,
    },
    TableHas {
        table: String,
        pattern: TrafficPattern,
    },
}

/// A graded rule with its feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub check: Check,
    pub message: String,
    /// Used instead of `message` when the answer was left unset
    #[serde(default)]
    pub missing_message: Option<String>,
    /// Used for extraneous selections in `set_exact` checks
    #[serde(default)]
    pub extra_message: Option<String>,
    #[serde(default)]
    pub weight: Option<u32>,
}

/// How rule outcomes become a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScoringPolicy {
    /// 100 with no violations, otherwise 0
    #[default]
    AllOrNothing,
    /// Sum of satisfied weights, minus `extra_penalty` per extraneous selection
    Weighted {
        pass_threshold: Score,
        #[serde(default)]
        extra_penalty: u32,
    },
}

/// Complete scenario definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: ModuleId,
    /// Module this scenario is an alternate case of; progress is shared
    #[serde(default)]
    pub variant_of: Option<ModuleId>,
    pub title: String,
    pub scenario_text: String,
    pub objective_text: String,
    #[serde(default)]
    pub success_text: String,
    #[serde(default)]
    pub scoring: ScoringPolicy,
    #[serde(default)]
    pub constants: BTreeMap<String, f64>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub inventory: Vec<Item>,
    #[serde(default)]
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub checklists: Vec<Checklist>,
    /// Principals that may be added to ACLs; empty means any
    #[serde(default)]
    pub principals: Vec<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub tables: Vec<RuleTable>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Scenario {
    /// Catalog module that completions of this scenario count towards
    pub fn module_id(&self) -> &ModuleId {
        self.variant_of.as_ref().unwrap_or(&self.id)
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.inventory.iter().find(|i| i.id == id)
    }

    pub fn slot(&self, id: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == id)
    }

    pub fn checklist(&self, id: &str) -> Option<&Checklist> {
        self.checklists.iter().find(|c| c.id == id)
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn table(&self, id: &str) -> Option<&RuleTable> {
        self.tables.iter().find(|t| t.id == id)
    }

    /// Options of a choice field or question
    pub fn options_for(&self, id: &str) -> Option<&[ChoiceOption]> {
        if let Some(question) = self.question(id) {
            return Some(&question.options);
        }
        self.field(id)
            .filter(|f| f.kind == FieldKind::Choice)
            .map(|f| f.options.as_slice())
    }

    /// Rules implied by questions and slots, followed by the authored rules
    pub fn effective_rules(&self) -> Vec<Rule> {
        let mut rules = Vec::with_capacity(self.questions.len() + self.slots.len() + self.rules.len());

        for question in &self.questions {
            rules.push(Rule {
                check: Check::QuestionCorrect {
                    question: question.id.clone(),
                },
                message: question.feedback.clone(),
                missing_message: Some(format!("{}: No answer selected.", question.text)),
                extra_message: None,
                weight: None,
            });
        }

        for slot in &self.slots {
            rules.push(Rule {
                check: Check::SlotAccepts {
                    slot: slot.id.clone(),
                },
                message: slot
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("{}: Incorrect item placed.", slot.label)),
                missing_message: Some(format!("{}: Empty slot.", slot.label)),
                extra_message: None,
                weight: None,
            });
        }

        rules.extend(self.rules.iter().cloned());
        rules
    }

    /// Per-rule weights aligned with `effective_rules`
    ///
    /// Explicit weights are used as authored; otherwise 100 is split evenly.
    pub fn weights(&self) -> Vec<f64> {
        let rules = self.effective_rules();
        if rules.iter().all(|r| r.weight.is_some()) && !rules.is_empty() {
            rules.iter().map(|r| r.weight.unwrap_or(0) as f64).collect()
        } else {
            let share = 100.0 / rules.len().max(1) as f64;
            vec![share; rules.len()]
        }
    }

    /// Inventory in a learner-facing shuffled order
    pub fn shuffled_inventory<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.inventory.iter().collect();
        items.shuffle(rng);
        items
    }

    /// Check authoring invariants, returning every problem found
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        if self.id.as_str().trim().is_empty() {
            problems.push("scenario id is empty".to_string());
        }
        if self.variant_of.as_ref() == Some(&self.id) {
            problems.push(format!("scenario '{}' is a variant of itself", self.id));
        }

        let mut input_ids = HashSet::new();
        for id in self.fields.iter().map(|f| &f.id).chain(self.questions.iter().map(|q| &q.id)) {
            if !input_ids.insert(id.as_str()) {
                problems.push(format!("duplicate field/question id '{}'", id));
            }
        }

        for field in &self.fields {
            if field.kind == FieldKind::Choice {
                if field.options.is_empty() {
                    problems.push(format!("choice field '{}' has no options", field.id));
                }
                if let Some(Value::Text(default)) = &field.default {
                    if !field.options.iter().any(|o| &o.value == default) {
                        problems.push(format!(
                            "field '{}' default '{}' is not an option",
                            field.id, default
                        ));
                    }
                }
            }
        }

        for question in &self.questions {
            if !question.options.iter().any(|o| o.value == question.correct) {
                problems.push(format!(
                    "question '{}' correct answer '{}' is not among its options",
                    question.id, question.correct
                ));
            }
        }

        let mut item_ids = HashSet::new();
        for item in &self.inventory {
            if !item_ids.insert(item.id.as_str()) {
                problems.push(format!("duplicate inventory item '{}'", item.id));
            }
        }

        for slot in &self.slots {
            if slot.accepts.is_empty() {
                problems.push(format!("slot '{}' accepts nothing", slot.id));
            }
            for accepted in &slot.accepts {
                match self.item(accepted) {
                    None => problems.push(format!(
                        "slot '{}' accepts unknown item '{}'",
                        slot.id, accepted
                    )),
                    Some(item) => {
                        if let (Some(wanted), Some(actual)) = (&slot.category, &item.category) {
                            if wanted != actual {
                                problems.push(format!(
                                    "slot '{}' ({}) accepts item '{}' of category '{}'",
                                    slot.id, wanted, item.id, actual
                                ));
                            }
                        }
                    }
                }
            }
        }

        for entity in &self.entities {
            let mut principals = HashSet::new();
            for entry in &entity.acl {
                if !principals.insert(entry.principal.as_str()) {
                    problems.push(format!(
                        "entity '{}' lists principal '{}' twice",
                        entity.id, entry.principal
                    ));
                }
            }
        }

        let rules = self.effective_rules();
        if rules.is_empty() {
            problems.push("scenario has no rules".to_string());
        }
        for rule in &self.rules {
            self.validate_check(&rule.check, &mut problems);
        }

        let weighted = rules.iter().filter(|r| r.weight.is_some()).count();
        match self.scoring {
            ScoringPolicy::AllOrNothing => {
                if weighted > 0 {
                    problems.push("rule weights are only meaningful with weighted scoring".into());
                }
            }
            ScoringPolicy::Weighted { pass_threshold, .. } => {
                if pass_threshold > 100 {
                    problems.push(format!("pass threshold {} exceeds 100", pass_threshold));
                }
                if weighted > 0 && weighted < rules.len() {
                    problems.push("either every rule or no rule may carry a weight".into());
                }
                if weighted == rules.len() && weighted > 0 {
                    let total: u32 = rules.iter().filter_map(|r| r.weight).sum();
                    if total != 100 {
                        problems.push(format!("rule weights sum to {}, expected 100", total));
                    }
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    fn validate_check(&self, check: &Check, problems: &mut Vec<String>) {
        let require_field = |id: &str, problems: &mut Vec<String>| {
            if self.field(id).is_none() && self.question(id).is_none() {
                problems.push(format!("rule references unknown field '{}'", id));
            }
        };
        let require_constants = |expected: &Expected, problems: &mut Vec<String>| {
            for name in expected.constant_names() {
                if !self.constants.contains_key(name) {
                    problems.push(format!("rule references unknown constant '{}'", name));
                }
            }
        };

        match check {
            Check::Equals { field, .. }
            | Check::NotEquals { field, .. }
            | Check::OneOf { field, .. }
            | Check::Contains { field, .. }
            | Check::NotContains { field, .. }
            | Check::MinLength { field, .. }
            | Check::Compare { field, .. } => require_field(field, problems),
            Check::NumberEquals { field, expected } => {
                require_field(field, problems);
                require_constants(expected, problems);
            }
            Check::Decide {
                field,
                benefit,
                cost,
                ..
            } => {
                require_field(field, problems);
                require_constants(benefit, problems);
                require_constants(cost, problems);
            }
            Check::When { condition, then } => {
                self.validate_check(condition, problems);
                self.validate_check(then, problems);
            }
            Check::QuestionCorrect { question } => {
                if self.question(question).is_none() {
                    problems.push(format!("rule references unknown question '{}'", question));
                }
            }
            Check::SlotAccepts { slot } => {
                if self.slot(slot).is_none() {
                    problems.push(format!("rule references unknown slot '{}'", slot));
                }
            }
            Check::SetExact { set, required } => match self.checklist(set) {
                None => problems.push(format!("rule references unknown checklist '{}'", set)),
                Some(checklist) => {
                    if required.is_empty() {
                        problems.push(format!("checklist '{}' rule requires nothing", set));
                    }
                    for item in required {
                        if !checklist.options.contains(item) {
                            problems.push(format!(
                                "checklist '{}' requires '{}' which is not an option",
                                set, item
                            ));
                        }
                    }
                }
            },
            Check::PrincipalPresent { entity, .. }
            | Check::PrincipalAbsent { entity, .. }
            | Check::HasPermission { entity, .. }
            | Check::LacksPermissions { entity, .. }
            | Check::KindIs { entity, .. } => {
                if self.entity(entity).is_none() {
                    problems.push(format!("rule references unknown entity '{}'", entity));
                }
            }
            Check::TableHas { table, .. } => {
                if self.table(table).is_none() {
                    problems.push(format!("rule references unknown table '{}'", table));
                }
            }
        }
    }
}
