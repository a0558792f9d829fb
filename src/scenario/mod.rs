//! Scenario content: the data each lab is built from

pub mod library;
pub mod model;
pub mod permissions;

pub use library::{parse_directory, parse_scenario, ScenarioLibrary};
pub use model::{
    AccessEntry, Check, EntryKind, Field, FieldKind, Rule, Scenario, ScoringPolicy, TrafficAction,
    TrafficRule, Value,
};
pub use permissions::{apply_permission_toggle, toggle_permission, Permission, PermissionSet};
