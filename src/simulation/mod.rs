//! Scenario runtime: selection state, actions, grading, and run lifecycle

pub mod controller;
pub mod rule_eval;
pub mod run;
pub mod scoring;
pub mod selection;

pub use controller::{apply, Action, Rejection};
pub use rule_eval::{evaluate, Outcome};
pub use run::{CompletionHandler, ModuleRun, Phase};
pub use scoring::{score, validate, Verdict};
pub use selection::{Acl, Selection};
