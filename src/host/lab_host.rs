//! Host application state: user, progress, missed questions, filter
//!
//! Everything persisted goes through an injected [`KeyValueStore`]. Values
//! are JSON strings; anything malformed is logged and treated as empty.

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use crate::core::config::config;
use crate::core::error::{PbqError, Result};
use crate::core::types::{DifficultyFilter, ModuleId, QuestionId, Score};
use crate::host::catalog::{Catalog, CatalogEntry};
use crate::host::dashboard::{summarize, DashboardStats};
use crate::host::storage::{KeyValueStore, Namespace};
use crate::quiz::attempt::{QuestionResult, QuizAttempt};
use crate::quiz::bank::QuestionBank;
use crate::quiz::sampler::{select, QuizMode};
use crate::scenario::library::ScenarioLibrary;
use crate::scenario::model::Scenario;
use crate::simulation::run::CompletionHandler;

pub const FILTER_KEY: &str = "pbqDifficultyFilter";
pub const CURRENT_USER_KEY: &str = "pbq_current_user";
pub const MISSED_KEY: &str = "pbq_missed_questions";
pub const PROGRESS_KEY: &str = "pbq_all_progress";

/// Most recent score per module for one user
pub type Progress = BTreeMap<ModuleId, Score>;

/// What opening a catalog entry yields
#[derive(Debug, Clone)]
pub enum ModuleView {
    Lab(Scenario),
    UnderConstruction(ModuleId),
}

pub struct LabHost<S: KeyValueStore> {
    store: S,
    catalog: Catalog,
    library: ScenarioLibrary,
    bank: QuestionBank,
    current_user: Option<String>,
    all_progress: BTreeMap<String, Progress>,
    missed: BTreeSet<QuestionId>,
    filter: DifficultyFilter,
}

impl<S: KeyValueStore> LabHost<S> {
    /// Restore host state from the store
    pub fn new(store: S, catalog: Catalog, library: ScenarioLibrary, bank: QuestionBank) -> Self {
        let current_user = store
            .get(Namespace::Durable, CURRENT_USER_KEY)
            .and_then(|raw| read_json::<Option<String>>(CURRENT_USER_KEY, &raw))
            .flatten();
        let all_progress = store
            .get(Namespace::Durable, PROGRESS_KEY)
            .and_then(|raw| read_json(PROGRESS_KEY, &raw))
            .unwrap_or_default();
        let missed = store
            .get(Namespace::Durable, MISSED_KEY)
            .and_then(|raw| read_json::<Vec<QuestionId>>(MISSED_KEY, &raw))
            .map(|ids: Vec<QuestionId>| ids.into_iter().collect())
            .unwrap_or_default();
        let filter = store
            .get(Namespace::Session, FILTER_KEY)
            .and_then(|raw| match raw.parse() {
                Ok(filter) => Some(filter),
                Err(e) => {
                    warn!(key = FILTER_KEY, error = %e, "Ignoring stored filter");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            store,
            catalog,
            library,
            bank,
            current_user,
            all_progress,
            missed,
            filter,
        }
    }

    /// Host with the embedded catalog, scenarios, and question bank
    pub fn with_builtin_content(store: S) -> Result<Self> {
        Ok(Self::new(
            store,
            Catalog::builtin()?,
            ScenarioLibrary::builtin()?,
            QuestionBank::builtin()?,
        ))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn library(&self) -> &ScenarioLibrary {
        &self.library
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    // === USER ===

    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    pub fn login(&mut self, username: &str) -> Result<()> {
        let username = username.trim();
        if username.is_empty() {
            return Err(PbqError::InvalidInput("username must not be empty".into()));
        }
        self.current_user = Some(username.to_string());
        write_json(&mut self.store, Namespace::Durable, CURRENT_USER_KEY, &self.current_user)?;
        info!(user = username, "Logged in");
        Ok(())
    }

    pub fn logout(&mut self) -> Result<()> {
        if let Some(user) = self.current_user.take() {
            info!(user = %user, "Logged out");
        }
        self.store.remove(Namespace::Durable, CURRENT_USER_KEY)
    }

    // === PROGRESS ===

    /// Progress of the logged-in user; empty when nobody is logged in
    pub fn progress(&self) -> Progress {
        self.current_user
            .as_ref()
            .and_then(|user| self.all_progress.get(user))
            .cloned()
            .unwrap_or_default()
    }

    /// Record a completion for the logged-in user, replacing any earlier score
    ///
    /// Returns whether anything was recorded.
    pub fn record_score(&mut self, module: &ModuleId, score: Score) -> Result<bool> {
        let Some(user) = self.current_user.clone() else {
            warn!(module = %module, "Completion without a logged-in user, not recorded");
            return Ok(false);
        };

        self.all_progress
            .entry(user.clone())
            .or_default()
            .insert(module.clone(), score.min(100));
        write_json(&mut self.store, Namespace::Durable, PROGRESS_KEY, &self.all_progress)?;
        info!(user = %user, module = %module, score, "Recorded score");
        Ok(true)
    }

    pub fn dashboard(&self) -> DashboardStats {
        summarize(&self.catalog, &self.progress())
    }

    // === QUIZ ===

    pub fn missed(&self) -> &BTreeSet<QuestionId> {
        &self.missed
    }

    /// Fold quiz results into the missed set
    ///
    /// Correct answers leave the set, then incorrect ones join it, so an id
    /// answered both ways in one batch stays missed.
    pub fn record_quiz(&mut self, results: &[QuestionResult]) -> Result<()> {
        for result in results.iter().filter(|r| r.correct) {
            self.missed.remove(&result.question_id);
        }
        for result in results.iter().filter(|r| !r.correct) {
            self.missed.insert(result.question_id);
        }
        let ids: Vec<QuestionId> = self.missed.iter().copied().collect();
        write_json(&mut self.store, Namespace::Durable, MISSED_KEY, &ids)?;
        info!(answered = results.len(), missed = ids.len(), "Recorded quiz results");
        Ok(())
    }

    /// Draw a quiz for the mode with the configured lengths
    pub fn start_quiz<R: Rng + ?Sized>(&self, mode: &QuizMode, rng: &mut R) -> QuizAttempt {
        let len = match mode {
            QuizMode::Domain(_) => config().domain_quiz_length,
            _ => config().quiz_length,
        };
        let questions = select(&self.bank, mode, &self.missed, len, rng)
            .into_iter()
            .cloned()
            .collect();
        QuizAttempt::new(questions)
    }

    // === CATALOG ===

    pub fn filter(&self) -> DifficultyFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: DifficultyFilter) -> Result<()> {
        self.filter = filter;
        self.store
            .set(Namespace::Session, FILTER_KEY, filter.as_str().to_string())
    }

    pub fn visible_modules(&self) -> Vec<&CatalogEntry> {
        self.catalog.filtered(self.filter)
    }

    /// Resolve a module id to its lab
    ///
    /// Any id without an authored scenario, listed in the catalog or not,
    /// opens the placeholder view. Each open starts from a fresh copy.
    pub fn open(&self, id: &ModuleId) -> ModuleView {
        match self.library.get(id) {
            Some(scenario) => ModuleView::Lab(scenario.clone()),
            None => {
                if !self.catalog.contains(id) {
                    warn!(module = %id, "Opening a module outside the catalog");
                }
                ModuleView::UnderConstruction(id.clone())
            }
        }
    }

    /// Every authored case of a module, its primary scenario first
    pub fn variants(&self, id: &ModuleId) -> Vec<Scenario> {
        self.library.variants(id).into_iter().cloned().collect()
    }
}

fn write_json<S: KeyValueStore, T: Serialize>(
    store: &mut S,
    namespace: Namespace,
    key: &str,
    value: &T,
) -> Result<()> {
    let json = serde_json::to_string(value)?;
    store.set(namespace, key, json)
}

fn read_json<T: DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "Stored value is malformed, treating as empty");
            None
        }
    }
}

impl<S: KeyValueStore> CompletionHandler for LabHost<S> {
    fn on_complete(&mut self, module: &Scenario, score: Score) {
        if let Err(e) = self.record_score(module.module_id(), score) {
            warn!(module = %module.module_id(), error = %e, "Failed to persist score");
        }
    }
}
