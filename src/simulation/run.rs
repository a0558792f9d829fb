//! Lifecycle of a single attempt at a module

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::types::Score;
use crate::scenario::model::Scenario;
use crate::simulation::controller::{self, Action, Rejection};
use crate::simulation::scoring::{validate, Verdict};
use crate::simulation::selection::Selection;

/// Where a run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// Nothing has been changed yet
    Unanswered,
    InProgress,
    Submitted { passed: bool },
    Exited,
}

/// Receives the outcome of a run
///
/// `on_complete` fires at most once per run, on the first passing submission.
pub trait CompletionHandler {
    fn on_complete(&mut self, module: &Scenario, score: Score);

    fn on_exit(&mut self, _module: &Scenario) {}
}

/// One attempt at a scenario: selection state plus phase
#[derive(Debug, Clone)]
pub struct ModuleRun<'a> {
    scenario: &'a Scenario,
    selection: Selection,
    phase: Phase,
    last_verdict: Option<Verdict>,
    completed: bool,
}

impl<'a> ModuleRun<'a> {
    pub fn new(scenario: &'a Scenario) -> Self {
        Self {
            scenario,
            selection: Selection::initial(scenario),
            phase: Phase::Unanswered,
            last_verdict: None,
            completed: false,
        }
    }

    pub fn scenario(&self) -> &'a Scenario {
        self.scenario
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_verdict(&self) -> Option<&Verdict> {
        self.last_verdict.as_ref()
    }

    /// A passed or exited run accepts nothing but exit
    fn is_locked(&self) -> bool {
        matches!(
            self.phase,
            Phase::Submitted { passed: true } | Phase::Exited
        )
    }

    /// Apply a learner action; a rejected action leaves the run unchanged
    pub fn apply(&mut self, action: &Action) -> Result<(), Rejection> {
        if self.is_locked() {
            return Err(Rejection::Locked);
        }

        match controller::apply(self.scenario, &self.selection, action) {
            Ok(next) => {
                self.selection = next;
                self.phase = Phase::InProgress;
                debug!(scenario = %self.scenario.id, ?action, "Applied action");
                Ok(())
            }
            Err(rejection) => {
                warn!(scenario = %self.scenario.id, %rejection, "Rejected action");
                Err(rejection)
            }
        }
    }

    /// Grade the current selection
    ///
    /// The handler is told about the first passing submission only.
    pub fn submit(&mut self, handler: &mut dyn CompletionHandler) -> Result<&Verdict, Rejection> {
        if self.is_locked() {
            return Err(Rejection::Locked);
        }

        let verdict = validate(self.scenario, &self.selection);
        self.phase = Phase::Submitted {
            passed: verdict.passed,
        };

        info!(
            scenario = %self.scenario.id,
            score = verdict.score,
            passed = verdict.passed,
            "Submitted module"
        );

        if verdict.passed && !self.completed {
            self.completed = true;
            handler.on_complete(self.scenario, verdict.score);
        }

        Ok(self.last_verdict.insert(verdict))
    }

    /// Restore the starting selection and clear feedback
    pub fn reset(&mut self) -> Result<(), Rejection> {
        if self.is_locked() {
            return Err(Rejection::Locked);
        }
        self.selection = Selection::initial(self.scenario);
        self.phase = Phase::Unanswered;
        self.last_verdict = None;
        Ok(())
    }

    /// Leave the module; valid from any phase
    pub fn exit(&mut self, handler: &mut dyn CompletionHandler) {
        if self.phase != Phase::Exited {
            self.phase = Phase::Exited;
            handler.on_exit(self.scenario);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ModuleId;
    use crate::scenario::library::ScenarioLibrary;

    #[derive(Default)]
    struct Recorder {
        completions: Vec<(String, Score)>,
        exits: usize,
    }

    impl CompletionHandler for Recorder {
        fn on_complete(&mut self, module: &Scenario, score: Score) {
            self.completions.push((module.id.to_string(), score));
        }

        fn on_exit(&mut self, _module: &Scenario) {
            self.exits += 1;
        }
    }

    fn protocols() -> Scenario {
        ScenarioLibrary::builtin()
            .unwrap()
            .get(&ModuleId::from("secure_protocols"))
            .cloned()
            .unwrap()
    }

    fn answer(run: &mut ModuleRun, question: &str, option: &str) {
        run.apply(&Action::SelectOption {
            field: question.into(),
            option: option.into(),
        })
        .unwrap();
    }

    fn answer_all(run: &mut ModuleRun) {
        answer(run, "q1", "SSH");
        answer(run, "q2", "SFTP");
        answer(run, "q3", "HTTPS");
        answer(run, "q4", "SNMPv3");
    }

    #[test]
    fn test_phases_progress() {
        let scenario = protocols();
        let mut run = ModuleRun::new(&scenario);
        let mut recorder = Recorder::default();
        assert_eq!(run.phase(), Phase::Unanswered);

        answer(&mut run, "q1", "RDP");
        assert_eq!(run.phase(), Phase::InProgress);

        let verdict = run.submit(&mut recorder).unwrap();
        assert!(!verdict.passed);
        assert_eq!(run.phase(), Phase::Submitted { passed: false });
        assert!(recorder.completions.is_empty());
    }

    #[test]
    fn test_failed_submission_can_be_edited_and_resubmitted() {
        let scenario = protocols();
        let mut run = ModuleRun::new(&scenario);
        let mut recorder = Recorder::default();

        answer(&mut run, "q1", "RDP");
        run.submit(&mut recorder).unwrap();
        answer_all(&mut run);
        let verdict = run.submit(&mut recorder).unwrap();

        assert!(verdict.passed);
        assert_eq!(verdict.score, 100);
        assert_eq!(recorder.completions, vec![("secure_protocols".to_string(), 100)]);
    }

    #[test]
    fn test_passed_run_is_locked() {
        let scenario = protocols();
        let mut run = ModuleRun::new(&scenario);
        let mut recorder = Recorder::default();

        answer_all(&mut run);
        run.submit(&mut recorder).unwrap();

        let edit = Action::SelectOption {
            field: "q1".into(),
            option: "VNC".into(),
        };
        assert_eq!(run.apply(&edit), Err(Rejection::Locked));
        assert_eq!(run.reset(), Err(Rejection::Locked));
        assert!(run.submit(&mut recorder).is_err());
        assert_eq!(recorder.completions.len(), 1);

        run.exit(&mut recorder);
        run.exit(&mut recorder);
        assert_eq!(run.phase(), Phase::Exited);
        assert_eq!(recorder.exits, 1);
    }

    #[test]
    fn test_reset_restores_initial_selection() {
        let scenario = protocols();
        let mut run = ModuleRun::new(&scenario);
        let mut recorder = Recorder::default();

        answer(&mut run, "q1", "FTP");
        run.submit(&mut recorder).unwrap();
        run.reset().unwrap();

        assert_eq!(run.phase(), Phase::Unanswered);
        assert!(run.last_verdict().is_none());
        assert_eq!(run.selection(), &Selection::initial(&scenario));
    }

    #[test]
    fn test_rejected_action_keeps_state() {
        let scenario = protocols();
        let mut run = ModuleRun::new(&scenario);
        let before = run.selection().clone();

        let result = run.apply(&Action::SelectOption {
            field: "q9".into(),
            option: "SSH".into(),
        });
        assert!(result.is_err());
        assert_eq!(run.selection(), &before);
        assert_eq!(run.phase(), Phase::Unanswered);
    }
}
