//! Headless Content Check
//!
//! Loads every piece of built-in content, verifies the catalog and the
//! scenario library agree, and prints a JSON report. Exits non-zero when
//! any problem is found.

use clap::Parser;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use pbq_labs::core::error::PbqError;
use pbq_labs::core::types::Difficulty;
use pbq_labs::host::{Catalog, QuickReference};
use pbq_labs::quiz::QuestionBank;
use pbq_labs::scenario::{parse_directory, ScenarioLibrary, ScoringPolicy};

/// Validate built-in PBQ content and report as JSON
#[derive(Parser, Debug)]
#[command(name = "content_check")]
#[command(about = "Validate catalog, scenarios, and quiz bank")]
struct Args {
    /// Also load every *.toml scenario in this directory
    #[arg(long)]
    scenarios: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct ScenarioSummary {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    variant_of: Option<String>,
    rules: usize,
    scoring: &'static str,
    pass_threshold: u8,
}

#[derive(Serialize, Default)]
struct Report {
    ok: bool,
    modules: usize,
    modules_per_tier: BTreeMap<String, usize>,
    authored: Vec<ScenarioSummary>,
    under_construction: Vec<String>,
    questions: usize,
    questions_per_domain: BTreeMap<String, usize>,
    reference_tools: usize,
    problems: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pbq_labs=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let report = check(&args);

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    match json {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("failed to serialize report: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if report.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn check(args: &Args) -> Report {
    let mut report = Report::default();

    let catalog = match Catalog::builtin() {
        Ok(catalog) => Some(catalog),
        Err(e) => {
            report.problems.extend(describe(e));
            None
        }
    };

    let mut library = match ScenarioLibrary::builtin() {
        Ok(library) => Some(library),
        Err(e) => {
            report.problems.extend(describe(e));
            None
        }
    };

    if let (Some(dir), Some(library)) = (&args.scenarios, library.as_mut()) {
        match parse_directory(dir) {
            Ok(extra) => {
                for (name, scenario) in extra {
                    if let Err(e) = library.insert(&name, scenario) {
                        report.problems.extend(describe(e));
                    }
                }
                if let Err(e) = library.check_variants() {
                    report.problems.extend(describe(e));
                }
            }
            Err(e) => report.problems.extend(describe(e)),
        }
    }

    match QuestionBank::builtin() {
        Ok(bank) => {
            report.questions = bank.len();
            for question in bank.questions() {
                *report
                    .questions_per_domain
                    .entry(question.domain.clone())
                    .or_default() += 1;
            }
        }
        Err(e) => report.problems.extend(describe(e)),
    }

    match QuickReference::builtin() {
        Ok(reference) => {
            report.reference_tools = reference.sections().iter().map(|s| s.tools.len()).sum();
        }
        Err(e) => report.problems.extend(describe(e)),
    }

    if let Some(library) = &library {
        for scenario in library.iter() {
            let (scoring, pass_threshold) = match &scenario.scoring {
                ScoringPolicy::AllOrNothing => ("all_or_nothing", 100),
                ScoringPolicy::Weighted { pass_threshold, .. } => ("weighted", *pass_threshold),
            };
            report.authored.push(ScenarioSummary {
                id: scenario.id.to_string(),
                variant_of: scenario.variant_of.as_ref().map(|id| id.to_string()),
                rules: scenario.effective_rules().len(),
                scoring,
                pass_threshold,
            });
        }
    }

    if let Some(catalog) = &catalog {
        report.modules = catalog.len();
        for tier in Difficulty::ALL {
            let count = catalog
                .modules()
                .iter()
                .filter(|m| m.difficulty == tier)
                .count();
            report.modules_per_tier.insert(tier.to_string(), count);
        }

        if let Some(library) = &library {
            for module in catalog.modules() {
                if !library.contains(&module.id) {
                    report.under_construction.push(module.id.to_string());
                }
            }
            for scenario in library.iter() {
                if !catalog.contains(scenario.module_id()) {
                    report.problems.push(format!(
                        "scenario '{}' has no catalog entry '{}'",
                        scenario.id,
                        scenario.module_id()
                    ));
                }
            }
        }
    }

    report.ok = report.problems.is_empty();
    report
}

fn describe(error: PbqError) -> Vec<String> {
    match error {
        PbqError::InvalidContent {
            source_name,
            problems,
        } => problems
            .into_iter()
            .map(|p| format!("{}: {}", source_name, p))
            .collect(),
        other => vec![other.to_string()],
    }
}
