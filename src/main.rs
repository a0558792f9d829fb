//! PBQ Labs - Entry Point
//!
//! Interactive terminal host: pick a module from the catalog, work the lab
//! with typed actions, submit for grading, or sit a practice quiz.

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pbq_labs::command::{parse_line, Command, HELP};
use pbq_labs::core::config::{config, set_config, LabConfig};
use pbq_labs::core::error::Result;
use pbq_labs::host::{FileStore, LabHost, Lookup, ModuleView, QuickReference};
use pbq_labs::quiz::{format_elapsed, QuizAttempt};
use pbq_labs::scenario::model::{FieldKind, Scenario};
use pbq_labs::simulation::{ModuleRun, Selection};

/// Security+ PBQ labs and practice quizzes
#[derive(Parser, Debug)]
#[command(name = "pbq-labs")]
#[command(about = "Interactive Security+ performance-based question labs")]
struct Args {
    /// Directory holding persisted progress (defaults to the configured store_dir)
    #[arg(long)]
    store: Option<PathBuf>,

    /// TOML file overriding configuration defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for quiz sampling and item shuffling
    #[arg(long)]
    seed: Option<u64>,

    /// Log in as this user on startup
    #[arg(long)]
    user: Option<String>,
}

type Host = LabHost<FileStore>;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pbq_labs=info")),
        )
        .init();

    let args = Args::parse();

    if let Some(path) = &args.config {
        let loaded = LabConfig::load(path)?;
        if set_config(loaded).is_err() {
            tracing::warn!("Configuration already initialised, ignoring --config");
        }
    }

    let store_dir = args.store.clone().unwrap_or_else(|| config().store_dir.clone());
    let mut host = LabHost::with_builtin_content(FileStore::open(&store_dir)?)?;
    let reference = QuickReference::builtin()?;
    if let Some(user) = &args.user {
        host.login(user)?;
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    tracing::info!(seed, store = %store_dir.display(), "PBQ Labs starting");

    println!("\n=== PBQ LABS ===");
    println!("Security+ performance-based question simulations");
    println!("Type 'help' for commands.\n");

    loop {
        let prompt = match host.current_user() {
            Some(user) => format!("{}@home> ", user),
            None => "home> ".to_string(),
        };
        let Some(line) = read_line(&prompt)? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => println!("{}", HELP),
            Command::Login(name) => match host.login(&name) {
                Ok(()) => println!("Welcome, {}.", name.trim()),
                Err(e) => println!("{}", e),
            },
            Command::Logout => {
                host.logout()?;
                println!("Logged out.");
            }
            Command::List => display_catalog(&host),
            Command::Filter(filter) => {
                host.set_filter(filter)?;
                display_catalog(&host);
            }
            Command::Stats => display_dashboard(&host),
            Command::Domains => {
                for domain in host.bank().domains() {
                    println!("  {}", domain);
                }
            }
            Command::Reference(query) => display_reference(&reference, query.as_deref()),
            Command::Open(id) => match host.open(&id) {
                ModuleView::Lab(scenario) => {
                    if play_module(&mut host, scenario, &mut rng)? {
                        break;
                    }
                }
                ModuleView::UnderConstruction(id) => {
                    let title = host
                        .catalog()
                        .get(&id)
                        .map(|m| m.title.as_str())
                        .unwrap_or(id.as_str());
                    println!("{} is under construction. Check back soon.", title);
                }
            },
            Command::Quiz(mode) => {
                let attempt = host.start_quiz(&mode, &mut rng);
                if attempt.is_empty() {
                    println!("No questions available for that quiz.");
                } else if run_quiz(&mut host, attempt)? {
                    break;
                }
            }
            _ => println!("That command only works inside a lab or quiz."),
        }
    }

    println!("\nGoodbye.");
    Ok(())
}

/// Prompt and read one line; `None` at end of input
fn read_line(prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input))
}

/// How a lab session ended
enum LabExit {
    Quit,
    Back,
    Switch(Scenario),
}

/// Work a module's labs, following case switches; returns true on quit
fn play_module(host: &mut Host, first: Scenario, rng: &mut StdRng) -> Result<bool> {
    let cases = host.variants(first.module_id());
    let mut scenario = first;
    loop {
        match run_lab(host, &scenario, &cases, rng)? {
            LabExit::Quit => return Ok(true),
            LabExit::Back => return Ok(false),
            LabExit::Switch(next) => scenario = next,
        }
    }
}

/// Work one lab until exit or a switch to another case of the module
fn run_lab(
    host: &mut Host,
    scenario: &Scenario,
    cases: &[Scenario],
    rng: &mut StdRng,
) -> Result<LabExit> {
    let mut run = ModuleRun::new(scenario);
    let inventory_order: Vec<String> = scenario
        .shuffled_inventory(rng)
        .into_iter()
        .map(|item| item.id.clone())
        .collect();

    println!("\n=== {} ===", scenario.title);
    println!("{}\n", scenario.scenario_text);
    println!("Objective: {}\n", scenario.objective_text);
    if cases.len() > 1 {
        println!("This module has {} cases; 'variant' lists them.\n", cases.len());
    }
    display_selection(scenario, run.selection(), &inventory_order);

    let prompt = format!("{}> ", scenario.id);
    let exit = loop {
        let Some(line) = read_line(&prompt)? else {
            break LabExit::Quit;
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line) {
            Ok(Command::Quit) => break LabExit::Quit,
            Ok(Command::Exit) => break LabExit::Back,
            Ok(Command::Variant(None)) => {
                for (i, case) in cases.iter().enumerate() {
                    let marker = if case.id == scenario.id { "*" } else { " " };
                    println!("  {}{}. {}", marker, i + 1, case.title);
                }
            }
            Ok(Command::Variant(Some(n))) => match cases.get(n - 1) {
                Some(case) if case.id == scenario.id => println!("Already working that case."),
                Some(case) => break LabExit::Switch(case.clone()),
                None => println!("This module has {} case(s).", cases.len()),
            },
            Ok(Command::Help) => println!("{}", HELP),
            Ok(Command::Show) => display_selection(scenario, run.selection(), &inventory_order),
            Ok(Command::Act(action)) => match run.apply(&action) {
                Ok(()) => println!("OK"),
                Err(rejection) => println!("Not allowed: {}", rejection),
            },
            Ok(Command::Reset) => match run.reset() {
                Ok(()) => println!("Lab reset to its starting state."),
                Err(rejection) => println!("Not allowed: {}", rejection),
            },
            Ok(Command::Submit) => match run.submit(host) {
                Ok(verdict) if verdict.passed => {
                    println!("PASSED with a score of {}%.", verdict.score);
                    println!("{}", scenario.success_text);
                    println!("Type 'exit' to return to the catalog.");
                }
                Ok(verdict) => {
                    println!("Not yet. Score: {}%", verdict.score);
                    for line in verdict.feedback_lines(config().feedback_limit) {
                        println!("  - {}", line);
                    }
                }
                Err(rejection) => println!("Not allowed: {}", rejection),
            },
            Ok(_) => println!("Leave the lab first ('exit')."),
            Err(e) => println!("{}", e),
        }
    };

    run.exit(host);
    Ok(exit)
}

/// Sit one quiz until it ends; returns true when the user quit entirely
fn run_quiz(host: &mut Host, mut attempt: QuizAttempt) -> Result<bool> {
    println!("\n=== Practice Quiz ({} questions) ===", attempt.len());
    display_question(&attempt);

    let quit = loop {
        if attempt.is_finished() {
            break false;
        }
        let prompt = format!("quiz {}/{}> ", attempt.position() + 1, attempt.len());
        let Some(line) = read_line(&prompt)? else {
            break true;
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line) {
            Ok(Command::Quit) => break true,
            Ok(Command::Exit) => break false,
            Ok(Command::Help) => println!("{}", HELP),
            Ok(Command::Show) => display_question(&attempt),
            Ok(Command::Answer(n)) => match attempt.answer(n - 1) {
                Ok(correct) => {
                    if let Some(question) = attempt.current() {
                        if correct {
                            println!("Correct.");
                        } else {
                            println!(
                                "Incorrect. Answer: {}",
                                question.correct_option().unwrap_or("?")
                            );
                        }
                        println!("{}", question.explanation);
                    }
                }
                Err(e) => println!("{}", e),
            },
            Ok(Command::Next) => match attempt.advance() {
                Ok(()) if attempt.is_finished() => {}
                Ok(()) => display_question(&attempt),
                Err(e) => println!("{}", e),
            },
            Ok(_) => println!("Finish or 'exit' the quiz first."),
            Err(e) => println!("{}", e),
        }
    };

    host.record_quiz(&attempt.results())?;
    println!(
        "\nQuiz over: {}/{} correct ({}%) in {}",
        attempt.correct_count(),
        attempt.len(),
        attempt.percentage(),
        format_elapsed(attempt.elapsed())
    );
    for (question, answer, _) in attempt.review(true) {
        let given = answer
            .and_then(|a| question.options.get(a))
            .map(String::as_str)
            .unwrap_or("(no answer)");
        println!("  #{} {}", question.id, question.question);
        println!(
            "     yours: {} | correct: {}",
            given,
            question.correct_option().unwrap_or("?")
        );
    }
    Ok(quit)
}

fn display_reference(reference: &QuickReference, query: Option<&str>) {
    let Some(query) = query else {
        println!();
        for section in reference.sections() {
            println!("  {:<18} {} ({} tools)", section.id, section.label, section.tools.len());
        }
        println!();
        return;
    };

    let hits: Vec<_> = match reference.lookup(query) {
        Lookup::Section(section) => section.tools.iter().map(|tool| (section, tool)).collect(),
        Lookup::Matches(hits) => hits,
    };
    if hits.is_empty() {
        println!("Nothing in the reference matches '{}'.", query);
        return;
    }
    for (section, tool) in hits {
        println!();
        println!(
            "  {} [{}] ({})",
            tool.name,
            section.label,
            tool.platforms.join(", ")
        );
        println!("    {}", tool.description);
        for example in &tool.commands {
            println!("    $ {:<44} {}", example.cmd, example.desc);
        }
    }
    println!();
}

fn display_catalog(host: &Host) {
    let progress = host.progress();
    println!();
    println!("--- Modules ({}) ---", host.filter().as_str());
    for module in host.visible_modules() {
        let status = match progress.get(&module.id) {
            Some(score) => format!("[{:>3}%]", score),
            None if host.library().contains(&module.id) => "[    ]".to_string(),
            None => "[ -- ]".to_string(),
        };
        println!(
            "  {} {:<24} {:<13} {} - {}",
            status, module.id, module.difficulty, module.category, module.title
        );
    }
    println!();
}

fn display_dashboard(host: &Host) {
    let stats = host.dashboard();
    println!();
    match host.current_user() {
        Some(user) => println!("=== Dashboard: {} ===", user),
        None => println!("=== Dashboard (not logged in) ==="),
    }
    println!("  Clearance: {}", stats.clearance);
    println!(
        "  Completed: {}/{} ({}%)",
        stats.completed, stats.total, stats.completion_percent
    );
    println!("  Average score: {}%", stats.average_score);
    for tier in &stats.tiers {
        println!(
            "  {:<13} {}/{} ({}%)",
            tier.difficulty, tier.completed, tier.total, tier.percent
        );
    }
    println!("  Missed quiz questions: {}", host.missed().len());
    println!();
}

fn display_question(attempt: &QuizAttempt) {
    let Some(question) = attempt.current() else {
        return;
    };
    println!();
    println!("[{}] {}", question.domain, question.question);
    for (i, option) in question.options.iter().enumerate() {
        println!("  {}. {}", i + 1, option);
    }
}

/// Print the configurable surface with the learner's current values
fn display_selection(scenario: &Scenario, selection: &Selection, inventory_order: &[String]) {
    for field in &scenario.fields {
        let value = selection
            .field(&field.id)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "(unset)".to_string());
        match field.kind {
            FieldKind::Choice => {
                let options: Vec<&str> = field.options.iter().map(|o| o.value.as_str()).collect();
                println!(
                    "  {} [{}] = {}  options: {}",
                    field.label,
                    field.id,
                    value,
                    options.join(" | ")
                );
            }
            _ => println!("  {} [{}] = {}", field.label, field.id, value),
        }
    }

    for question in &scenario.questions {
        let answer = selection
            .field(&question.id)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "(unanswered)".to_string());
        let options: Vec<&str> = question.options.iter().map(|o| o.value.as_str()).collect();
        println!(
            "  [{}] {} = {}  options: {}",
            question.id,
            question.text,
            answer,
            options.join(" | ")
        );
    }

    if !scenario.slots.is_empty() {
        let unplaced: Vec<&str> = inventory_order
            .iter()
            .filter(|item| selection.slot_of(item).is_none())
            .map(String::as_str)
            .collect();
        println!("  Items: {}", unplaced.join(", "));
        for slot in &scenario.slots {
            println!(
                "  {} [{}] <- {}",
                slot.label,
                slot.id,
                selection.slot(&slot.id).unwrap_or("(empty)")
            );
        }
    }

    for checklist in &scenario.checklists {
        println!("  {} [{}]", checklist.label, checklist.id);
        for option in &checklist.options {
            let mark = if selection.set_contains(&checklist.id, option) {
                "x"
            } else {
                " "
            };
            println!("    [{}] {}", mark, option);
        }
    }

    for entity in &scenario.entities {
        println!("  {} ({}) [{}]", entity.name, entity.path, entity.id);
        if let Some(acl) = selection.acl(&entity.id) {
            for entry in acl.entries() {
                println!("    {:?} {}: {}", entry.kind, entry.principal, entry.permissions);
            }
        }
        if !scenario.principals.is_empty() {
            println!("    available: {}", scenario.principals.join(", "));
        }
    }

    for table in &scenario.tables {
        println!("  {} [{}]", table.label, table.id);
        for (i, rule) in selection.table(&table.id).iter().enumerate() {
            println!(
                "    {}. {:?} {} -> {} port {}/{}{}",
                i + 1,
                rule.action,
                rule.source,
                rule.destination,
                rule.port,
                rule.protocol,
                if rule.log { " log" } else { "" }
            );
        }
    }
    println!();
}
