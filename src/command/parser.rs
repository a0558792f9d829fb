//! Parse typed command lines into structured commands
//!
//! Tokens are split on whitespace; double quotes group words, so a principal
//! such as `"Authenticated Users"` stays one token. Actions on an open lab
//! map one-to-one onto [`Action`]; `json {...}` accepts any action verbatim.

use thiserror::Error;

use crate::core::types::{DifficultyFilter, ModuleId};
use crate::quiz::sampler::QuizMode;
use crate::scenario::model::{EntryKind, TrafficAction, TrafficRule};
use crate::scenario::permissions::Permission;
use crate::simulation::controller::Action;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unterminated quote")]
    UnterminatedQuote,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("{0}")]
    InvalidArgument(String),
}

/// Everything the interactive host understands
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Quit,
    Login(String),
    Logout,
    /// Catalog listing under the current filter
    List,
    Filter(DifficultyFilter),
    Stats,
    Open(ModuleId),
    Domains,
    /// Quick-reference sheet; no topic lists the sections
    Reference(Option<String>),
    Quiz(QuizMode),
    /// Answer the current quiz question, 1-based
    Answer(usize),
    Next,
    Show,
    Submit,
    Reset,
    /// List a lab's cases, or switch to the given one (1-based)
    Variant(Option<usize>),
    Exit,
    Act(Action),
}

pub const HELP: &str = "\
Home:
  login <name> | logout | list | filter <all|foundational|intermediate|advanced>
  stats | open <module> | domains | quiz [random | domain <label> | review] | quit
  reference [section | tool]
Lab:
  show | submit | reset | variant [n] | exit
  select <field> <option>     cycle <field>          text <field> <text>
  number <field> <value>      flag <field> <on|off>  toggle <checklist> <item>
  assign <slot> <item>        clear <slot>           unset <field>
  perm <entity> <principal> <permission>     kind <entity> <principal> <allow|deny>
  add-principal <entity> <principal>         remove-principal <entity> <principal>
  add-rule <table> <allow|deny> <source> <destination> <port> [protocol] [log]
  remove-rule <table> <position>             json <action object>
Quiz:
  answer <n> | next | exit";

/// Split a line into tokens, honoring double quotes
pub fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut pending = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                pending = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if pending {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }

    if in_quotes {
        return Err(ParseError::UnterminatedQuote);
    }
    if pending {
        tokens.push(current);
    }
    Ok(tokens)
}

pub fn parse_line(line: &str) -> Result<Command, ParseError> {
    let trimmed = line.trim();
    if let Some(raw) = trimmed.strip_prefix("json ") {
        let action = serde_json::from_str(raw.trim())
            .map_err(|e| ParseError::InvalidArgument(format!("bad action JSON: {}", e)))?;
        return Ok(Command::Act(action));
    }

    let tokens = tokenize(trimmed)?;
    let Some((verb, args)) = tokens.split_first() else {
        return Err(ParseError::Empty);
    };

    let command = match verb.to_lowercase().as_str() {
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" => Command::Quit,
        "login" => Command::Login(rest(args, "login <name>")?),
        "logout" => Command::Logout,
        "list" | "ls" => Command::List,
        "filter" => {
            let [tier]: &[String; 1] =
                exact(args, "filter <all|foundational|intermediate|advanced>")?;
            Command::Filter(tier.parse().map_err(ParseError::InvalidArgument)?)
        }
        "stats" | "dashboard" => Command::Stats,
        "open" => {
            let [id]: &[String; 1] = exact(args, "open <module>")?;
            Command::Open(ModuleId::new(id.as_str()))
        }
        "domains" => Command::Domains,
        "reference" | "ref" => {
            Command::Reference((!args.is_empty()).then(|| args.join(" ")))
        }
        "quiz" => Command::Quiz(parse_quiz_mode(args)?),
        "answer" | "a" => {
            let [n]: &[String; 1] = exact(args, "answer <n>")?;
            let n: usize = parse_number(n)?;
            if n == 0 {
                return Err(ParseError::InvalidArgument("answers are numbered from 1".into()));
            }
            Command::Answer(n)
        }
        "next" | "n" => Command::Next,
        "show" | "s" => Command::Show,
        "submit" => Command::Submit,
        "reset" => Command::Reset,
        "variant" | "case" => match args {
            [] => Command::Variant(None),
            [n] => {
                let n: usize = parse_number(n)?;
                if n == 0 {
                    return Err(ParseError::InvalidArgument("cases are numbered from 1".into()));
                }
                Command::Variant(Some(n))
            }
            _ => return Err(ParseError::Usage("variant [n]")),
        },
        "exit" | "back" => Command::Exit,
        other => Command::Act(parse_action(other, args)?),
    };

    Ok(command)
}

fn parse_quiz_mode(args: &[String]) -> Result<QuizMode, ParseError> {
    match args.split_first() {
        None => Ok(QuizMode::Random),
        Some((mode, rest_args)) => match mode.to_lowercase().as_str() {
            "random" if rest_args.is_empty() => Ok(QuizMode::Random),
            "review" if rest_args.is_empty() => Ok(QuizMode::Review),
            "domain" => Ok(QuizMode::Domain(rest(rest_args, "quiz domain <label>")?)),
            _ => Err(ParseError::Usage("quiz [random | domain <label> | review]")),
        },
    }
}

fn parse_action(verb: &str, args: &[String]) -> Result<Action, ParseError> {
    let action = match verb {
        "select" => {
            let (field, option) = head_rest(args, "select <field> <option>")?;
            Action::SelectOption { field, option }
        }
        "cycle" => {
            let [field]: &[String; 1] = exact(args, "cycle <field>")?;
            Action::CycleOption { field: field.clone() }
        }
        "text" => {
            let field = args.first().ok_or(ParseError::Usage("text <field> <text>"))?;
            Action::EnterText {
                field: field.clone(),
                text: args[1..].join(" "),
            }
        }
        "number" => {
            let [field, value]: &[String; 2] = exact(args, "number <field> <value>")?;
            Action::EnterNumber {
                field: field.clone(),
                value: parse_number(value)?,
            }
        }
        "flag" => {
            let [field, value]: &[String; 2] = exact(args, "flag <field> <on|off>")?;
            Action::SetFlag {
                field: field.clone(),
                value: parse_flag(value)?,
            }
        }
        "toggle" => {
            let (set, item) = head_rest(args, "toggle <checklist> <item>")?;
            Action::ToggleMembership { set, item }
        }
        "assign" => {
            let [slot, item]: &[String; 2] = exact(args, "assign <slot> <item>")?;
            Action::AssignToSlot {
                slot: slot.clone(),
                item: item.clone(),
            }
        }
        "clear" => {
            let [slot]: &[String; 1] = exact(args, "clear <slot>")?;
            Action::ClearSlot { slot: slot.clone() }
        }
        "unset" => {
            let [field]: &[String; 1] = exact(args, "unset <field>")?;
            Action::ClearAnswer { field: field.clone() }
        }
        "perm" => {
            let [entity, principal, permission]: &[String; 3] =
                exact(args, "perm <entity> <principal> <permission>")?;
            Action::TogglePermission {
                entity: entity.clone(),
                principal: principal.clone(),
                permission: permission
                    .parse::<Permission>()
                    .map_err(ParseError::InvalidArgument)?,
            }
        }
        "kind" => {
            let [entity, principal, kind]: &[String; 3] =
                exact(args, "kind <entity> <principal> <allow|deny>")?;
            let kind = match kind.to_lowercase().as_str() {
                "allow" => EntryKind::Allow,
                "deny" => EntryKind::Deny,
                other => {
                    return Err(ParseError::InvalidArgument(format!(
                        "entry kind must be allow or deny, not '{}'",
                        other
                    )))
                }
            };
            Action::SetEntryKind {
                entity: entity.clone(),
                principal: principal.clone(),
                kind,
            }
        }
        "add-principal" => {
            let [entity, principal]: &[String; 2] =
                exact(args, "add-principal <entity> <principal>")?;
            Action::AddPrincipal {
                entity: entity.clone(),
                principal: principal.clone(),
            }
        }
        "remove-principal" => {
            let [entity, principal]: &[String; 2] =
                exact(args, "remove-principal <entity> <principal>")?;
            Action::RemovePrincipal {
                entity: entity.clone(),
                principal: principal.clone(),
            }
        }
        "add-rule" => parse_add_rule(args)?,
        "remove-rule" => {
            let [table, position]: &[String; 2] = exact(args, "remove-rule <table> <position>")?;
            let position: usize = parse_number(position)?;
            if position == 0 {
                return Err(ParseError::InvalidArgument("rules are numbered from 1".into()));
            }
            Action::RemoveRule {
                table: table.clone(),
                index: position - 1,
            }
        }
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(action)
}

fn parse_add_rule(args: &[String]) -> Result<Action, ParseError> {
    const USAGE: &str =
        "add-rule <table> <allow|deny> <source> <destination> <port> [protocol] [log]";
    if !(5..=7).contains(&args.len()) {
        return Err(ParseError::Usage(USAGE));
    }

    let action = match args[1].to_lowercase().as_str() {
        "allow" => TrafficAction::Allow,
        "deny" => TrafficAction::Deny,
        _ => return Err(ParseError::Usage(USAGE)),
    };

    let mut protocol = "TCP".to_string();
    let mut log = false;
    for extra in &args[5..] {
        if extra.eq_ignore_ascii_case("log") {
            log = true;
        } else {
            protocol = extra.to_uppercase();
        }
    }

    Ok(Action::AddRule {
        table: args[0].clone(),
        rule: TrafficRule {
            action,
            source: args[2].clone(),
            destination: args[3].clone(),
            port: args[4].clone(),
            protocol,
            log,
        },
    })
}

fn exact<'a, const N: usize>(
    args: &'a [String],
    usage: &'static str,
) -> Result<&'a [String; N], ParseError> {
    args.try_into().map_err(|_| ParseError::Usage(usage))
}

/// All remaining tokens joined by single spaces
fn rest(args: &[String], usage: &'static str) -> Result<String, ParseError> {
    if args.is_empty() {
        return Err(ParseError::Usage(usage));
    }
    Ok(args.join(" "))
}

/// First token, then the rest of the line as one value
fn head_rest(args: &[String], usage: &'static str) -> Result<(String, String), ParseError> {
    match args.split_first() {
        Some((head, tail)) if !tail.is_empty() => Ok((head.clone(), tail.join(" "))),
        _ => Err(ParseError::Usage(usage)),
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str) -> Result<T, ParseError> {
    raw.replace(['$', ','], "")
        .parse()
        .map_err(|_| ParseError::InvalidArgument(format!("'{}' is not a number", raw)))
}

fn parse_flag(raw: &str) -> Result<bool, ParseError> {
    match raw.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(ParseError::InvalidArgument(format!("'{}' is not on or off", raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_quotes() {
        assert_eq!(
            tokenize(r#"perm hr "Authenticated Users" read"#).unwrap(),
            vec!["perm", "hr", "Authenticated Users", "read"]
        );
        assert_eq!(tokenize(r#"text ssid """#).unwrap(), vec!["text", "ssid", ""]);
        assert_eq!(tokenize(r#"login "ana"#), Err(ParseError::UnterminatedQuote));
    }

    #[test]
    fn test_home_commands() {
        assert_eq!(parse_line("  q "), Ok(Command::Quit));
        assert_eq!(parse_line("login Ana Lee"), Ok(Command::Login("Ana Lee".into())));
        assert_eq!(
            parse_line("filter Advanced"),
            Ok(Command::Filter(DifficultyFilter::Only(
                crate::core::types::Difficulty::Advanced
            )))
        );
        assert_eq!(parse_line("open risk"), Ok(Command::Open(ModuleId::from("risk"))));
        assert_eq!(
            parse_line("quiz domain 2.0 Threats, Vulnerabilities, and Mitigations"),
            Ok(Command::Quiz(QuizMode::Domain(
                "2.0 Threats, Vulnerabilities, and Mitigations".into()
            )))
        );
        assert_eq!(parse_line("quiz"), Ok(Command::Quiz(QuizMode::Random)));
        assert_eq!(parse_line(""), Err(ParseError::Empty));
    }

    #[test]
    fn test_reference_and_variant_commands() {
        assert_eq!(parse_line("reference"), Ok(Command::Reference(None)));
        assert_eq!(
            parse_line("ref log analysis"),
            Ok(Command::Reference(Some("log analysis".into())))
        );
        assert_eq!(parse_line("variant"), Ok(Command::Variant(None)));
        assert_eq!(parse_line("variant 2"), Ok(Command::Variant(Some(2))));
        assert!(matches!(parse_line("variant 0"), Err(ParseError::InvalidArgument(_))));
        assert_eq!(parse_line("variant 1 2"), Err(ParseError::Usage("variant [n]")));
    }

    #[test]
    fn test_lab_actions() {
        assert_eq!(
            parse_line("select security_mode WPA3-Enterprise (802.1X)"),
            Ok(Command::Act(Action::SelectOption {
                field: "security_mode".into(),
                option: "WPA3-Enterprise (802.1X)".into(),
            }))
        );
        assert_eq!(
            parse_line("number sle $200,000"),
            Ok(Command::Act(Action::EnterNumber {
                field: "sle".into(),
                value: 200000.0,
            }))
        );
        assert_eq!(
            parse_line("perm hr HR_Staff modify"),
            Ok(Command::Act(Action::TogglePermission {
                entity: "hr".into(),
                principal: "HR_Staff".into(),
                permission: Permission::Modify,
            }))
        );
        assert_eq!(
            parse_line("remove-rule perimeter 1"),
            Ok(Command::Act(Action::RemoveRule {
                table: "perimeter".into(),
                index: 0,
            }))
        );
    }

    #[test]
    fn test_unset_clears_an_answer() {
        assert_eq!(
            parse_line("unset q2"),
            Ok(Command::Act(Action::ClearAnswer { field: "q2".into() }))
        );
        assert_eq!(parse_line("unset"), Err(ParseError::Usage("unset <field>")));
    }

    #[test]
    fn test_add_rule_defaults() {
        let Ok(Command::Act(Action::AddRule { table, rule })) =
            parse_line("add-rule perimeter allow any 10.0.0.5 443 log")
        else {
            panic!("expected an add-rule action");
        };
        assert_eq!(table, "perimeter");
        assert_eq!(rule.protocol, "TCP");
        assert!(rule.log);
        assert_eq!(rule.action, TrafficAction::Allow);
    }

    #[test]
    fn test_json_action() {
        let command = parse_line(r#"json {"action":"clear_slot","slot":"slot_edge"}"#).unwrap();
        assert_eq!(
            command,
            Command::Act(Action::ClearSlot {
                slot: "slot_edge".into()
            })
        );
    }

    #[test]
    fn test_usage_errors() {
        assert_eq!(parse_line("assign slot_edge"), Err(ParseError::Usage("assign <slot> <item>")));
        assert!(matches!(parse_line("answer 0"), Err(ParseError::InvalidArgument(_))));
        assert!(matches!(parse_line("perm hr HR_Staff fly"), Err(ParseError::InvalidArgument(_))));
        assert_eq!(
            parse_line("dance"),
            Err(ParseError::UnknownCommand("dance".into()))
        );
    }
}
