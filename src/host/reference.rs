//! Command quick-reference sheets
//!
//! Sections group tools by task. A lookup that names no section searches
//! every tool and its commands instead.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::core::error::{PbqError, Result};

const BUILTIN_REFERENCE: &str = include_str!("../../data/reference.toml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandExample {
    pub cmd: String,
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolReference {
    pub name: String,
    #[serde(default)]
    pub platforms: Vec<String>,
    pub description: String,
    pub commands: Vec<CommandExample>,
}

impl ToolReference {
    /// Case-insensitive match against the name, description, or any command
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        let hit = |text: &str| text.to_lowercase().contains(&term);
        hit(&self.name)
            || hit(&self.description)
            || self.commands.iter().any(|c| hit(&c.cmd) || hit(&c.desc))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSection {
    pub id: String,
    pub label: String,
    pub tools: Vec<ToolReference>,
}

#[derive(Deserialize)]
struct ReferenceFile {
    sections: Vec<ReferenceSection>,
}

/// What a reference lookup resolved to
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<'a> {
    Section(&'a ReferenceSection),
    /// Tools matching a search term, with the section each belongs to
    Matches(Vec<(&'a ReferenceSection, &'a ToolReference)>),
}

#[derive(Debug, Clone, Default)]
pub struct QuickReference {
    sections: Vec<ReferenceSection>,
}

impl QuickReference {
    pub fn builtin() -> Result<Self> {
        Self::parse("reference.toml", BUILTIN_REFERENCE)
    }

    pub fn parse(source_name: &str, content: &str) -> Result<Self> {
        let file: ReferenceFile = toml::from_str(content).map_err(|e| {
            PbqError::invalid_content(source_name, vec![format!("parse error: {}", e)])
        })?;

        let mut problems = Vec::new();
        let mut ids = HashSet::new();
        for section in &file.sections {
            if !ids.insert(section.id.as_str()) {
                problems.push(format!("duplicate section id '{}'", section.id));
            }
            for tool in section.tools.iter().filter(|t| t.commands.is_empty()) {
                problems.push(format!("tool '{}' lists no commands", tool.name));
            }
        }
        if !problems.is_empty() {
            return Err(PbqError::invalid_content(source_name, problems));
        }

        Ok(Self {
            sections: file.sections,
        })
    }

    pub fn sections(&self) -> &[ReferenceSection] {
        &self.sections
    }

    /// Section by id or label, ignoring case and spaces
    pub fn section(&self, key: &str) -> Option<&ReferenceSection> {
        let key = squash(key);
        self.sections
            .iter()
            .find(|s| squash(&s.id) == key || squash(&s.label) == key)
    }

    pub fn search(&self, term: &str) -> Vec<(&ReferenceSection, &ToolReference)> {
        self.sections
            .iter()
            .flat_map(|section| section.tools.iter().map(move |tool| (section, tool)))
            .filter(|(_, tool)| tool.matches(term))
            .collect()
    }

    /// Resolve a section name first, falling back to a search
    pub fn lookup(&self, query: &str) -> Lookup<'_> {
        match self.section(query) {
            Some(section) => Lookup::Section(section),
            None => Lookup::Matches(self.search(query)),
        }
    }
}

fn squash(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_reference() {
        let reference = QuickReference::builtin().unwrap();
        let ids: Vec<&str> = reference.sections().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "networktools",
                "systemadmin",
                "securitytools",
                "loganalysis",
                "filepermissions",
                "processmanagement",
            ]
        );
        assert!(reference.sections().iter().all(|s| !s.tools.is_empty()));
    }

    #[test]
    fn test_section_by_label_or_id() {
        let reference = QuickReference::builtin().unwrap();
        assert_eq!(
            reference.section("Log Analysis").map(|s| s.id.as_str()),
            Some("loganalysis")
        );
        assert_eq!(
            reference.section("NETWORKTOOLS").map(|s| s.label.as_str()),
            Some("Network Tools")
        );
        assert!(reference.section("gardening").is_none());
    }

    #[test]
    fn test_search_covers_commands() {
        let reference = QuickReference::builtin().unwrap();

        let Lookup::Matches(hits) = reference.lookup("flushdns") else {
            panic!("expected a search");
        };
        let names: Vec<&str> = hits.iter().map(|(_, tool)| tool.name.as_str()).collect();
        assert_eq!(names, vec!["ipconfig"]);
        assert_eq!(hits[0].0.id, "systemadmin");

        let Lookup::Matches(none) = reference.lookup("zzz-not-a-tool") else {
            panic!("expected a search");
        };
        assert!(none.is_empty());

        assert!(matches!(
            reference.lookup("file & permissions"),
            Lookup::Section(section) if section.id == "filepermissions"
        ));
    }

    #[test]
    fn test_tool_without_commands_rejected() {
        let content = r#"
[[sections]]
id = "empty"
label = "Empty"

[[sections.tools]]
name = "nothing"
description = "No examples"
commands = []
"#;
        let err = QuickReference::parse("bad.toml", content).unwrap_err();
        assert!(err.to_string().contains("lists no commands"));
    }
}
