//! Load scenario definitions from TOML
//!
//! The built-in scenarios are compiled into the binary; additional content
//! can be loaded from a directory of `*.toml` files.

use ahash::AHashMap;
use std::fs;
use std::path::Path;

use crate::core::error::{PbqError, Result};
use crate::core::types::ModuleId;
use crate::scenario::model::Scenario;

/// Scenarios shipped with the crate, keyed by file name
const BUILTIN: &[(&str, &str)] = &[
    (
        "password_policy.toml",
        include_str!("../../data/scenarios/password_policy.toml"),
    ),
    (
        "common_ports.toml",
        include_str!("../../data/scenarios/common_ports.toml"),
    ),
    (
        "basic_access_control.toml",
        include_str!("../../data/scenarios/basic_access_control.toml"),
    ),
    (
        "network_labeling.toml",
        include_str!("../../data/scenarios/network_labeling.toml"),
    ),
    (
        "basic_ir_steps.toml",
        include_str!("../../data/scenarios/basic_ir_steps.toml"),
    ),
    (
        "firewall.toml",
        include_str!("../../data/scenarios/firewall.toml"),
    ),
    ("risk.toml", include_str!("../../data/scenarios/risk.toml")),
    ("cloud.toml", include_str!("../../data/scenarios/cloud.toml")),
    ("access.toml", include_str!("../../data/scenarios/access.toml")),
    (
        "wireless_config.toml",
        include_str!("../../data/scenarios/wireless_config.toml"),
    ),
    (
        "crypto_basics.toml",
        include_str!("../../data/scenarios/crypto_basics.toml"),
    ),
    (
        "secure_protocols.toml",
        include_str!("../../data/scenarios/secure_protocols.toml"),
    ),
    ("siem.toml", include_str!("../../data/scenarios/siem.toml")),
    (
        "pki_certs.toml",
        include_str!("../../data/scenarios/pki_certs.toml"),
    ),
    (
        "multi_zone_firewall.toml",
        include_str!("../../data/scenarios/multi_zone_firewall.toml"),
    ),
    (
        "ddos_mitigation.toml",
        include_str!("../../data/scenarios/ddos_mitigation.toml"),
    ),
    (
        "forensic_investigation.toml",
        include_str!("../../data/scenarios/forensic_investigation.toml"),
    ),
    (
        "risk_ransomware.toml",
        include_str!("../../data/scenarios/risk_ransomware.toml"),
    ),
    (
        "ntfs_departments.toml",
        include_str!("../../data/scenarios/ntfs_departments.toml"),
    ),
];

/// Parse and validate a single scenario
pub fn parse_scenario(source_name: &str, content: &str) -> Result<Scenario> {
    let scenario: Scenario = toml::from_str(content).map_err(|e| {
        PbqError::invalid_content(source_name, vec![format!("parse error: {}", e)])
    })?;
    scenario
        .validate()
        .map_err(|problems| PbqError::invalid_content(source_name, problems))?;
    Ok(scenario)
}

/// Parse every `*.toml` file in a directory without cross-checking them
///
/// Returns `(source_name, scenario)` pairs in file-name order, so callers
/// can merge them into another library before checking variants.
pub fn parse_directory(dir: &Path) -> Result<Vec<(String, Scenario)>> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map_or(false, |ext| ext == "toml"))
        .collect();
    paths.sort();

    let mut parsed = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path.display().to_string();
        let content = fs::read_to_string(&path)?;
        let scenario = parse_scenario(&name, &content)?;
        parsed.push((name, scenario));
    }
    Ok(parsed)
}

/// Validated scenarios indexed by module id
#[derive(Debug, Clone, Default)]
pub struct ScenarioLibrary {
    scenarios: Vec<Scenario>,
    index: AHashMap<ModuleId, usize>,
}

impl ScenarioLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every scenario compiled into the crate
    pub fn builtin() -> Result<Self> {
        Self::from_sources(BUILTIN.iter().copied())
    }

    /// Build a library from `(source_name, toml)` pairs
    pub fn from_sources<'a, I>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut library = Self::new();
        for (name, content) in sources {
            library.insert(name, parse_scenario(name, content)?)?;
        }
        library.check_variants()?;
        Ok(library)
    }

    /// Load every `*.toml` file in a directory, in file-name order
    pub fn load_directory(dir: &Path) -> Result<Self> {
        let mut library = Self::new();
        for (name, scenario) in parse_directory(dir)? {
            library.insert(&name, scenario)?;
        }
        library.check_variants()?;
        Ok(library)
    }

    /// Add a scenario, rejecting duplicate ids
    pub fn insert(&mut self, source_name: &str, scenario: Scenario) -> Result<()> {
        if self.index.contains_key(&scenario.id) {
            return Err(PbqError::invalid_content(
                source_name,
                vec![format!("duplicate scenario id '{}'", scenario.id)],
            ));
        }
        self.index.insert(scenario.id.clone(), self.scenarios.len());
        self.scenarios.push(scenario);
        Ok(())
    }

    pub fn get(&self, id: &ModuleId) -> Option<&Scenario> {
        self.index.get(id).map(|&i| &self.scenarios[i])
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.index.contains_key(id)
    }

    /// Every playable case of a module: its own scenario first, then variants
    pub fn variants(&self, module: &ModuleId) -> Vec<&Scenario> {
        self.get(module)
            .into_iter()
            .chain(
                self.scenarios
                    .iter()
                    .filter(|s| s.variant_of.as_ref() == Some(module)),
            )
            .collect()
    }

    /// Variants must point at a primary scenario held by this library
    pub fn check_variants(&self) -> Result<()> {
        let mut problems = Vec::new();
        for scenario in &self.scenarios {
            let Some(target) = &scenario.variant_of else {
                continue;
            };
            match self.get(target) {
                None => problems.push(format!(
                    "scenario '{}' is a variant of unknown scenario '{}'",
                    scenario.id, target
                )),
                Some(primary) if primary.variant_of.is_some() => problems.push(format!(
                    "scenario '{}' is a variant of '{}', which is itself a variant",
                    scenario.id, target
                )),
                Some(_) => {}
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(PbqError::invalid_content("scenario library", problems))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY: &str = r#"
id = "tiny"
title = "Tiny"
scenario_text = "x"
objective_text = "y"

[[questions]]
id = "q"
text = "Pick a"
correct = "a"
feedback = "a is right"
options = [{ value = "a" }, { value = "b" }]
"#;

    #[test]
    fn test_builtin_scenarios_load() {
        let library = ScenarioLibrary::builtin().unwrap();
        assert_eq!(library.len(), BUILTIN.len());
        assert!(library.contains(&ModuleId::from("basic_access_control")));
        assert!(library.contains(&ModuleId::from("risk")));
    }

    #[test]
    fn test_variants_follow_their_primary() {
        let library = ScenarioLibrary::builtin().unwrap();
        let risk: Vec<&str> = library
            .variants(&ModuleId::from("risk"))
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(risk, vec!["risk", "risk_ransomware"]);

        let acl = library.variants(&ModuleId::from("basic_access_control"));
        assert_eq!(acl.len(), 2);
        assert_eq!(acl[1].module_id().as_str(), "basic_access_control");

        assert_eq!(library.variants(&ModuleId::from("cloud")).len(), 1);
        assert!(library.variants(&ModuleId::from("nowhere")).is_empty());
    }

    #[test]
    fn test_variant_of_missing_scenario_rejected() {
        let orphan = TINY.replace("id = \"tiny\"", "id = \"tiny\"\nvariant_of = \"ghost\"");
        let err = ScenarioLibrary::from_sources([("orphan.toml", orphan.as_str())]).unwrap_err();
        assert!(err.to_string().contains("unknown scenario 'ghost'"));

        let second = TINY.replace("id = \"tiny\"", "id = \"tiny2\"\nvariant_of = \"tiny\"");
        let third = TINY.replace("id = \"tiny\"", "id = \"tiny3\"\nvariant_of = \"tiny2\"");
        let err = ScenarioLibrary::from_sources([
            ("a.toml", TINY),
            ("b.toml", second.as_str()),
            ("c.toml", third.as_str()),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("itself a variant"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = ScenarioLibrary::from_sources([("a.toml", TINY), ("b.toml", TINY)]);
        match result {
            Err(PbqError::InvalidContent { source_name, problems }) => {
                assert_eq!(source_name, "b.toml");
                assert!(problems[0].contains("duplicate scenario id"));
            }
            other => panic!("expected duplicate rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_names_source() {
        let err = parse_scenario("broken.toml", "id = ").unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tiny.toml"), TINY).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let library = ScenarioLibrary::load_directory(dir.path()).unwrap();
        assert_eq!(library.len(), 1);
        assert!(library.get(&ModuleId::from("tiny")).is_some());
    }
}
