//! Module catalog shown on the home screen

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{PbqError, Result};
use crate::core::types::{Difficulty, DifficultyFilter, ModuleId};

const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.toml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: ModuleId,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub category: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Deserialize)]
struct CatalogFile {
    modules: Vec<CatalogEntry>,
}

/// Modules in display order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    modules: Vec<CatalogEntry>,
    index: AHashMap<ModuleId, usize>,
}

impl Catalog {
    pub fn builtin() -> Result<Self> {
        Self::parse("catalog.toml", BUILTIN_CATALOG)
    }

    pub fn parse(source_name: &str, content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content).map_err(|e| {
            PbqError::invalid_content(source_name, vec![format!("parse error: {}", e)])
        })?;
        Self::from_entries(file.modules)
            .map_err(|problems| PbqError::invalid_content(source_name, problems))
    }

    pub fn from_entries(modules: Vec<CatalogEntry>) -> std::result::Result<Self, Vec<String>> {
        let mut index = AHashMap::with_capacity(modules.len());
        let mut problems = Vec::new();

        for (i, module) in modules.iter().enumerate() {
            if index.insert(module.id.clone(), i).is_some() {
                problems.push(format!("duplicate module id '{}'", module.id));
            }
        }

        if problems.is_empty() {
            Ok(Self { modules, index })
        } else {
            Err(problems)
        }
    }

    pub fn get(&self, id: &ModuleId) -> Option<&CatalogEntry> {
        self.index.get(id).map(|&i| &self.modules[i])
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.index.contains_key(id)
    }

    pub fn modules(&self) -> &[CatalogEntry] {
        &self.modules
    }

    /// Modules admitted by the filter, in display order
    pub fn filtered(&self, filter: DifficultyFilter) -> Vec<&CatalogEntry> {
        self.modules
            .iter()
            .filter(|m| filter.admits(m.difficulty))
            .collect()
    }

    pub fn count(&self, filter: DifficultyFilter) -> usize {
        self.modules
            .iter()
            .filter(|m| filter.admits(m.difficulty))
            .count()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), 27);
        assert_eq!(catalog.modules()[0].id.as_str(), "password_policy");

        let total: usize = Difficulty::ALL
            .into_iter()
            .map(|tier| catalog.count(DifficultyFilter::Only(tier)))
            .sum();
        assert_eq!(total, catalog.count(DifficultyFilter::All));
    }

    #[test]
    fn test_filter_keeps_order() {
        let catalog = Catalog::builtin().unwrap();
        let advanced = catalog.filtered(DifficultyFilter::Only(Difficulty::Advanced));
        assert!(advanced.iter().all(|m| m.difficulty == Difficulty::Advanced));

        let positions: Vec<usize> = advanced
            .iter()
            .map(|m| catalog.modules().iter().position(|x| x.id == m.id).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_duplicate_module_rejected() {
        let entry = CatalogEntry {
            id: ModuleId::from("risk"),
            title: "Risk".into(),
            description: String::new(),
            difficulty: Difficulty::Intermediate,
            category: "Governance".into(),
            icon: None,
        };
        let problems = Catalog::from_entries(vec![entry.clone(), entry]).unwrap_err();
        assert_eq!(problems, vec!["duplicate module id 'risk'".to_string()]);
    }
}
