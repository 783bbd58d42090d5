//! External catalogs
//!
//! Skills, items and player classes live outside the NPC tables. The loader
//! only needs to resolve them by id, so they are reached through [`Catalog`].

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A resolved skill at a specific level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInfo {
    pub id: u32,
    pub level: u32,
    pub name: String,
}

/// A resolved player class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub id: u32,
    pub name: String,
}

/// Lookups the loader performs against data it does not own
pub trait Catalog: Send + Sync {
    fn skill(&self, id: u32, level: u32) -> Option<SkillInfo>;
    fn has_item(&self, item_id: u32) -> bool;
    fn class(&self, id: u32) -> Option<ClassInfo>;
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// On-disk catalog layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogFile {
    pub skills: Vec<SkillInfo>,
    pub items: Vec<u32>,
    pub classes: Vec<ClassInfo>,
}

/// In-memory catalog indexed for id lookups
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    skills: HashMap<(u32, u32), SkillInfo>,
    items: HashSet<u32>,
    classes: HashMap<u32, ClassInfo>,
}

impl StaticCatalog {
    pub fn new(file: CatalogFile) -> Self {
        Self {
            skills: file.skills.into_iter().map(|s| ((s.id, s.level), s)).collect(),
            items: file.items.into_iter().collect(),
            classes: file.classes.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    pub fn from_ron(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = ron::from_str(content)?;
        Ok(Self::new(file))
    }

    pub fn add_skill(&mut self, id: u32, level: u32, name: &str) {
        let skill = SkillInfo { id, level, name: name.to_string() };
        self.skills.insert((id, level), skill);
    }

    pub fn add_item(&mut self, item_id: u32) {
        self.items.insert(item_id);
    }

    pub fn add_class(&mut self, id: u32, name: &str) {
        self.classes.insert(id, ClassInfo { id, name: name.to_string() });
    }
}

impl Catalog for StaticCatalog {
    fn skill(&self, id: u32, level: u32) -> Option<SkillInfo> {
        self.skills.get(&(id, level)).cloned()
    }

    fn has_item(&self, item_id: u32) -> bool {
        self.items.contains(&item_id)
    }

    fn class(&self, id: u32) -> Option<ClassInfo> {
        self.classes.get(&id).cloned()
    }
}
