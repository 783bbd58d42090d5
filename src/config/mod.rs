//! Loader configuration
//!
//! Read from a RON file. Every field has a default, so a partial file (or no
//! file at all) is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name looked up in the platform config directory
pub const CONFIG_FILE: &str = "npcdata.ron";

/// What to do with an ability score outside its legal range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatPolicy {
    /// Log and keep the value as read
    Keep,
    /// Log and clamp into range
    #[default]
    Clamp,
    /// Log and skip the whole row
    Reject,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database holding the NPC tables
    pub database: PathBuf,
    /// Optional RON catalog of known skills, items and classes
    pub catalog: Option<PathBuf>,
    /// Overlay custom_npc, custom_npcaidata and custom_npc_elementals
    pub custom_npc_table: bool,
    /// Overlay custom_npcskills
    pub custom_npc_skills_table: bool,
    /// Overlay custom_droplist
    pub custom_droplist_table: bool,
    pub stat_policy: StatPolicy,
    /// How long a store call may wait on a locked database
    pub store_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("npcdata.db"),
            catalog: None,
            custom_npc_table: false,
            custom_npc_skills_table: false,
            custom_droplist_table: false,
            stat_policy: StatPolicy::default(),
            store_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Load from a RON file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(content)?)
    }

    /// Platform config location, or the working directory if there is none
    pub fn default_path() -> PathBuf {
        use directories::ProjectDirs;

        if let Some(proj_dirs) = ProjectDirs::from("com", "npcdata", "Npcdata") {
            proj_dirs.config_dir().join(CONFIG_FILE)
        } else {
            PathBuf::from(CONFIG_FILE)
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
