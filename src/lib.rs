//! Npcdata - NPC template registry for a game server
//!
//! Loads NPC templates and their skills, drops, AI, minions, teach info and
//! elementals from base tables with optional custom overrides, and keeps them
//! in a registry that can be reloaded while the server runs.

pub mod config;
pub mod data;
pub mod store;
pub mod command;

// Re-export commonly used types
pub use config::{Config, StatPolicy};
pub use data::{NpcId, NpcLoader, NpcRegistry, NpcTemplate};
pub use store::{NpcStore, SqliteStore};
