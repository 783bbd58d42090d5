//! NPC template data
//!
//! Table schemas, the template model, the in-memory registry and the loader
//! that fills it from the store.

pub mod schema;
pub mod template;
pub mod catalog;
pub mod registry;
pub mod loader;

pub use catalog::{Catalog, ClassInfo, SkillInfo, StaticCatalog};
pub use loader::{ChildPass, LoadReport, NpcLoader, PassReport, SaveOutcome, Tally};
pub use registry::NpcRegistry;
pub use schema::{AttrValue, AttributeSet, Source, Table};
pub use template::{ElementKind, HookKind, NpcId, NpcTemplate, ScriptHook};
