//! Storage boundary
//!
//! The loader reads and writes NPC tables only through [`NpcStore`]. Every read
//! exists for both the base and the custom table (where the table has a custom
//! variant) and for either all rows or the rows of one NPC.
//!
//! A read fails as a whole only when the query itself fails. A row whose cells
//! do not convert comes back as its own `Err` so the caller can skip it and
//! keep the rest.

pub mod rows;
pub mod sqlite;

use std::fmt;

use thiserror::Error;

use crate::data::schema::{AttrValue, ColumnType, Source, Table};
use crate::data::NpcId;

pub use rows::{AiRow, DropRow, ElementalRow, MinionRow, NpcRow, SkillRow, TeachRow};
pub use sqlite::SqliteStore;

/// Which NPCs a query covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    One(NpcId),
}

impl Scope {
    /// Zero means every NPC
    pub fn from_id(id: NpcId) -> Self {
        if id == 0 {
            Scope::All
        } else {
            Scope::One(id)
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => write!(f, "all NPCs"),
            Scope::One(id) => write!(f, "NPC {}", id),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("{0:?} has no {1:?} table")]
    NoSuchSource(Table, Source),
    #[error("unknown column {column} in {table}")]
    UnknownColumn { table: &'static str, column: String },
    #[error("bad row in {table} ({key_column} = {key}): {source}")]
    BadRow {
        table: &'static str,
        key_column: &'static str,
        key: String,
        source: rusqlite::Error,
    },
    #[error("value {value:?} does not fit column {column} ({kind:?}) in {table}")]
    TypeMismatch {
        table: &'static str,
        column: String,
        kind: ColumnType,
        value: AttrValue,
    },
}

/// Rows of one read, each converted on its own
pub type Rows<T> = Vec<Result<T, StoreError>>;

/// Column assignments for an UPDATE, by column name
pub type Assignments<'a> = [(&'a str, &'a AttrValue)];

/// Blocking access to the NPC tables
pub trait NpcStore: Send + Sync {
    fn npcs(&self, source: Source, scope: Scope) -> Result<Rows<NpcRow>, StoreError>;
    fn skills(&self, source: Source, scope: Scope) -> Result<Rows<SkillRow>, StoreError>;
    fn drops(&self, source: Source, scope: Scope) -> Result<Rows<DropRow>, StoreError>;
    fn ai_data(&self, source: Source, scope: Scope) -> Result<Rows<AiRow>, StoreError>;
    fn elementals(&self, source: Source, scope: Scope) -> Result<Rows<ElementalRow>, StoreError>;
    fn skill_learn(&self, scope: Scope) -> Result<Rows<TeachRow>, StoreError>;
    fn minions(&self, scope: Scope) -> Result<Rows<MinionRow>, StoreError>;

    /// Update one NPC's row in `table`; returns the number of rows changed.
    /// Empty assignments change nothing and return 0.
    fn update(
        &self,
        table: Table,
        source: Source,
        npc_id: NpcId,
        values: &Assignments<'_>,
    ) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_from_id() {
        assert_eq!(Scope::from_id(0), Scope::All);
        assert_eq!(Scope::from_id(20001), Scope::One(20001));
        assert_eq!(Scope::One(7).to_string(), "NPC 7");
    }
}
