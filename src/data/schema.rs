//! Table schemas
//!
//! Every logical NPC table is declared once here: its base and custom table
//! names, key column, row ordering and typed columns. The store builds its
//! SELECT, UPDATE and CREATE statements from these declarations, and save-back
//! values are checked against them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Highest legal value for an NPC ability score (STR, CON, DEX, INT, WIT, MEN)
pub const MAX_STAT_VALUE: i64 = 100;

/// Which of the two parallel tables a query targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Shipped data
    Base,
    /// Operator overrides, same column shape as base
    Custom,
}

impl Source {
    pub fn name(&self) -> &'static str {
        match self {
            Source::Base => "base",
            Source::Custom => "custom",
        }
    }
}

/// Semantic column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Bool,
    Text,
}

impl ColumnType {
    /// Column definition; cells may hold NULL, read back as the type's zero value
    fn sql(&self) -> &'static str {
        match self {
            ColumnType::Integer | ColumnType::Bool => "INTEGER DEFAULT 0",
            ColumnType::Float => "REAL DEFAULT 0",
            ColumnType::Text => "TEXT DEFAULT ''",
        }
    }
}

/// Validation applied to a column value at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    None,
    /// Inclusive range, handled by the configured stat policy
    Range { min: i64, max: i64 },
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
    pub rule: Rule,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnType) -> Self {
        Self { name, kind, rule: Rule::None }
    }

    /// An ability score column bounded by [`MAX_STAT_VALUE`]
    pub const fn stat(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnType::Integer,
            rule: Rule::Range { min: 0, max: MAX_STAT_VALUE },
        }
    }
}

/// Logical tables read by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Npc,
    Skills,
    Droplist,
    AiData,
    Elementals,
    SkillLearn,
    Minions,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Npc,
        Table::Skills,
        Table::Droplist,
        Table::AiData,
        Table::Elementals,
        Table::SkillLearn,
        Table::Minions,
    ];

    pub fn schema(&self) -> &'static TableSchema {
        match self {
            Table::Npc => &NPC,
            Table::Skills => &NPC_SKILLS,
            Table::Droplist => &DROPLIST,
            Table::AiData => &NPC_AI,
            Table::Elementals => &NPC_ELEMENTALS,
            Table::SkillLearn => &SKILL_LEARN,
            Table::Minions => &MINIONS,
        }
    }
}

#[derive(Debug)]
pub struct TableSchema {
    pub table: Table,
    pub base: &'static str,
    pub custom: Option<&'static str>,
    /// Column holding the owning NPC id
    pub key: &'static str,
    pub primary_key: bool,
    pub order_by: &'static str,
    pub columns: &'static [Column],
}

impl TableSchema {
    /// Physical table name for a source, if that source exists
    pub fn name(&self, source: Source) -> Option<&'static str> {
        match source {
            Source::Base => Some(self.base),
            Source::Custom => self.custom,
        }
    }

    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Quoted, comma separated column list for SELECT
    pub fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("\"{}\"", c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn create_sql(&self, table_name: &str) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                if self.primary_key && c.name == self.key {
                    format!("\"{}\" INTEGER PRIMARY KEY", c.name)
                } else {
                    format!("\"{}\" {}", c.name, c.kind.sql())
                }
            })
            .collect::<Vec<_>>()
            .join(",\n  ");
        format!("CREATE TABLE IF NOT EXISTS {} (\n  {}\n);", table_name, columns)
    }
}

use ColumnType::*;

pub static NPC: TableSchema = TableSchema {
    table: Table::Npc,
    base: "npc",
    custom: Some("custom_npc"),
    key: "id",
    primary_key: true,
    order_by: "\"id\"",
    columns: &[
        Column::new("id", Integer),
        Column::new("idTemplate", Integer),
        Column::new("name", Text),
        Column::new("serverSideName", Bool),
        Column::new("title", Text),
        Column::new("serverSideTitle", Bool),
        Column::new("class", Text),
        Column::new("collision_radius", Float),
        Column::new("collision_height", Float),
        Column::new("level", Integer),
        Column::new("sex", Text),
        Column::new("type", Text),
        Column::new("attackrange", Integer),
        Column::new("hp", Float),
        Column::new("mp", Float),
        Column::new("hpreg", Float),
        Column::new("mpreg", Float),
        Column::stat("str"),
        Column::stat("con"),
        Column::stat("dex"),
        Column::stat("int"),
        Column::stat("wit"),
        Column::stat("men"),
        Column::new("exp", Integer),
        Column::new("sp", Integer),
        Column::new("patk", Integer),
        Column::new("pdef", Integer),
        Column::new("matk", Integer),
        Column::new("mdef", Integer),
        Column::new("atkspd", Integer),
        Column::new("matkspd", Integer),
        Column::new("critical", Integer),
        Column::new("rhand", Integer),
        Column::new("lhand", Integer),
        Column::new("enchant", Integer),
        Column::new("walkspd", Integer),
        Column::new("runspd", Integer),
        Column::new("dropHerbGroup", Integer),
    ],
};

pub static NPC_SKILLS: TableSchema = TableSchema {
    table: Table::Skills,
    base: "npcskills",
    custom: Some("custom_npcskills"),
    key: "npcid",
    primary_key: false,
    order_by: "\"npcid\"",
    columns: &[
        Column::new("npcid", Integer),
        Column::new("skillid", Integer),
        Column::new("level", Integer),
    ],
};

pub static DROPLIST: TableSchema = TableSchema {
    table: Table::Droplist,
    base: "droplist",
    custom: Some("custom_droplist"),
    key: "mobId",
    primary_key: false,
    order_by: "\"mobId\", \"chance\" DESC",
    columns: &[
        Column::new("mobId", Integer),
        Column::new("itemId", Integer),
        Column::new("min", Integer),
        Column::new("max", Integer),
        Column::new("category", Integer),
        Column::new("chance", Integer),
    ],
};

pub static NPC_AI: TableSchema = TableSchema {
    table: Table::AiData,
    base: "npcaidata",
    custom: Some("custom_npcaidata"),
    key: "npcId",
    primary_key: false,
    order_by: "\"npcId\"",
    columns: &[
        Column::new("npcId", Integer),
        Column::new("primarySkillId", Integer),
        Column::new("minSkillChance", Integer),
        Column::new("maxSkillChance", Integer),
        Column::new("aggro", Integer),
        Column::new("canMove", Integer),
        Column::new("showName", Bool),
        Column::new("targetable", Bool),
        Column::new("soulshot", Integer),
        Column::new("spiritshot", Integer),
        Column::new("ssChance", Integer),
        Column::new("spsChance", Integer),
        Column::new("isChaos", Integer),
        Column::new("minRangeSkill", Integer),
        Column::new("minRangeChance", Integer),
        Column::new("maxRangeSkill", Integer),
        Column::new("maxRangeChance", Integer),
        Column::new("clan", Text),
        Column::new("clanRange", Integer),
        Column::new("enemyClan", Text),
        Column::new("enemyRange", Integer),
        Column::new("dodge", Integer),
        Column::new("aiType", Text),
    ],
};

pub static NPC_ELEMENTALS: TableSchema = TableSchema {
    table: Table::Elementals,
    base: "npc_elementals",
    custom: Some("custom_npc_elementals"),
    key: "npc_id",
    primary_key: false,
    order_by: "\"npc_id\"",
    columns: &[
        Column::new("npc_id", Integer),
        Column::new("elemAtkType", Integer),
        Column::new("elemAtkValue", Integer),
        Column::new("fireDefValue", Integer),
        Column::new("waterDefValue", Integer),
        Column::new("windDefValue", Integer),
        Column::new("earthDefValue", Integer),
        Column::new("holyDefValue", Integer),
        Column::new("darkDefValue", Integer),
    ],
};

pub static SKILL_LEARN: TableSchema = TableSchema {
    table: Table::SkillLearn,
    base: "skill_learn",
    custom: None,
    key: "npc_id",
    primary_key: false,
    order_by: "\"npc_id\"",
    columns: &[
        Column::new("npc_id", Integer),
        Column::new("class_id", Integer),
    ],
};

pub static MINIONS: TableSchema = TableSchema {
    table: Table::Minions,
    base: "minions",
    custom: None,
    key: "boss_id",
    primary_key: false,
    order_by: "\"boss_id\"",
    columns: &[
        Column::new("boss_id", Integer),
        Column::new("minion_id", Integer),
        Column::new("amount_min", Integer),
        Column::new("amount_max", Integer),
    ],
};

/// A single attribute value written back to an NPC table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl AttrValue {
    /// Whether this value can be stored in a column of the given type
    pub fn fits(&self, kind: ColumnType) -> bool {
        matches!(
            (self, kind),
            (AttrValue::Int(_), Integer | Float | Bool)
                | (AttrValue::Float(_), Float)
                | (AttrValue::Bool(_), Bool | Integer)
                | (AttrValue::Text(_), Text)
        )
    }

    /// Parse raw text as a value of the given column type
    pub fn parse(kind: ColumnType, raw: &str) -> Option<Self> {
        match kind {
            Integer => raw.parse().ok().map(AttrValue::Int),
            Float => raw.parse().ok().map(AttrValue::Float),
            Bool => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" => Some(AttrValue::Bool(true)),
                "0" | "false" => Some(AttrValue::Bool(false)),
                _ => None,
            },
            Text => Some(AttrValue::Text(raw.to_string())),
        }
    }
}

/// Column names routed to the AI table on save
pub const AI_ATTRIBUTES: [&str; 3] = ["aggro", "showName", "targetable"];

/// Identifying attributes never written back
const ID_ATTRIBUTES: [&str; 2] = ["id", "npcId"];

/// Named attribute bag for saving an NPC back to its tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSet {
    values: IndexMap<String, AttrValue>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: AttrValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Split into (main table, AI table) assignments, dropping the id
    pub fn partition(&self) -> (Vec<(&str, &AttrValue)>, Vec<(&str, &AttrValue)>) {
        let mut main = Vec::new();
        let mut ai = Vec::new();
        for (name, value) in &self.values {
            let name = name.as_str();
            if ID_ATTRIBUTES.contains(&name) {
                continue;
            }
            if AI_ATTRIBUTES.contains(&name) {
                ai.push((name, value));
            } else {
                main.push((name, value));
            }
        }
        (main, ai)
    }
}
