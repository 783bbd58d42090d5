//! SQLite implementation of [`NpcStore`]

use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::types::{FromSql, ToSqlOutput};
use rusqlite::{params, Connection, Row, ToSql};

use super::rows::*;
use super::{Assignments, NpcStore, Rows, Scope, StoreError};
use crate::data::schema::{AttrValue, Source, Table, TableSchema};
use crate::data::NpcId;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a database file; calls blocked on a lock give up after `timeout`
    pub fn open(path: impl AsRef<Path>, timeout: Duration) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(timeout)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Create every base and custom table that does not exist yet
    pub fn create_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        for table in Table::ALL {
            let schema = table.schema();
            for source in [Source::Base, Source::Custom] {
                if let Some(name) = schema.name(source) {
                    conn.execute_batch(&schema.create_sql(name))?;
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    /// Run a SELECT for one schema, converting each row on its own
    fn select<T>(
        &self,
        schema: &TableSchema,
        source: Source,
        scope: Scope,
        map: impl Fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Rows<T>, StoreError> {
        let table = schema
            .name(source)
            .ok_or(StoreError::NoSuchSource(schema.table, source))?;
        let columns = schema.select_list();

        let conn = self.conn.lock();
        let (sql, id) = match scope {
            Scope::All => (
                format!("SELECT {} FROM {} ORDER BY {}", columns, table, schema.order_by),
                None,
            ),
            Scope::One(id) => (
                format!(
                    "SELECT {} FROM {} WHERE \"{}\" = ?1 ORDER BY {}",
                    columns, table, schema.key, schema.order_by
                ),
                Some(id),
            ),
        };
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = match id {
            Some(id) => stmt.query(params![id])?,
            None => stmt.query([])?,
        };

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(map(row).map_err(|e| StoreError::BadRow {
                table,
                key_column: schema.key,
                key: row
                    .get::<_, Option<i64>>(schema.key)
                    .ok()
                    .flatten()
                    .map_or_else(|| "?".to_string(), |k| k.to_string()),
                source: e,
            }));
        }
        Ok(out)
    }
}

/// Read a non-key cell, taking NULL as the type's zero value
fn cell<T: FromSql + Default>(row: &Row<'_>, column: &str) -> rusqlite::Result<T> {
    Ok(row.get::<_, Option<T>>(column)?.unwrap_or_default())
}

impl NpcStore for SqliteStore {
    fn npcs(&self, source: Source, scope: Scope) -> Result<Rows<NpcRow>, StoreError> {
        self.select(Table::Npc.schema(), source, scope, npc_row)
    }

    fn skills(&self, source: Source, scope: Scope) -> Result<Rows<SkillRow>, StoreError> {
        self.select(Table::Skills.schema(), source, scope, |row| {
            Ok(SkillRow {
                npc_id: row.get("npcid")?,
                skill_id: cell(row, "skillid")?,
                level: cell(row, "level")?,
            })
        })
    }

    fn drops(&self, source: Source, scope: Scope) -> Result<Rows<DropRow>, StoreError> {
        self.select(Table::Droplist.schema(), source, scope, |row| {
            Ok(DropRow {
                npc_id: row.get("mobId")?,
                item_id: cell(row, "itemId")?,
                min: cell(row, "min")?,
                max: cell(row, "max")?,
                category: cell(row, "category")?,
                chance: cell(row, "chance")?,
            })
        })
    }

    fn ai_data(&self, source: Source, scope: Scope) -> Result<Rows<AiRow>, StoreError> {
        self.select(Table::AiData.schema(), source, scope, ai_row)
    }

    fn elementals(&self, source: Source, scope: Scope) -> Result<Rows<ElementalRow>, StoreError> {
        self.select(Table::Elementals.schema(), source, scope, |row| {
            Ok(ElementalRow {
                npc_id: row.get("npc_id")?,
                attack_type: cell(row, "elemAtkType")?,
                attack_value: cell(row, "elemAtkValue")?,
                fire_res: cell(row, "fireDefValue")?,
                water_res: cell(row, "waterDefValue")?,
                wind_res: cell(row, "windDefValue")?,
                earth_res: cell(row, "earthDefValue")?,
                holy_res: cell(row, "holyDefValue")?,
                dark_res: cell(row, "darkDefValue")?,
            })
        })
    }

    fn skill_learn(&self, scope: Scope) -> Result<Rows<TeachRow>, StoreError> {
        self.select(Table::SkillLearn.schema(), Source::Base, scope, |row| {
            Ok(TeachRow {
                npc_id: row.get("npc_id")?,
                class_id: cell(row, "class_id")?,
            })
        })
    }

    fn minions(&self, scope: Scope) -> Result<Rows<MinionRow>, StoreError> {
        self.select(Table::Minions.schema(), Source::Base, scope, |row| {
            Ok(MinionRow {
                boss_id: row.get("boss_id")?,
                minion_id: cell(row, "minion_id")?,
                amount_min: cell(row, "amount_min")?,
                amount_max: cell(row, "amount_max")?,
            })
        })
    }

    fn update(
        &self,
        table: Table,
        source: Source,
        npc_id: NpcId,
        values: &Assignments<'_>,
    ) -> Result<usize, StoreError> {
        if values.is_empty() {
            return Ok(0);
        }
        let schema = table.schema();
        let name = schema
            .name(source)
            .ok_or(StoreError::NoSuchSource(table, source))?;

        // Column names go into the statement text, so only schema names pass
        for (column, value) in values {
            let Some(known) = schema.column(column) else {
                return Err(StoreError::UnknownColumn {
                    table: name,
                    column: column.to_string(),
                });
            };
            if !value.fits(known.kind) {
                return Err(StoreError::TypeMismatch {
                    table: name,
                    column: column.to_string(),
                    kind: known.kind,
                    value: (*value).clone(),
                });
            }
        }

        let assignments = values
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("\"{}\" = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE \"{}\" = ?{}",
            name,
            assignments,
            schema.key,
            values.len() + 1
        );

        let mut bound: Vec<&dyn ToSql> = values.iter().map(|(_, v)| *v as &dyn ToSql).collect();
        bound.push(&npc_id);

        let conn = self.conn.lock();
        Ok(conn.execute(&sql, bound.as_slice())?)
    }
}

impl ToSql for AttrValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            AttrValue::Int(v) => ToSqlOutput::from(*v),
            AttrValue::Float(v) => ToSqlOutput::from(*v),
            AttrValue::Bool(v) => ToSqlOutput::from(*v),
            AttrValue::Text(v) => ToSqlOutput::from(v.as_str()),
        })
    }
}

fn npc_row(row: &Row<'_>) -> rusqlite::Result<NpcRow> {
    Ok(NpcRow {
        id: row.get("id")?,
        id_template: cell(row, "idTemplate")?,
        name: cell(row, "name")?,
        server_side_name: cell(row, "serverSideName")?,
        title: cell(row, "title")?,
        server_side_title: cell(row, "serverSideTitle")?,
        client_class: cell(row, "class")?,
        collision_radius: cell(row, "collision_radius")?,
        collision_height: cell(row, "collision_height")?,
        level: cell(row, "level")?,
        sex: cell(row, "sex")?,
        kind: cell(row, "type")?,
        attack_range: cell(row, "attackrange")?,
        hp: cell(row, "hp")?,
        mp: cell(row, "mp")?,
        hp_reg: cell(row, "hpreg")?,
        mp_reg: cell(row, "mpreg")?,
        str: cell(row, "str")?,
        con: cell(row, "con")?,
        dex: cell(row, "dex")?,
        int: cell(row, "int")?,
        wit: cell(row, "wit")?,
        men: cell(row, "men")?,
        exp: cell(row, "exp")?,
        sp: cell(row, "sp")?,
        p_atk: cell(row, "patk")?,
        p_def: cell(row, "pdef")?,
        m_atk: cell(row, "matk")?,
        m_def: cell(row, "mdef")?,
        p_atk_spd: cell(row, "atkspd")?,
        m_atk_spd: cell(row, "matkspd")?,
        critical: cell(row, "critical")?,
        rhand: cell(row, "rhand")?,
        lhand: cell(row, "lhand")?,
        enchant: cell(row, "enchant")?,
        walk_spd: cell(row, "walkspd")?,
        run_spd: cell(row, "runspd")?,
        drop_herb_group: cell(row, "dropHerbGroup")?,
    })
}

fn ai_row(row: &Row<'_>) -> rusqlite::Result<AiRow> {
    Ok(AiRow {
        npc_id: row.get("npcId")?,
        primary_skill_id: cell(row, "primarySkillId")?,
        min_skill_chance: cell(row, "minSkillChance")?,
        max_skill_chance: cell(row, "maxSkillChance")?,
        aggro: cell(row, "aggro")?,
        can_move: cell(row, "canMove")?,
        show_name: cell(row, "showName")?,
        targetable: cell(row, "targetable")?,
        soulshot: cell(row, "soulshot")?,
        spiritshot: cell(row, "spiritshot")?,
        soulshot_chance: cell(row, "ssChance")?,
        spiritshot_chance: cell(row, "spsChance")?,
        is_chaos: cell(row, "isChaos")?,
        short_range_skill: cell(row, "minRangeSkill")?,
        short_range_chance: cell(row, "minRangeChance")?,
        long_range_skill: cell(row, "maxRangeSkill")?,
        long_range_chance: cell(row, "maxRangeChance")?,
        clan: cell(row, "clan")?,
        clan_range: cell(row, "clanRange")?,
        enemy_clan: cell(row, "enemyClan")?,
        enemy_range: cell(row, "enemyRange")?,
        dodge: cell(row, "dodge")?,
        ai_type: cell(row, "aiType")?,
    })
}

/// In-memory store with the full schema, for tests
#[cfg(test)]
pub(crate) fn test_store(seed: &str) -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    store.create_schema().unwrap();
    store.execute_batch(seed).unwrap();
    store
}
