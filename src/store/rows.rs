//! Typed rows, one struct per table schema
//!
//! NULL cells read as the field's zero value. A cell that does not fit its
//! field (a negative id, say) makes the whole row a [`super::StoreError::BadRow`].

use crate::data::NpcId;

/// A row of the npc / custom_npc table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NpcRow {
    pub id: NpcId,
    /// Client-side display id (`idTemplate`)
    pub id_template: u32,
    pub name: String,
    /// Name is sent by the server instead of taken from the client data
    pub server_side_name: bool,
    pub title: String,
    pub server_side_title: bool,
    /// Client model class (`class`)
    pub client_class: String,
    pub collision_radius: f64,
    pub collision_height: f64,
    pub level: u32,
    pub sex: String,
    /// Type tag (`type`), e.g. `L2Monster`
    pub kind: String,
    pub attack_range: i32,
    pub hp: f64,
    pub mp: f64,
    /// HP regeneration; zero or less means use the level formula
    pub hp_reg: f64,
    /// MP regeneration; zero or less means use the level formula
    pub mp_reg: f64,
    pub str: i64,
    pub con: i64,
    pub dex: i64,
    pub int: i64,
    pub wit: i64,
    pub men: i64,
    /// Experience reward
    pub exp: i64,
    /// Skill point reward
    pub sp: i64,
    pub p_atk: i32,
    pub p_def: i32,
    pub m_atk: i32,
    pub m_def: i32,
    /// Physical attack speed (`atkspd`)
    pub p_atk_spd: i32,
    /// Casting speed (`matkspd`)
    pub m_atk_spd: i32,
    /// Critical rate
    pub critical: i32,
    /// Right hand weapon item id
    pub rhand: u32,
    /// Left hand item id
    pub lhand: u32,
    /// Weapon enchant level shown on the model
    pub enchant: u32,
    pub walk_spd: i32,
    pub run_spd: i32,
    /// Herb drop group (`dropHerbGroup`)
    pub drop_herb_group: i32,
}

/// A npcskills row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillRow {
    pub npc_id: NpcId,
    pub skill_id: u32,
    /// Skill level, or the race for the race pseudo-skill
    pub level: u32,
}

/// A droplist row (`mobId` is the NPC)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropRow {
    pub npc_id: NpcId,
    pub item_id: u32,
    pub min: u32,
    pub max: u32,
    pub category: i32,
    /// Chance out of 1,000,000
    pub chance: u32,
}

/// A npcaidata row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AiRow {
    pub npc_id: NpcId,
    pub primary_skill_id: u32,
    pub min_skill_chance: i32,
    pub max_skill_chance: i32,
    /// Aggro range; zero for passive NPCs
    pub aggro: i32,
    /// Nonzero if the NPC may move
    pub can_move: i32,
    pub show_name: bool,
    pub targetable: bool,
    /// Soulshots carried
    pub soulshot: i32,
    /// Spiritshots carried
    pub spiritshot: i32,
    /// Chance to use a soulshot (`ssChance`)
    pub soulshot_chance: i32,
    /// Chance to use a spiritshot (`spsChance`)
    pub spiritshot_chance: i32,
    pub is_chaos: i32,
    /// Skill used at close range (`minRangeSkill`)
    pub short_range_skill: u32,
    pub short_range_chance: i32,
    /// Skill used at long range (`maxRangeSkill`)
    pub long_range_skill: u32,
    pub long_range_chance: i32,
    /// Clan the NPC helps; empty for none
    pub clan: String,
    pub clan_range: i32,
    /// Clan the NPC attacks; empty for none
    pub enemy_clan: String,
    pub enemy_range: i32,
    pub dodge: i32,
    pub ai_type: String,
}

/// A npc_elementals row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementalRow {
    pub npc_id: NpcId,
    /// Raw element code, see [`crate::data::ElementKind::from_code`]
    pub attack_type: i64,
    pub attack_value: i32,
    pub fire_res: i32,
    pub water_res: i32,
    pub wind_res: i32,
    pub earth_res: i32,
    pub holy_res: i32,
    pub dark_res: i32,
}

/// A skill_learn row: this NPC teaches skills to a player class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeachRow {
    pub npc_id: NpcId,
    pub class_id: u32,
}

/// A minions row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinionRow {
    pub boss_id: NpcId,
    pub minion_id: NpcId,
    pub amount_min: u32,
    pub amount_max: u32,
}
