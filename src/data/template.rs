//! NPC templates
//!
//! A template is the shared definition behind every spawned instance of one
//! NPC archetype. It is built from a base or custom `npc` row and then filled
//! in by the attach passes (skills, drops, AI, minions, teach info, elementals).

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::StatPolicy;
use crate::data::catalog::{ClassInfo, SkillInfo};
use crate::data::schema::{self, AttrValue, AttributeSet, Rule};
use crate::store::{AiRow, DropRow, ElementalRow, MinionRow, NpcRow};

/// Unique NPC template id, assigned by data authors
pub type NpcId = u32;

/// Resist every element starts with before the elementals pass
pub const DEFAULT_ELEMENT_RES: i32 = 20;

/// Type tag of attackable monsters
pub const MONSTER_KIND: &str = "L2Monster";
/// Type tag of plain town NPCs
pub const NPC_KIND: &str = "L2Npc";

/// Hit point regeneration used when the row has none
pub fn default_hp_regen(level: u32) -> f64 {
    1.5 + ((level as f64 - 1.0) / 10.0)
}

/// Mana regeneration used when the row has none
pub fn default_mp_regen(level: u32) -> f64 {
    0.9 + 0.3 * ((level as f64 - 1.0) / 10.0)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("npc template {id}: {column} = {value} outside {min}..={max}")]
    OutOfRange {
        id: u32,
        column: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Core ability scores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    pub strength: i32,
    pub constitution: i32,
    pub dexterity: i32,
    pub intelligence: i32,
    pub wit: i32,
    pub mental: i32,
}

/// Combat values copied from the npc row
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatStats {
    pub hp_max: f64,
    pub mp_max: f64,
    /// NPCs have no CP; always zero
    pub cp_max: f64,
    /// HP per regen tick, from the row or [`default_hp_regen`] when the row has none
    pub hp_reg: f64,
    /// MP per regen tick, from the row or the level formula when the row has none
    pub mp_reg: f64,
    pub p_atk: i32,
    pub p_def: i32,
    pub m_atk: i32,
    pub m_def: i32,
    pub p_atk_spd: i32,
    /// Casting speed
    pub m_atk_spd: i32,
    pub attack_range: i32,
    pub crit_rate: i32,
    /// Not stored in the npc table; zero
    pub shield_def: i32,
    /// Not stored in the npc table; zero
    pub shield_rate: i32,
    pub walk_spd: i32,
    pub run_spd: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropData {
    pub item_id: u32,
    pub min: u32,
    pub max: u32,
    /// Chance out of 1,000,000
    pub chance: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropCategory {
    pub id: i32,
    pub drops: Vec<DropData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinionData {
    pub minion_id: NpcId,
    pub amount_min: u32,
    pub amount_max: u32,
}

/// AI behaviour parameters; at most one per template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcAiData {
    pub primary_skill_id: u32,
    /// Percent chance range for using a skill instead of a melee hit
    pub min_skill_chance: i32,
    pub max_skill_chance: i32,
    /// Aggro range; zero for passive NPCs
    pub aggro: i32,
    pub can_move: bool,
    pub show_name: bool,
    pub targetable: bool,
    /// Soulshots carried
    pub soulshot: i32,
    /// Spiritshots carried
    pub spiritshot: i32,
    pub soulshot_chance: i32,
    pub spiritshot_chance: i32,
    /// Chaos aggression level; zero means the NPC does not attack other NPCs
    pub is_chaos: i32,
    /// Skill used at close range
    pub short_range_skill: u32,
    pub short_range_chance: i32,
    /// Skill used at long range
    pub long_range_skill: u32,
    pub long_range_chance: i32,
    /// Clan the NPC helps; `None` when the row has none
    pub clan: Option<String>,
    /// Range within which clan members are helped
    pub clan_range: i32,
    /// Clan the NPC attacks on sight
    pub enemy_clan: Option<String>,
    pub enemy_range: i32,
    pub dodge: i32,
    pub ai_type: String,
}

impl From<AiRow> for NpcAiData {
    fn from(row: AiRow) -> Self {
        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
        Self {
            primary_skill_id: row.primary_skill_id,
            min_skill_chance: row.min_skill_chance,
            max_skill_chance: row.max_skill_chance,
            aggro: row.aggro,
            can_move: row.can_move != 0,
            show_name: row.show_name,
            targetable: row.targetable,
            soulshot: row.soulshot,
            spiritshot: row.spiritshot,
            soulshot_chance: row.soulshot_chance,
            spiritshot_chance: row.spiritshot_chance,
            is_chaos: row.is_chaos,
            short_range_skill: row.short_range_skill,
            short_range_chance: row.short_range_chance,
            long_range_skill: row.long_range_skill,
            long_range_chance: row.long_range_chance,
            clan: non_empty(row.clan),
            clan_range: row.clan_range,
            enemy_clan: non_empty(row.enemy_clan),
            enemy_range: row.enemy_range,
            dodge: row.dodge,
            ai_type: row.ai_type,
        }
    }
}

/// The six elements, numbered as stored in `elemAtkType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Fire,
    Water,
    Wind,
    Earth,
    Holy,
    Dark,
}

impl ElementKind {
    pub const ALL: [ElementKind; 6] = [
        ElementKind::Fire,
        ElementKind::Water,
        ElementKind::Wind,
        ElementKind::Earth,
        ElementKind::Holy,
        ElementKind::Dark,
    ];

    /// Element for a stored code; anything outside 0..=5 is unknown
    pub fn from_code(value: i64) -> Option<Self> {
        match value {
            0 => Some(ElementKind::Fire),
            1 => Some(ElementKind::Water),
            2 => Some(ElementKind::Wind),
            3 => Some(ElementKind::Earth),
            4 => Some(ElementKind::Holy),
            5 => Some(ElementKind::Dark),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementAttack {
    pub kind: ElementKind,
    pub value: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementResists {
    pub fire: i32,
    pub water: i32,
    pub wind: i32,
    pub earth: i32,
    pub holy: i32,
    pub dark: i32,
}

impl ElementResists {
    pub fn uniform(value: i32) -> Self {
        Self { fire: value, water: value, wind: value, earth: value, holy: value, dark: value }
    }

    pub fn get(&self, kind: ElementKind) -> i32 {
        match kind {
            ElementKind::Fire => self.fire,
            ElementKind::Water => self.water,
            ElementKind::Wind => self.wind,
            ElementKind::Earth => self.earth,
            ElementKind::Holy => self.holy,
            ElementKind::Dark => self.dark,
        }
    }
}

impl From<&ElementalRow> for ElementResists {
    fn from(row: &ElementalRow) -> Self {
        Self {
            fire: row.fire_res,
            water: row.water_res,
            wind: row.wind_res,
            earth: row.earth_res,
            holy: row.holy_res,
            dark: row.dark_res,
        }
    }
}

/// Elemental attack and resists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elementals {
    /// At most one attack element
    pub attack: Option<ElementAttack>,
    pub resists: ElementResists,
}

impl Default for Elementals {
    fn default() -> Self {
        Self {
            attack: None,
            resists: ElementResists::uniform(DEFAULT_ELEMENT_RES),
        }
    }
}

impl Elementals {
    /// Attack value for one element, zero unless it is the attack element
    pub fn attack_value(&self, kind: ElementKind) -> i32 {
        match self.attack {
            Some(attack) if attack.kind == kind => attack.value,
            _ => 0,
        }
    }
}

/// Script event categories a hook can be registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookKind {
    Attack,
    Kill,
    Spawn,
    SkillSee,
    FactionCall,
    AggroRangeEnter,
    SpellFinished,
    SkillLearn,
    EnterZone,
    ExitZone,
    TrapAction,
    QuestStart,
    Talk,
    FirstTalk,
}

/// A script callback registered at runtime against a template
pub trait ScriptHook: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;
}

pub type HookHandle = Arc<dyn ScriptHook>;

/// Runtime extensions attached to a template, grouped by event kind
#[derive(Debug, Clone, Default)]
pub struct ScriptHooks {
    by_kind: IndexMap<HookKind, Vec<HookHandle>>,
}

impl ScriptHooks {
    pub fn add(&mut self, kind: HookKind, hook: HookHandle) {
        let hooks = self.by_kind.entry(kind).or_default();
        if !hooks.iter().any(|h| Arc::ptr_eq(h, &hook)) {
            hooks.push(hook);
        }
    }

    pub fn get(&self, kind: HookKind) -> &[HookHandle] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Add every hook of `other` that is not already present
    pub fn merge(&mut self, other: &ScriptHooks) {
        for (kind, hooks) in &other.by_kind {
            for hook in hooks {
                self.add(*kind, Arc::clone(hook));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One NPC archetype
#[derive(Debug, Clone, Serialize)]
pub struct NpcTemplate {
    pub id: NpcId,
    /// Client-side display id
    pub display_id: u32,
    pub name: String,
    pub server_side_name: bool,
    pub title: String,
    pub server_side_title: bool,
    pub client_class: String,
    pub collision_radius: f64,
    pub collision_height: f64,
    pub level: u32,
    pub sex: String,
    /// Type tag such as `L2Monster` or `L2Npc`
    pub kind: String,
    /// Set by the race pseudo-skill
    pub race: Option<u32>,
    pub stats: BaseStats,
    pub combat: CombatStats,
    pub reward_exp: i64,
    pub reward_sp: i64,
    pub rhand: u32,
    pub lhand: u32,
    pub enchant: u32,
    pub drop_herb_group: i32,
    pub skills: Vec<SkillInfo>,
    pub drop_categories: Vec<DropCategory>,
    pub ai: Option<NpcAiData>,
    pub minions: Vec<MinionData>,
    /// Player classes this NPC teaches skills to
    pub teaches: Vec<ClassInfo>,
    pub elementals: Elementals,
    #[serde(skip)]
    pub hooks: ScriptHooks,
}

impl NpcTemplate {
    /// Build a template from an npc row, validating ability scores
    pub fn from_row(row: NpcRow, policy: StatPolicy) -> Result<Self, TemplateError> {
        let stat = |column: &'static str, value: i64| {
            checked_stat(row.id_template, column, value, policy)
        };
        let stats = BaseStats {
            strength: stat("str", row.str)?,
            constitution: stat("con", row.con)?,
            dexterity: stat("dex", row.dex)?,
            intelligence: stat("int", row.int)?,
            wit: stat("wit", row.wit)?,
            mental: stat("men", row.men)?,
        };

        let combat = CombatStats {
            hp_max: row.hp,
            mp_max: row.mp,
            cp_max: 0.0,
            hp_reg: if row.hp_reg > 0.0 { row.hp_reg } else { default_hp_regen(row.level) },
            mp_reg: if row.mp_reg > 0.0 { row.mp_reg } else { default_mp_regen(row.level) },
            p_atk: row.p_atk,
            p_def: row.p_def,
            m_atk: row.m_atk,
            m_def: row.m_def,
            p_atk_spd: row.p_atk_spd,
            m_atk_spd: row.m_atk_spd,
            attack_range: row.attack_range,
            crit_rate: row.critical,
            shield_def: 0,
            shield_rate: 0,
            walk_spd: row.walk_spd,
            run_spd: row.run_spd,
        };

        Ok(Self {
            id: row.id,
            display_id: row.id_template,
            name: row.name,
            server_side_name: row.server_side_name,
            title: row.title,
            server_side_title: row.server_side_title,
            client_class: row.client_class,
            collision_radius: row.collision_radius,
            collision_height: row.collision_height,
            level: row.level,
            sex: row.sex,
            kind: row.kind,
            race: None,
            stats,
            combat,
            reward_exp: row.exp,
            reward_sp: row.sp,
            rhand: row.rhand,
            lhand: row.lhand,
            enchant: row.enchant,
            drop_herb_group: row.drop_herb_group,
            skills: Vec::new(),
            drop_categories: Vec::new(),
            ai: None,
            minions: Vec::new(),
            teaches: Vec::new(),
            elementals: Elementals::default(),
            hooks: ScriptHooks::default(),
        })
    }

    /// Case-insensitive type tag check
    pub fn is_type(&self, kind: &str) -> bool {
        self.kind.eq_ignore_ascii_case(kind)
    }

    pub fn add_skill(&mut self, skill: SkillInfo) {
        self.skills.push(skill);
    }

    /// File a drop under its category, creating the category on first use
    pub fn add_drop(&mut self, row: &DropRow) {
        let drop = DropData {
            item_id: row.item_id,
            min: row.min,
            max: row.max,
            chance: row.chance,
        };
        match self.drop_categories.iter_mut().find(|c| c.id == row.category) {
            Some(category) => category.drops.push(drop),
            None => self.drop_categories.push(DropCategory {
                id: row.category,
                drops: vec![drop],
            }),
        }
    }

    pub fn drop_count(&self) -> usize {
        self.drop_categories.iter().map(|c| c.drops.len()).sum()
    }

    /// Replace any previous AI descriptor
    pub fn set_ai(&mut self, ai: NpcAiData) {
        self.ai = Some(ai);
    }

    pub fn add_minion(&mut self, row: &MinionRow) {
        self.minions.push(MinionData {
            minion_id: row.minion_id,
            amount_min: row.amount_min,
            amount_max: row.amount_max,
        });
    }

    pub fn add_teach_info(&mut self, class: ClassInfo) {
        self.teaches.push(class);
    }

    /// Whether this NPC teaches skills to the given class
    pub fn teaches_class(&self, class_id: u32) -> bool {
        self.teaches.iter().any(|c| c.id == class_id)
    }

    /// Set the attack element and overwrite all six resists together
    pub fn set_elementals(&mut self, attack: ElementAttack, resists: ElementResists) {
        self.elementals.attack = Some(attack);
        self.elementals.resists = resists;
    }

    /// Main and AI table attributes, keyed by column name, for save-back
    pub fn to_attributes(&self) -> AttributeSet {
        use AttrValue::*;

        let mut attrs = AttributeSet::new();
        attrs.set("id", Int(self.id as i64));
        attrs.set("idTemplate", Int(self.display_id as i64));
        attrs.set("name", Text(self.name.clone()));
        attrs.set("serverSideName", Bool(self.server_side_name));
        attrs.set("title", Text(self.title.clone()));
        attrs.set("serverSideTitle", Bool(self.server_side_title));
        attrs.set("class", Text(self.client_class.clone()));
        attrs.set("collision_radius", Float(self.collision_radius));
        attrs.set("collision_height", Float(self.collision_height));
        attrs.set("level", Int(self.level as i64));
        attrs.set("sex", Text(self.sex.clone()));
        attrs.set("type", Text(self.kind.clone()));
        attrs.set("attackrange", Int(self.combat.attack_range as i64));
        attrs.set("hp", Float(self.combat.hp_max));
        attrs.set("mp", Float(self.combat.mp_max));
        attrs.set("hpreg", Float(self.combat.hp_reg));
        attrs.set("mpreg", Float(self.combat.mp_reg));
        attrs.set("str", Int(self.stats.strength as i64));
        attrs.set("con", Int(self.stats.constitution as i64));
        attrs.set("dex", Int(self.stats.dexterity as i64));
        attrs.set("int", Int(self.stats.intelligence as i64));
        attrs.set("wit", Int(self.stats.wit as i64));
        attrs.set("men", Int(self.stats.mental as i64));
        attrs.set("exp", Int(self.reward_exp));
        attrs.set("sp", Int(self.reward_sp));
        attrs.set("patk", Int(self.combat.p_atk as i64));
        attrs.set("pdef", Int(self.combat.p_def as i64));
        attrs.set("matk", Int(self.combat.m_atk as i64));
        attrs.set("mdef", Int(self.combat.m_def as i64));
        attrs.set("atkspd", Int(self.combat.p_atk_spd as i64));
        attrs.set("matkspd", Int(self.combat.m_atk_spd as i64));
        attrs.set("critical", Int(self.combat.crit_rate as i64));
        attrs.set("rhand", Int(self.rhand as i64));
        attrs.set("lhand", Int(self.lhand as i64));
        attrs.set("enchant", Int(self.enchant as i64));
        attrs.set("walkspd", Int(self.combat.walk_spd as i64));
        attrs.set("runspd", Int(self.combat.run_spd as i64));
        attrs.set("dropHerbGroup", Int(self.drop_herb_group as i64));
        if let Some(ai) = &self.ai {
            attrs.set("aggro", Int(ai.aggro as i64));
            attrs.set("showName", Bool(ai.show_name));
            attrs.set("targetable", Bool(ai.targetable));
        }
        attrs
    }
}

/// Check an ability score against its schema range and apply the policy
fn checked_stat(
    display_id: u32,
    column: &'static str,
    value: i64,
    policy: StatPolicy,
) -> Result<i32, TemplateError> {
    let Some(Rule::Range { min, max }) = schema::NPC.column(column).map(|c| c.rule) else {
        return Ok(value as i32);
    };
    if (min..=max).contains(&value) {
        return Ok(value as i32);
    }

    log::warn!(
        "Loading npc template id: {}: {} = {} outside {}..={} ({:?})",
        display_id, column, value, min, max, policy
    );
    match policy {
        StatPolicy::Keep => Ok(value.clamp(i32::MIN as i64, i32::MAX as i64) as i32),
        StatPolicy::Clamp => Ok(value.clamp(min, max) as i32),
        StatPolicy::Reject => Err(TemplateError::OutOfRange {
            id: display_id,
            column,
            value,
            min,
            max,
        }),
    }
}
