//! NPC table loader
//!
//! Fills the [`NpcRegistry`] from the store. Templates come from the base
//! `npc` table and, when enabled, the `custom_npc` table on top of it (a custom
//! row replaces the base template for that id outright). Six attach passes then
//! hang skills, drops, teach info, minions, AI and elementals off the templates
//! by parent id.
//!
//! Every pass works on a private working set rather than the live registry.
//! A full reload swaps the finished set in at once; a single-NPC reload
//! publishes just that template. A pass that fails is logged and the remaining
//! passes still run; nothing here panics or aborts the load. A row that does
//! not convert is skipped and counted as rejected. If the npc pass itself
//! fails, a reload publishes nothing and the registry keeps what it had.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::catalog::Catalog;
use super::registry::NpcRegistry;
use super::schema::{AttributeSet, Source, Table};
use super::template::{ElementAttack, ElementKind, ElementResists, NpcAiData, NpcId, NpcTemplate};
use crate::config::Config;
use crate::store::{
    AiRow, DropRow, ElementalRow, MinionRow, NpcStore, Rows, Scope, SkillRow, StoreError, TeachRow,
};

/// Skill id that encodes the NPC's race in its level instead of granting a skill
pub const SKILL_NPC_RACE: u32 = 4416;

/// Templates under construction, in load order
pub type WorkingSet = IndexMap<NpcId, NpcTemplate>;

/// The six passes that attach child rows to loaded templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildPass {
    Skills,
    Drops,
    SkillLearn,
    Minions,
    Ai,
    Elementals,
}

impl ChildPass {
    /// In load order
    pub const ALL: [ChildPass; 6] = [
        ChildPass::Skills,
        ChildPass::Drops,
        ChildPass::SkillLearn,
        ChildPass::Minions,
        ChildPass::Ai,
        ChildPass::Elementals,
    ];

    pub fn table(&self) -> Table {
        match self {
            ChildPass::Skills => Table::Skills,
            ChildPass::Drops => Table::Droplist,
            ChildPass::SkillLearn => Table::SkillLearn,
            ChildPass::Minions => Table::Minions,
            ChildPass::Ai => Table::AiData,
            ChildPass::Elementals => Table::Elementals,
        }
    }

    /// What the summary log line calls the attached rows
    fn noun(&self) -> &'static str {
        match self {
            ChildPass::Skills => "NPC skills",
            ChildPass::Drops => "drops",
            ChildPass::SkillLearn => "Skill Learn",
            ChildPass::Minions => "Minions",
            ChildPass::Ai => "AI Data",
            ChildPass::Elementals => "Elementals Data",
        }
    }

    /// What a row of this pass says about its parent
    fn orphan_message(&self) -> &'static str {
        match self {
            ChildPass::Skills => "Skill data for undefined NPC",
            ChildPass::Drops => "Drop data for undefined NPC",
            ChildPass::SkillLearn => "Skill trainer data for undefined NPC",
            ChildPass::Minions => "Minion references undefined boss NPC",
            ChildPass::Ai => "AI data for undefined NPC",
            ChildPass::Elementals => "Elementals data for undefined NPC",
        }
    }

    fn custom_enabled(&self, config: &Config) -> bool {
        match self {
            ChildPass::Skills => config.custom_npc_skills_table,
            ChildPass::Drops => config.custom_droplist_table,
            ChildPass::Ai | ChildPass::Elementals => config.custom_npc_table,
            ChildPass::SkillLearn | ChildPass::Minions => false,
        }
    }

    /// Sources to read, base first so custom rows land last
    fn sources(&self, config: &Config) -> Vec<Source> {
        let has_custom = self.table().schema().custom.is_some();
        if has_custom && self.custom_enabled(config) {
            vec![Source::Base, Source::Custom]
        } else {
            vec![Source::Base]
        }
    }
}

impl fmt::Display for ChildPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table().schema().base)
    }
}

/// Row counts for one source of one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    /// Rows turned into templates or attached to one
    pub loaded: usize,
    /// Rows whose parent NPC is not loaded
    pub orphans: usize,
    /// Rows naming a skill, item or class the catalog does not know
    pub unresolved: usize,
    /// Rows refused by validation or whose cells did not convert
    pub rejected: usize,
    /// The store call failed
    pub failed: bool,
}

/// Outcome of one pass over base and custom tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub base: Tally,
    pub custom: Tally,
}

impl PassReport {
    fn record(&mut self, source: Source, tally: Tally) {
        match source {
            Source::Base => self.base = tally,
            Source::Custom => self.custom = tally,
        }
    }

    pub fn loaded(&self) -> usize {
        self.base.loaded + self.custom.loaded
    }

    pub fn orphans(&self) -> usize {
        self.base.orphans + self.custom.orphans
    }

    pub fn unresolved(&self) -> usize {
        self.base.unresolved + self.custom.unresolved
    }

    pub fn rejected(&self) -> usize {
        self.base.rejected + self.custom.rejected
    }

    pub fn failed(&self) -> bool {
        self.base.failed || self.custom.failed
    }
}

/// Outcome of a full or single-NPC load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub npcs: PassReport,
    pub skills: PassReport,
    pub drops: PassReport,
    pub skill_learn: PassReport,
    pub minions: PassReport,
    pub ai: PassReport,
    pub elementals: PassReport,
}

impl LoadReport {
    pub fn pass(&self, pass: ChildPass) -> &PassReport {
        match pass {
            ChildPass::Skills => &self.skills,
            ChildPass::Drops => &self.drops,
            ChildPass::SkillLearn => &self.skill_learn,
            ChildPass::Minions => &self.minions,
            ChildPass::Ai => &self.ai,
            ChildPass::Elementals => &self.elementals,
        }
    }

    fn pass_mut(&mut self, pass: ChildPass) -> &mut PassReport {
        match pass {
            ChildPass::Skills => &mut self.skills,
            ChildPass::Drops => &mut self.drops,
            ChildPass::SkillLearn => &mut self.skill_learn,
            ChildPass::Minions => &mut self.minions,
            ChildPass::Ai => &mut self.ai,
            ChildPass::Elementals => &mut self.elementals,
        }
    }

    fn all(&self) -> impl Iterator<Item = &PassReport> {
        std::iter::once(&self.npcs).chain(ChildPass::ALL.into_iter().map(move |p| self.pass(p)))
    }

    pub fn orphans(&self) -> usize {
        self.all().map(PassReport::orphans).sum()
    }

    pub fn unresolved(&self) -> usize {
        self.all().map(PassReport::unresolved).sum()
    }

    pub fn failed_passes(&self) -> usize {
        self.all().filter(|p| p.failed()).count()
    }
}

/// Which table a save-back landed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    pub source: Source,
    pub rows: usize,
}

/// A child row keyed by the NPC it belongs to
trait ChildRow {
    fn parent_id(&self) -> NpcId;
}

macro_rules! child_row {
    ($($row:ty => $field:ident),* $(,)?) => {
        $(impl ChildRow for $row {
            fn parent_id(&self) -> NpcId {
                self.$field
            }
        })*
    };
}

child_row! {
    SkillRow => npc_id,
    DropRow => npc_id,
    TeachRow => npc_id,
    MinionRow => boss_id,
    AiRow => npc_id,
    ElementalRow => npc_id,
}

/// What applying one child row did
enum Applied {
    Attached,
    /// Consumed without attaching anything (the race pseudo-skill)
    Absorbed,
    Unresolved,
}

/// Apply rows to their parent templates, skipping rows that did not convert
/// and rows whose parent is missing
fn attach_rows<R, F>(set: &mut WorkingSet, pass: ChildPass, rows: Rows<R>, mut apply: F) -> Tally
where
    R: ChildRow,
    F: FnMut(&mut NpcTemplate, R) -> Applied,
{
    let mut tally = Tally::default();
    for row in rows {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                log::warn!("Skipping {} row: {}", pass, e);
                tally.rejected += 1;
                continue;
            }
        };
        let parent = row.parent_id();
        let Some(template) = set.get_mut(&parent) else {
            log::warn!("{}. npcId: {} ({})", pass.orphan_message(), parent, pass);
            tally.orphans += 1;
            continue;
        };
        match apply(template, row) {
            Applied::Attached => tally.loaded += 1,
            Applied::Absorbed => {}
            Applied::Unresolved => tally.unresolved += 1,
        }
    }
    tally
}

pub struct NpcLoader<S, C> {
    store: S,
    catalog: C,
    config: Config,
    registry: Arc<NpcRegistry>,
    /// Held for the whole of any reload
    reload_lock: Mutex<()>,
}

impl<S: NpcStore, C: Catalog> NpcLoader<S, C> {
    pub fn new(store: S, catalog: C, config: Config, registry: Arc<NpcRegistry>) -> Self {
        Self {
            store,
            catalog,
            config,
            registry,
            reload_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<NpcRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build templates from one npc table into the working set, replacing
    /// any template already there under the same id
    pub fn load_templates(&self, set: &mut WorkingSet, source: Source, scope: Scope) -> Tally {
        let mut tally = Tally::default();
        let rows = match self.store.npcs(source, scope) {
            Ok(rows) => rows,
            Err(e) => {
                log::error!("Error reading {} npc table for {}: {}", source.name(), scope, e);
                tally.failed = true;
                return tally;
            }
        };

        for row in rows {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    log::warn!("Skipping {} npc row: {}", source.name(), e);
                    tally.rejected += 1;
                    continue;
                }
            };
            match NpcTemplate::from_row(row, self.config.stat_policy) {
                Ok(template) => {
                    set.insert(template.id, template);
                    tally.loaded += 1;
                }
                Err(e) => {
                    log::warn!("Skipping {} npc row: {}", source.name(), e);
                    tally.rejected += 1;
                }
            }
        }
        tally
    }

    pub fn load_base(&self, set: &mut WorkingSet, scope: Scope) -> Tally {
        self.load_templates(set, Source::Base, scope)
    }

    pub fn load_custom_overlay(&self, set: &mut WorkingSet, scope: Scope) -> Tally {
        self.load_templates(set, Source::Custom, scope)
    }

    /// Base templates, then the custom overlay when it is enabled
    pub fn load_npcs(&self, set: &mut WorkingSet, scope: Scope) -> PassReport {
        let mut report = PassReport::default();
        report.record(Source::Base, self.load_base(set, scope));
        if self.config.custom_npc_table {
            report.record(Source::Custom, self.load_custom_overlay(set, scope));
        }
        log::info!(
            "Loaded {} (Custom: {}) NPC template(s).",
            report.base.loaded, report.custom.loaded
        );
        report
    }

    /// Run one attach pass against the working set
    pub fn attach(&self, set: &mut WorkingSet, pass: ChildPass, scope: Scope) -> PassReport {
        let mut report = PassReport::default();
        for source in pass.sources(&self.config) {
            let tally = match self.attach_from(set, pass, source, scope) {
                Ok(tally) => tally,
                Err(e) => {
                    log::error!("Error reading {} ({}) for {}: {}", pass, source.name(), scope, e);
                    Tally { failed: true, ..Default::default() }
                }
            };
            report.record(source, tally);
        }

        match pass {
            ChildPass::SkillLearn | ChildPass::Minions => {
                log::info!("Loaded {} {}.", report.loaded(), pass.noun())
            }
            _ => log::info!(
                "Loaded {} (Custom: {}) {}.",
                report.base.loaded, report.custom.loaded, pass.noun()
            ),
        }
        report
    }

    fn attach_from(
        &self,
        set: &mut WorkingSet,
        pass: ChildPass,
        source: Source,
        scope: Scope,
    ) -> Result<Tally, StoreError> {
        let tally = match pass {
            ChildPass::Skills => {
                let rows = self.store.skills(source, scope)?;
                attach_rows(set, pass, rows, |npc, row| self.apply_skill(npc, row))
            }
            ChildPass::Drops => {
                let rows = self.store.drops(source, scope)?;
                attach_rows(set, pass, rows, |npc, row| self.apply_drop(npc, row))
            }
            ChildPass::SkillLearn => {
                let rows = self.store.skill_learn(scope)?;
                attach_rows(set, pass, rows, |npc, row| self.apply_teach(npc, row))
            }
            ChildPass::Minions => {
                let rows = self.store.minions(scope)?;
                attach_rows(set, pass, rows, |npc, row| {
                    npc.add_minion(&row);
                    Applied::Attached
                })
            }
            ChildPass::Ai => {
                let rows = self.store.ai_data(source, scope)?;
                attach_rows(set, pass, rows, |npc, row| {
                    npc.set_ai(NpcAiData::from(row));
                    Applied::Attached
                })
            }
            ChildPass::Elementals => {
                let rows = self.store.elementals(source, scope)?;
                attach_rows(set, pass, rows, apply_elementals)
            }
        };
        Ok(tally)
    }

    fn apply_skill(&self, npc: &mut NpcTemplate, row: SkillRow) -> Applied {
        if row.skill_id == SKILL_NPC_RACE {
            npc.race = Some(row.level);
            return Applied::Absorbed;
        }
        match self.catalog.skill(row.skill_id, row.level) {
            Some(skill) => {
                npc.add_skill(skill);
                Applied::Attached
            }
            None => {
                log::warn!(
                    "Skill data for undefined skill! NpcId: {} skillId: {} level: {}",
                    npc.id, row.skill_id, row.level
                );
                Applied::Unresolved
            }
        }
    }

    fn apply_drop(&self, npc: &mut NpcTemplate, row: DropRow) -> Applied {
        if !self.catalog.has_item(row.item_id) {
            log::warn!(
                "Drop data for undefined item template! NpcId: {} itemId: {}",
                npc.id, row.item_id
            );
            return Applied::Unresolved;
        }
        npc.add_drop(&row);
        Applied::Attached
    }

    fn apply_teach(&self, npc: &mut NpcTemplate, row: TeachRow) -> Applied {
        match self.catalog.class(row.class_id) {
            Some(class) => {
                npc.add_teach_info(class);
                Applied::Attached
            }
            None => {
                log::warn!(
                    "Skill trainer data for undefined class! NpcId: {} classId: {}",
                    npc.id, row.class_id
                );
                Applied::Unresolved
            }
        }
    }

    fn attach_all(&self, set: &mut WorkingSet, scope: Scope, report: &mut LoadReport) {
        for pass in ChildPass::ALL {
            *report.pass_mut(pass) = self.attach(set, pass, scope);
        }
    }

    /// Build every template and attach all child rows, without publishing
    pub fn build(&self, scope: Scope) -> (WorkingSet, LoadReport) {
        let mut set = WorkingSet::new();
        let mut report = LoadReport::default();
        report.npcs = self.load_npcs(&mut set, scope);
        self.attach_all(&mut set, scope, &mut report);
        (set, report)
    }

    /// Rebuild the whole registry. Readers keep seeing the previous
    /// templates until the new set is swapped in. Script hooks are not
    /// carried over. If the npc tables cannot be read the previous templates
    /// stay in place.
    pub fn reload_all(&self) -> LoadReport {
        let _guard = self.reload_lock.lock();
        let (set, report) = self.build(Scope::All);
        if report.npcs.failed() {
            log::error!(
                "Could not read the npc tables, keeping the {} NPC template(s) already loaded.",
                self.registry.len()
            );
            return report;
        }
        self.registry.replace_all(set.into_values());
        log::info!(
            "Registry holds {} NPC template(s) ({} orphan rows, {} unresolved references, {} failed passes).",
            self.registry.len(),
            report.orphans(),
            report.unresolved(),
            report.failed_passes()
        );
        report
    }

    /// Reload one NPC and its child rows, keeping its script hooks
    pub fn reload_one(&self, id: NpcId) -> LoadReport {
        let scope = Scope::from_id(id);
        if scope == Scope::All {
            return self.reload_all();
        }

        let _guard = self.reload_lock.lock();
        let mut set = WorkingSet::new();
        let mut report = LoadReport::default();
        report.npcs = self.load_npcs(&mut set, scope);
        if report.npcs.failed() {
            log::error!("Could not read the npc tables for NPC {}, keeping current template.", id);
            return report;
        }
        if set.is_empty() {
            log::warn!(
                "Could not reload data for NPC {}: no npc row loaded, keeping current template.",
                id
            );
            return report;
        }

        self.attach_all(&mut set, scope, &mut report);
        for template in set.into_values() {
            self.registry.put_preserving_hooks(template);
        }
        log::info!("Reloaded NPC {}.", id);
        report
    }

    /// Write attributes back to the npc and AI tables. With the custom table
    /// enabled the custom rows are tried first; the base tables are written
    /// only if no custom npc row was updated.
    pub fn save_template(&self, id: NpcId, attributes: &AttributeSet) -> Result<SaveOutcome, StoreError> {
        let (main, ai) = attributes.partition();

        if self.config.custom_npc_table {
            let rows = self.store.update(Table::Npc, Source::Custom, id, &main)?;
            self.store.update(Table::AiData, Source::Custom, id, &ai)?;
            if rows > 0 {
                log::info!("Saved NPC {} to custom tables.", id);
                return Ok(SaveOutcome { source: Source::Custom, rows });
            }
        }

        let rows = self.store.update(Table::Npc, Source::Base, id, &main)?;
        self.store.update(Table::AiData, Source::Base, id, &ai)?;
        log::info!("Saved NPC {} to base tables ({} row(s)).", id, rows);
        Ok(SaveOutcome { source: Source::Base, rows })
    }
}

fn apply_elementals(npc: &mut NpcTemplate, row: ElementalRow) -> Applied {
    let Some(kind) = ElementKind::from_code(row.attack_type) else {
        log::error!(
            "Elementals Error with id : {}; unknown elementType: {}",
            npc.id, row.attack_type
        );
        return Applied::Unresolved;
    };
    let attack = ElementAttack { kind, value: row.attack_value };
    npc.set_elementals(attack, ElementResists::from(&row));
    Applied::Attached
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use super::*;
    use crate::config::StatPolicy;
    use crate::data::catalog::StaticCatalog;
    use crate::data::schema::AttrValue;
    use crate::data::template::{HookKind, ScriptHook};
    use crate::store::sqlite::test_store;
    use crate::store::SqliteStore;

    const SEED: &str = r#"
        INSERT INTO npc (id, idTemplate, name, level, type, hp, str) VALUES (1, 1, 'Gremlin', 1, 'L2Monster', 62, 40);
        INSERT INTO npc (id, idTemplate, name, level, type, hp, str) VALUES (2, 2, 'Rabbit', 2, 'L2Monster', 80, 10);
        INSERT INTO npc (id, idTemplate, name, level, type, hp, str) VALUES (3, 3, 'Roxxy', 1, 'L2Npc', 2444, 40);
        INSERT INTO custom_npc (id, idTemplate, name, level, type, hp, str) VALUES (2, 2, 'Killer Rabbit', 80, 'L2Monster', 9000, 90);

        INSERT INTO npcskills (npcid, skillid, level) VALUES (1, 4001, 1);
        INSERT INTO npcskills (npcid, skillid, level) VALUES (1, 4416, 3);
        INSERT INTO npcskills (npcid, skillid, level) VALUES (1, 9999, 1);
        INSERT INTO npcskills (npcid, skillid, level) VALUES (42, 4001, 1);
        INSERT INTO custom_npcskills (npcid, skillid, level) VALUES (2, 4002, 1);

        INSERT INTO droplist (mobId, itemId, min, max, category, chance) VALUES (1, 57, 1, 5, 0, 700000);
        INSERT INTO droplist (mobId, itemId, min, max, category, chance) VALUES (1, 1060, 1, 1, 1, 90000);
        INSERT INTO droplist (mobId, itemId, min, max, category, chance) VALUES (1, 77777, 1, 1, 1, 10);
        INSERT INTO droplist (mobId, itemId, min, max, category, chance) VALUES (404, 57, 1, 1, 0, 10);

        INSERT INTO skill_learn (npc_id, class_id) VALUES (3, 10);
        INSERT INTO skill_learn (npc_id, class_id) VALUES (3, 250);
        INSERT INTO skill_learn (npc_id, class_id) VALUES (500, 10);

        INSERT INTO minions (boss_id, minion_id, amount_min, amount_max) VALUES (2, 1, 2, 4);
        INSERT INTO minions (boss_id, minion_id, amount_min, amount_max) VALUES (600, 1, 1, 1);

        INSERT INTO npcaidata (npcId, aggro, canMove, showName, targetable, clan) VALUES (1, 300, 1, 1, 1, 'gremlin_clan');
        INSERT INTO npcaidata (npcId, aggro, showName, targetable) VALUES (2, 0, 1, 1);
        INSERT INTO custom_npcaidata (npcId, aggro, showName, targetable) VALUES (2, 1000, 1, 1);

        INSERT INTO npc_elementals (npc_id, elemAtkType, elemAtkValue, fireDefValue, waterDefValue, windDefValue, earthDefValue, holyDefValue, darkDefValue)
            VALUES (1, 1, 50, 11, 12, 13, 14, 15, 16);
        INSERT INTO npc_elementals (npc_id, elemAtkType, elemAtkValue, fireDefValue) VALUES (3, 9, 50, 99);
    "#;

    fn catalog() -> StaticCatalog {
        let mut catalog = StaticCatalog::default();
        catalog.add_skill(4001, 1, "Wind Strike");
        catalog.add_skill(4002, 1, "Bite");
        catalog.add_item(57);
        catalog.add_item(1060);
        catalog.add_class(10, "Mage");
        catalog
    }

    fn loader_with(seed: &str, config: Config) -> NpcLoader<SqliteStore, StaticCatalog> {
        NpcLoader::new(test_store(seed), catalog(), config, Arc::new(NpcRegistry::new()))
    }

    fn loader(custom: bool) -> NpcLoader<SqliteStore, StaticCatalog> {
        let config = Config {
            custom_npc_table: custom,
            custom_npc_skills_table: custom,
            custom_droplist_table: custom,
            ..Config::default()
        };
        loader_with(SEED, config)
    }

    #[derive(Debug)]
    struct QuestHook;

    impl ScriptHook for QuestHook {
        fn name(&self) -> &str {
            "Q00255_Tutorial"
        }
    }

    #[test]
    fn test_base_only() {
        let loader = loader(false);
        let report = loader.reload_all();
        let registry = loader.registry();

        assert_eq!(report.npcs.base.loaded, 3);
        assert_eq!(report.npcs.custom, Tally::default());
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get(2).unwrap().name, "Rabbit");
    }

    #[test]
    fn test_custom_overlay_replaces_base() {
        let loader = loader(true);
        let report = loader.reload_all();
        let registry = loader.registry();

        assert_eq!(report.npcs.base.loaded, 3);
        assert_eq!(report.npcs.custom.loaded, 1);
        assert_eq!(registry.len(), 3);

        let rabbit = registry.get(2).unwrap();
        assert_eq!(rabbit.name, "Killer Rabbit");
        assert_eq!(rabbit.level, 80);
        assert_eq!(rabbit.stats.strength, 90);
        assert_eq!(rabbit.combat.hp_max, 9000.0);

        assert_eq!(registry.get(1).unwrap().name, "Gremlin");
        assert_eq!(registry.get(3).unwrap().name, "Roxxy");

        // Id 1 and id 3 share level 1; id 2 is found at its custom level
        let ids: Vec<NpcId> = registry.all_of_level(&[1, 80]).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
        let ids: Vec<NpcId> = registry.all_of_level(&[80, 80]).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 2]);
    }

    #[test]
    fn test_skills_pass() {
        let loader = loader(true);
        let report = loader.reload_all();
        let gremlin = loader.registry().get(1).unwrap();

        // 4001 attached, 4416 sets race, 9999 unknown, npc 42 missing
        assert_eq!(gremlin.skills.len(), 1);
        assert_eq!(gremlin.skills[0].name, "Wind Strike");
        assert_eq!(gremlin.race, Some(3));
        assert_eq!(report.skills.base.loaded, 1);
        assert_eq!(report.skills.base.unresolved, 1);
        assert_eq!(report.skills.base.orphans, 1);
        assert_eq!(report.skills.custom.loaded, 1);
        assert_eq!(loader.registry().get(2).unwrap().skills[0].name, "Bite");
    }

    #[test]
    fn test_drops_pass() {
        let loader = loader(false);
        let report = loader.reload_all();
        let gremlin = loader.registry().get(1).unwrap();

        assert_eq!(report.drops.base.loaded, 2);
        assert_eq!(report.drops.base.unresolved, 1);
        assert_eq!(report.drops.base.orphans, 1);
        assert_eq!(gremlin.drop_count(), 2);
        // Highest chance first, category of the first row seen first
        assert_eq!(gremlin.drop_categories[0].id, 0);
        assert_eq!(gremlin.drop_categories[1].drops[0].item_id, 1060);
    }

    #[test]
    fn test_orphans_never_create_templates() {
        let loader = loader(false);
        let report = loader.reload_all();
        let registry = loader.registry();

        assert_eq!(registry.len(), 3);
        for id in [42, 404, 500, 600] {
            assert!(registry.get(id).is_none());
        }
        assert_eq!(report.skill_learn.base.orphans, 1);
        assert_eq!(report.minions.base.orphans, 1);
        assert_eq!(report.orphans(), 4);
    }

    #[test]
    fn test_teach_minion_ai_passes() {
        let loader = loader(true);
        let report = loader.reload_all();
        let registry = loader.registry();

        let roxxy = registry.get(3).unwrap();
        assert!(roxxy.teaches_class(10));
        assert!(!roxxy.teaches_class(250));
        assert_eq!(report.skill_learn.base.unresolved, 1);

        let rabbit = registry.get(2).unwrap();
        assert_eq!(rabbit.minions.len(), 1);
        assert_eq!(rabbit.minions[0].amount_max, 4);

        // Custom AI row replaces the base one
        assert_eq!(rabbit.ai.as_ref().unwrap().aggro, 1000);
        assert_eq!(report.ai.base.loaded, 2);
        assert_eq!(report.ai.custom.loaded, 1);

        let gremlin_ai = registry.get(1).unwrap().ai.clone().unwrap();
        assert!(gremlin_ai.can_move);
        assert_eq!(gremlin_ai.clan.as_deref(), Some("gremlin_clan"));
        assert_eq!(gremlin_ai.enemy_clan, None);
    }

    #[test]
    fn test_elementals_pass() {
        let loader = loader(false);
        let report = loader.reload_all();
        let registry = loader.registry();

        let gremlin = registry.get(1).unwrap();
        assert_eq!(gremlin.elementals.attack_value(ElementKind::Water), 50);
        assert_eq!(gremlin.elementals.attack_value(ElementKind::Fire), 0);
        assert_eq!(
            gremlin.elementals.resists,
            ElementResists { fire: 11, water: 12, wind: 13, earth: 14, holy: 15, dark: 16 }
        );

        // Unknown element type: row skipped, resists untouched
        let roxxy = registry.get(3).unwrap();
        assert_eq!(roxxy.elementals.attack, None);
        assert_eq!(roxxy.elementals.resists.fire, 20);
        assert_eq!(report.elementals.base.unresolved, 1);
    }

    #[test]
    fn test_reload_one_preserves_hooks() {
        let loader = loader(false);
        loader.reload_all();
        let registry = loader.registry();
        assert!(registry.add_hook(1, HookKind::Kill, Arc::new(QuestHook)));

        loader
            .store()
            .execute_batch("UPDATE npc SET name = 'Gremlin Prime' WHERE id = 1;")
            .unwrap();
        let report = loader.reload_one(1);

        let gremlin = registry.get(1).unwrap();
        assert_eq!(gremlin.name, "Gremlin Prime");
        assert_eq!(gremlin.hooks.get(HookKind::Kill)[0].name(), "Q00255_Tutorial");
        // Child rows are rebuilt, not appended to the old record
        assert_eq!(gremlin.skills.len(), 1);
        assert_eq!(gremlin.drop_count(), 2);
        assert_eq!(report.npcs.base.loaded, 1);
        assert_eq!(report.drops.base.orphans, 0);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_reload_all_drops_hooks() {
        let loader = loader(false);
        loader.reload_all();
        let registry = loader.registry();
        registry.add_hook(1, HookKind::Kill, Arc::new(QuestHook));

        loader.reload_all();
        assert!(registry.get(1).unwrap().hooks.is_empty());
    }

    #[test]
    fn test_reload_one_missing_row_keeps_template() {
        let loader = loader(false);
        loader.reload_all();
        loader.store().execute_batch("DELETE FROM npc WHERE id = 3;").unwrap();

        let report = loader.reload_one(3);
        assert_eq!(report.npcs.loaded(), 0);
        assert_eq!(report.skill_learn, PassReport::default());
        assert_eq!(loader.registry().get(3).unwrap().name, "Roxxy");
    }

    #[test]
    fn test_reload_one_new_npc() {
        let loader = loader(false);
        loader.reload_all();
        loader
            .store()
            .execute_batch("INSERT INTO npc (id, idTemplate, name, level, type) VALUES (600, 600, 'Queen Ant', 40, 'L2RaidBoss');")
            .unwrap();

        let report = loader.reload_one(600);
        let queen = loader.registry().get(600).unwrap();
        assert_eq!(queen.minions.len(), 1);
        assert_eq!(report.minions.base.loaded, 1);
        assert_eq!(loader.registry().len(), 4);
    }

    #[test]
    fn test_failed_pass_does_not_stop_load() {
        let loader = loader(false);
        loader.store().execute_batch("DROP TABLE droplist;").unwrap();

        let report = loader.reload_all();
        assert!(report.drops.failed());
        assert_eq!(report.failed_passes(), 1);
        assert_eq!(loader.registry().len(), 3);
        assert_eq!(loader.registry().get(1).unwrap().skills.len(), 1);
        assert_eq!(loader.registry().get(1).unwrap().drop_count(), 0);
    }

    #[test]
    fn test_rejected_rows() {
        let config = Config { stat_policy: StatPolicy::Reject, ..Config::default() };
        let loader = loader_with(
            "INSERT INTO npc (id, idTemplate, name, level, str) VALUES (1, 1, 'Ok', 1, 50);
             INSERT INTO npc (id, idTemplate, name, level, str) VALUES (2, 2, 'Brute', 1, 250);",
            config,
        );
        let report = loader.reload_all();
        assert_eq!(report.npcs.base.loaded, 1);
        assert_eq!(report.npcs.base.rejected, 1);
        assert!(loader.registry().get(2).is_none());
    }

    #[test]
    fn test_save_prefers_custom() {
        let loader = loader(true);
        let mut attrs = AttributeSet::new();
        attrs.set("npcId", AttrValue::Int(2));
        attrs.set("name", AttrValue::Text("Vorpal Rabbit".to_string()));
        attrs.set("aggro", AttrValue::Int(50));

        let outcome = loader.save_template(2, &attrs).unwrap();
        assert_eq!(outcome, SaveOutcome { source: Source::Custom, rows: 1 });

        loader.reload_one(2);
        let rabbit = loader.registry().get(2).unwrap();
        assert_eq!(rabbit.name, "Vorpal Rabbit");
        assert_eq!(rabbit.ai.as_ref().unwrap().aggro, 50);

        let base = loader.store().npcs(Source::Base, Scope::One(2)).unwrap();
        assert_eq!(base[0].as_ref().unwrap().name, "Rabbit");
    }

    #[test]
    fn test_save_falls_back_to_base() {
        let loader = loader(true);
        let mut attrs = AttributeSet::new();
        attrs.set("level", AttrValue::Int(9));
        attrs.set("showName", AttrValue::Bool(false));

        let outcome = loader.save_template(1, &attrs).unwrap();
        assert_eq!(outcome, SaveOutcome { source: Source::Base, rows: 1 });

        let npc = loader.store().npcs(Source::Base, Scope::One(1)).unwrap();
        assert_eq!(npc[0].as_ref().unwrap().level, 9);
        let ai = loader.store().ai_data(Source::Base, Scope::One(1)).unwrap();
        assert!(!ai[0].as_ref().unwrap().show_name);
    }

    #[test]
    fn test_save_round_trip() {
        let loader = loader(false);
        loader.reload_all();
        let before = loader.registry().get(1).unwrap();

        let outcome = loader.save_template(1, &before.to_attributes()).unwrap();
        assert_eq!(outcome.rows, 1);

        loader.reload_one(1);
        let after = loader.registry().get(1).unwrap();
        assert_eq!(after.name, before.name);
        assert_eq!(after.stats, before.stats);
        assert_eq!(after.combat, before.combat);
    }

    #[test]
    fn test_bad_npc_row_skipped() {
        let loader = loader_with(
            "INSERT INTO npc (id, idTemplate, name) VALUES (1, 1, 'A');
             INSERT INTO npc (id, idTemplate, name, rhand) VALUES (2, 2, 'B', -1);",
            Config::default(),
        );
        let report = loader.reload_all();

        assert_eq!(report.npcs.base.loaded, 1);
        assert_eq!(report.npcs.base.rejected, 1);
        assert!(!report.npcs.failed());
        assert_eq!(loader.registry().len(), 1);
        assert_eq!(loader.registry().get(1).unwrap().name, "A");
    }

    #[test]
    fn test_negative_element_code_skips_one_row() {
        let loader = loader_with(
            "INSERT INTO npc (id, idTemplate, name) VALUES (1, 1, 'A');
             INSERT INTO npc (id, idTemplate, name) VALUES (3, 3, 'C');
             INSERT INTO npc_elementals (npc_id, elemAtkType, elemAtkValue) VALUES (1, 1, 50);
             INSERT INTO npc_elementals (npc_id, elemAtkType, elemAtkValue) VALUES (3, -1, 0);",
            Config::default(),
        );
        let report = loader.reload_all();

        assert!(!report.elementals.failed());
        assert_eq!(report.elementals.base.loaded, 1);
        assert_eq!(report.elementals.base.unresolved, 1);
        let a = loader.registry().get(1).unwrap();
        assert_eq!(a.elementals.attack_value(ElementKind::Water), 50);
        assert_eq!(loader.registry().get(3).unwrap().elementals.attack, None);
    }

    #[test]
    fn test_null_clan_attaches_ai() {
        let loader = loader_with(
            "INSERT INTO npc (id, idTemplate, name) VALUES (1, 1, 'A');
             INSERT INTO npcaidata (npcId, aggro, clan, enemyClan) VALUES (1, 300, NULL, NULL);",
            Config::default(),
        );
        let report = loader.reload_all();

        assert_eq!(report.ai.base.loaded, 1);
        assert_eq!(report.ai.base.rejected, 0);
        let ai = loader.registry().get(1).unwrap().ai.clone().unwrap();
        assert_eq!(ai.aggro, 300);
        assert_eq!(ai.clan, None);
        assert_eq!(ai.enemy_clan, None);
    }

    #[test]
    fn test_bad_child_row_counted_rejected() {
        let loader = loader_with(
            "INSERT INTO npc (id, idTemplate, name) VALUES (1, 1, 'A');
             INSERT INTO droplist (mobId, itemId, min, max, category, chance) VALUES (1, 57, 1, 1, 0, 100);
             INSERT INTO droplist (mobId, itemId, min, max, category, chance) VALUES (1, 57, -3, 1, 0, 100);",
            Config::default(),
        );
        let report = loader.reload_all();

        assert_eq!(report.drops.base.loaded, 1);
        assert_eq!(report.drops.base.rejected, 1);
        assert_eq!(loader.registry().get(1).unwrap().drop_count(), 1);
    }

    #[test]
    fn test_reload_all_keeps_registry_when_npc_table_fails() {
        let loader = loader(false);
        loader.reload_all();
        loader.registry().add_hook(1, HookKind::Kill, Arc::new(QuestHook));
        loader.store().execute_batch("DROP TABLE npc;").unwrap();

        let report = loader.reload_all();
        assert!(report.npcs.failed());
        assert_eq!(loader.registry().len(), 3);
        let gremlin = loader.registry().get(1).unwrap();
        assert_eq!(gremlin.name, "Gremlin");
        assert_eq!(gremlin.hooks.len(), 1);

        let report = loader.reload_one(1);
        assert!(report.npcs.failed());
        assert_eq!(loader.registry().get(1).unwrap().name, "Gremlin");
    }

    #[test]
    fn test_reloads_race_with_readers() {
        let loader = loader(false);
        loader.reload_all();
        loader
            .store()
            .execute_batch("INSERT INTO npc (id, idTemplate, name, level, type) VALUES (600, 600, 'Queen Ant', 40, 'L2RaidBoss');")
            .unwrap();

        let loader = &loader;
        let done = AtomicBool::new(false);
        let done = &done;
        thread::scope(|s| {
            let readers: Vec<_> = (0..3)
                .map(|_| {
                    s.spawn(move || {
                        let registry = loader.registry();
                        while !done.load(Ordering::Acquire) {
                            let len = registry.len();
                            assert!(len == 3 || len == 4, "saw {} templates", len);

                            let gremlin = registry.get(1).expect("gremlin missing mid-reload");
                            assert_eq!(gremlin.skills.len(), 1);
                            assert_eq!(gremlin.drop_count(), 2);

                            let ids: Vec<NpcId> = registry.all_of_level(&[1]).iter().map(|t| t.id).collect();
                            assert_eq!(ids, vec![1, 3]);
                        }
                    })
                })
                .collect();

            let full = s.spawn(move || {
                for _ in 0..25 {
                    loader.reload_all();
                }
            });
            let single = s.spawn(move || {
                for _ in 0..25 {
                    loader.reload_one(1);
                }
            });
            let writers = [full.join(), single.join()];
            done.store(true, Ordering::Release);
            for reader in readers {
                reader.join().unwrap();
            }
            for writer in writers {
                writer.unwrap();
            }
        });

        assert_eq!(loader.registry().len(), 4);
    }

    #[test]
    fn test_hooks_survive_concurrent_reload_one() {
        let loader = loader(false);
        loader.reload_all();
        assert!(loader.registry().add_hook(1, HookKind::Kill, Arc::new(QuestHook)));

        let loader = &loader;
        let done = AtomicBool::new(false);
        let done = &done;
        thread::scope(|s| {
            let reader = s.spawn(move || {
                while !done.load(Ordering::Acquire) {
                    let gremlin = loader.registry().get(1).expect("gremlin missing mid-reload");
                    assert_eq!(gremlin.hooks.len(), 1);
                }
            });
            let writers: Vec<_> = (0..2)
                .map(|_| {
                    s.spawn(move || {
                        for _ in 0..25 {
                            loader.reload_one(1);
                        }
                    })
                })
                .collect();
            let results: Vec<_> = writers.into_iter().map(|w| w.join()).collect();
            done.store(true, Ordering::Release);
            reader.join().unwrap();
            for result in results {
                result.unwrap();
            }
        });

        let gremlin = loader.registry().get(1).unwrap();
        assert_eq!(gremlin.hooks.get(HookKind::Kill)[0].name(), "Q00255_Tutorial");
    }
}
