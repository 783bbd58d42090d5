//! NPC template registry
//!
//! Owns the id → template map for the life of the server. Templates are held
//! behind `Arc` so lookups hand out a complete snapshot of a record; writers
//! replace whole records and never mutate one a reader can see.
//!
//! The multi-value queries walk the map once per requested value, so a
//! template matching two of the values (two overlapping name prefixes, or the
//! same level passed twice) is returned twice.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::template::{HookHandle, HookKind, NpcId, NpcTemplate, MONSTER_KIND, NPC_KIND};

pub type TemplateMap = IndexMap<NpcId, Arc<NpcTemplate>>;

#[derive(Debug, Default)]
pub struct NpcRegistry {
    templates: RwLock<TemplateMap>,
}

impl NpcRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NpcId) -> Option<Arc<NpcTemplate>> {
        self.templates.read().get(&id).cloned()
    }

    /// First template whose name matches, ignoring case (full Unicode
    /// lowercasing, so `Élise` matches `éLISE`)
    pub fn get_by_name(&self, name: &str) -> Option<Arc<NpcTemplate>> {
        let name = name.to_lowercase();
        self.templates
            .read()
            .values()
            .find(|t| t.name.to_lowercase() == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.templates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.read().is_empty()
    }

    pub fn ids(&self) -> Vec<NpcId> {
        self.templates.read().keys().copied().collect()
    }

    /// Insert or replace a template
    pub fn put(&self, template: NpcTemplate) {
        self.templates.write().insert(template.id, Arc::new(template));
    }

    /// Replace a template, carrying over the script hooks of the one it replaces
    pub fn put_preserving_hooks(&self, mut template: NpcTemplate) {
        let mut templates = self.templates.write();
        if let Some(old) = templates.get(&template.id) {
            template.hooks.merge(&old.hooks);
        }
        templates.insert(template.id, Arc::new(template));
    }

    pub fn clear(&self) {
        self.templates.write().clear();
    }

    /// Swap in a complete new set of templates in one step
    pub fn replace_all(&self, templates: impl IntoIterator<Item = NpcTemplate>) {
        let map: TemplateMap = templates
            .into_iter()
            .map(|t| (t.id, Arc::new(t)))
            .collect();
        *self.templates.write() = map;
    }

    /// Register a script hook on a loaded template; false if the id is unknown
    pub fn add_hook(&self, id: NpcId, kind: HookKind, hook: HookHandle) -> bool {
        let mut templates = self.templates.write();
        match templates.get_mut(&id) {
            Some(template) => {
                Arc::make_mut(template).hooks.add(kind, hook);
                true
            }
            None => false,
        }
    }

    fn collect_each<T>(
        &self,
        values: &[T],
        matches: impl Fn(&NpcTemplate, &T) -> bool,
    ) -> Vec<Arc<NpcTemplate>> {
        let templates = self.templates.read();
        let mut list = Vec::new();
        for value in values {
            for template in templates.values() {
                if matches(&**template, value) {
                    list.push(Arc::clone(template));
                }
            }
        }
        list
    }

    pub fn all_of_level(&self, levels: &[u32]) -> Vec<Arc<NpcTemplate>> {
        self.collect_each(levels, |t, level| t.level == *level)
    }

    pub fn all_monsters_of_level(&self, levels: &[u32]) -> Vec<Arc<NpcTemplate>> {
        self.collect_each(levels, |t, level| t.level == *level && t.is_type(MONSTER_KIND))
    }

    /// Plain NPCs whose name starts with any of the prefixes
    pub fn all_npc_starting_with(&self, prefixes: &[&str]) -> Vec<Arc<NpcTemplate>> {
        self.collect_each(prefixes, |t, prefix| t.name.starts_with(prefix) && t.is_type(NPC_KIND))
    }

    pub fn all_of_kind(&self, kinds: &[&str]) -> Vec<Arc<NpcTemplate>> {
        self.collect_each(kinds, |t, kind| t.is_type(kind))
    }
}
