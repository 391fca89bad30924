use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Dense handle for an interned item. Only meaningful for the arena that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemIndex(pub u32);

impl ItemIndex {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Interns item identifiers so hot loops compare integers instead of strings.
///
/// Indices are never reused. Forgetting an item drops its lookup entry but keeps
/// the slot, so indices held elsewhere keep resolving to the original name.
#[derive(Clone, Debug, Default)]
pub struct ItemArena {
    names: Vec<String>,
    lookup: HashMap<String, ItemIndex>,
}

impl ItemArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an arena whose index order matches the lexicographic order of the items.
    pub fn sorted<'a>(items: impl IntoIterator<Item = &'a str>) -> Self {
        let mut arena = Self::new();
        for item in items.into_iter().collect::<BTreeSet<_>>() {
            arena.intern(item);
        }
        arena
    }

    pub fn intern(&mut self, item: &str) -> ItemIndex {
        if let Some(index) = self.lookup.get(item) {
            return *index;
        }

        debug_assert!(self.names.len() < u32::MAX as usize, "item arena exhausted");
        let index = ItemIndex(self.names.len() as u32);
        self.names.push(item.to_owned());
        self.lookup.insert(item.to_owned(), index);
        index
    }

    pub fn get(&self, item: &str) -> Option<ItemIndex> {
        self.lookup.get(item).copied()
    }

    pub fn resolve(&self, index: ItemIndex) -> &str {
        &self.names[index.as_usize()]
    }

    pub fn forget(&mut self, item: &str) -> Option<ItemIndex> {
        self.lookup.remove(item)
    }

    /// Size of the index space, including forgotten slots.
    pub fn capacity(&self) -> usize {
        self.names.len()
    }

    /// Number of items that can still be looked up by name.
    pub fn live_len(&self) -> usize {
        self.lookup.len()
    }
}
