//! Naming Maps
//!
//! Position-based storage breaks down when a loop's items can be inserted,
//! removed or reordered: item N would inherit the storage of whatever used to
//! be item N. A naming map re-anchors storage to an explicit key instead, so
//! each item keeps its own block regardless of where it appears.
//!
//! Entries that go unvisited during a garbage-collecting pass are dropped
//! when the map's scope closes.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use super::node::DataBlock;
use crate::id::{CapturedId, IdInterface, IdKey};

struct NamedEntry {
    block: Rc<DataBlock>,
    last_seen: u64,
}

/// Keyed storage blocks owned by one call site.
#[derive(Default)]
pub struct NamingMap {
    entries: IndexMap<CapturedId, NamedEntry>,
    generation: u64,
}

impl NamingMap {
    /// Start a new pass over the map.
    pub(crate) fn begin_pass(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Look up the block for `key`, creating it on first use.
    pub(crate) fn find_or_create(&mut self, key: &dyn IdInterface) -> Rc<DataBlock> {
        let generation = self.generation;
        if let Some(entry) = self.entries.get_mut(&IdKey(key)) {
            if entry.last_seen == generation {
                tracing::warn!(%key, "named block visited twice in one pass");
            }
            entry.last_seen = generation;
            return entry.block.clone();
        }
        let block = Rc::new(DataBlock::new());
        self.entries.insert(
            CapturedId::new(key),
            NamedEntry {
                block: block.clone(),
                last_seen: generation,
            },
        );
        block
    }

    /// Remove every entry not visited during the current pass. The removed
    /// blocks are handed back so they can be dropped outside of any borrow.
    pub(crate) fn take_unseen(&mut self) -> Vec<Rc<DataBlock>> {
        let generation = self.generation;
        let mut removed = Vec::new();
        self.entries.retain(|_, entry| {
            if entry.last_seen == generation {
                true
            } else {
                removed.push(entry.block.clone());
                false
            }
        });
        removed
    }

    pub(crate) fn clear_cache(&self) {
        for entry in self.entries.values() {
            entry.block.clear_cache();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn blocks(&self) -> impl Iterator<Item = &Rc<DataBlock>> {
        self.entries.values().map(|entry| &entry.block)
    }
}

/// The payload type a naming map is stored under in the data graph.
pub type NamingSlot = RefCell<NamingMap>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::make_id;

    #[test]
    fn same_key_yields_same_block() {
        let mut map = NamingMap::default();
        map.begin_pass();
        let a = map.find_or_create(&make_id("a"));
        let b = map.find_or_create(&make_id("b"));
        assert!(!Rc::ptr_eq(&a, &b));

        map.begin_pass();
        let again = map.find_or_create(&make_id("a"));
        assert!(Rc::ptr_eq(&a, &again));
    }

    #[test]
    fn unseen_entries_are_removed() {
        let mut map = NamingMap::default();
        map.begin_pass();
        map.find_or_create(&make_id(1));
        map.find_or_create(&make_id(2));
        assert!(map.take_unseen().is_empty());

        map.begin_pass();
        map.find_or_create(&make_id(2));
        let removed = map.take_unseen();
        assert_eq!(removed.len(), 1);
        assert_eq!(map.len(), 1);
    }
}
