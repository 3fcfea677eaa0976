//! Tag registry
//!
//! Tags live in a slot arena for the process lifetime; everything else
//! refers to them by `TagSlot`. Client-addressable tags are mapped from
//! their numeric id, while the two built-ins (global and active) and any
//! materialised inverses exist only as slots.

use std::collections::HashMap;

use super::ordering::{TagId, TopicSet};

/// Index of a tag inside the arena
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TagSlot(pub(crate) usize);

/// An integer-identified bucket of topics
#[derive(Debug, Default)]
pub struct Tag {
    /// Topics carrying this tag, newest first
    pub topics: TopicSet,
    /// Materialised complement, once the tag has grown dense enough
    pub inverse: Option<TagSlot>,
}

/// Arena of all tags, built-ins included
#[derive(Debug)]
pub struct TagStore {
    slots: Vec<Tag>,
    by_id: HashMap<TagId, TagSlot>,
    global: TagSlot,
    active: TagSlot,
    inverses: Vec<TagSlot>,
}

impl TagStore {
    pub fn new() -> Self {
        let slots = vec![Tag::default(), Tag::default()];
        Self {
            slots,
            by_id: HashMap::new(),
            global: TagSlot(0),
            active: TagSlot(1),
            inverses: Vec::new(),
        }
    }

    /// Slot of the built-in tag holding every live topic
    pub fn global(&self) -> TagSlot {
        self.global
    }

    /// Slot of the built-in tag holding topics with posts in the window
    pub fn active(&self) -> TagSlot {
        self.active
    }

    /// Slots of every materialised inverse tag
    pub fn inverses(&self) -> &[TagSlot] {
        &self.inverses
    }

    /// Look up a client tag without creating it
    pub fn resolve(&self, id: TagId) -> Option<TagSlot> {
        self.by_id.get(&id).copied()
    }

    /// Look up or allocate a client tag
    pub fn get_or_create(&mut self, id: TagId) -> TagSlot {
        if let Some(slot) = self.by_id.get(&id) {
            return *slot;
        }
        let slot = TagSlot(self.slots.len());
        self.slots.push(Tag::default());
        self.by_id.insert(id, slot);
        slot
    }

    /// Allocate an inverse tag for `principal` and link the two
    pub fn alloc_inverse(&mut self, principal: TagSlot) -> TagSlot {
        let slot = TagSlot(self.slots.len());
        self.slots.push(Tag::default());
        self.slots[principal.0].inverse = Some(slot);
        self.inverses.push(slot);
        slot
    }

    pub fn get(&self, slot: TagSlot) -> &Tag {
        &self.slots[slot.0]
    }

    pub fn get_mut(&mut self, slot: TagSlot) -> &mut Tag {
        &mut self.slots[slot.0]
    }

    /// Iterate over client tag ids and their slots
    pub fn iter_ids(&self) -> impl Iterator<Item = (TagId, TagSlot)> + '_ {
        self.by_id.iter().map(|(id, slot)| (*id, *slot))
    }
}

impl Default for TagStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_exist() {
        let store = TagStore::new();
        assert_ne!(store.global(), store.active());
        assert!(store.get(store.global()).topics.is_empty());
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut store = TagStore::new();
        let a = store.get_or_create(7);
        let b = store.get_or_create(7);
        assert_eq!(a, b);
        assert_eq!(store.resolve(7), Some(a));
        assert_eq!(store.resolve(8), None);
    }

    #[test]
    fn test_alloc_inverse_links_principal() {
        let mut store = TagStore::new();
        let principal = store.get_or_create(5);
        let inverse = store.alloc_inverse(principal);
        assert_eq!(store.get(principal).inverse, Some(inverse));
        assert_eq!(store.inverses(), &[inverse]);
        // The inverse itself is not client-addressable
        assert!(store.iter_ids().all(|(_, slot)| slot != inverse));
    }
}
