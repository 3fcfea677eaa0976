//! Word registry
//!
//! Words come from full-text replacement events. The text-to-slot map is a
//! `BTreeMap` so that wildcard compilation can scan an alphabetical range
//! starting at a prefix's lower bound.

use std::collections::BTreeMap;
use std::ops::Bound;

use super::ordering::TopicSet;

/// Index of a word inside the arena
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct WordSlot(pub(crate) usize);

/// A canonical token indexing topics
#[derive(Debug, Default)]
pub struct Word {
    /// Topics whose text contains this word, newest first
    pub topics: TopicSet,
}

/// Arena of all words seen so far
#[derive(Debug, Default)]
pub struct WordStore {
    slots: Vec<Word>,
    by_text: BTreeMap<String, WordSlot>,
}

impl WordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a word without creating it
    pub fn resolve(&self, text: &str) -> Option<WordSlot> {
        self.by_text.get(text).copied()
    }

    /// Look up or allocate a word
    pub fn get_or_create(&mut self, text: &str) -> WordSlot {
        if let Some(slot) = self.by_text.get(text) {
            return *slot;
        }
        let slot = WordSlot(self.slots.len());
        self.slots.push(Word::default());
        self.by_text.insert(text.to_string(), slot);
        slot
    }

    pub fn get(&self, slot: WordSlot) -> &Word {
        &self.slots[slot.0]
    }

    pub fn get_mut(&mut self, slot: WordSlot) -> &mut Word {
        &mut self.slots[slot.0]
    }

    /// Number of distinct words
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Walk the dictionary from the prefix's lower bound, yielding every
    /// word starting with it
    pub fn prefix_range<'a>(
        &'a self,
        prefix: &str,
    ) -> impl Iterator<Item = (&'a str, WordSlot)> + 'a {
        let needle = prefix.to_owned();
        self.by_text
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(text, _)| text.starts_with(needle.as_str()))
            .map(|(text, slot)| (text.as_str(), *slot))
    }
}
