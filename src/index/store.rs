//! Central index store
//!
//! Owns the three registries (topics by id, tags, words) and applies every
//! mutation against them. All methods assume the caller already holds the
//! appropriate lease; the store itself is lock-free. Mutations keep two
//! linked structures consistent at every step:
//!
//! - membership is symmetric: a topic key sits in a tag's (or word's)
//!   ordered set exactly when the tag (or word) slot sits on the topic;
//! - ordered sets key on `(ts, id)`, so any timestamp change goes through
//!   `reindex`, which extracts the topic from every set it participates in
//!   before the change and reinserts it afterwards.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::config::IndexConfig;

use super::ordering::{TagId, Timestamp, TopicId, TopicKey, TopicSet, UserId};
use super::tag::{TagSlot, TagStore};
use super::topic::Topic;
use super::word::{WordSlot, WordStore};

/// The whole in-memory index
#[derive(Debug)]
pub struct IndexStore {
    config: IndexConfig,
    topics: HashMap<TopicId, Topic>,
    tags: TagStore,
    words: WordStore,
}

impl IndexStore {
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            topics: HashMap::new(),
            tags: TagStore::new(),
            words: WordStore::new(),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Number of live topics
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn topic(&self, id: TopicId) -> Option<&Topic> {
        self.topics.get(&id)
    }

    /// Ordered set behind the built-in tag holding every topic
    pub fn global_topics(&self) -> &TopicSet {
        &self.tags.get(self.tags.global()).topics
    }

    /// Ordered set behind the built-in tag of recently posted-in topics
    pub fn active_topics(&self) -> &TopicSet {
        &self.tags.get(self.tags.active()).topics
    }

    /// Ordered set of a client tag, if the tag has ever been referenced
    pub fn tag_topics(&self, id: TagId) -> Option<&TopicSet> {
        self.tags.resolve(id).map(|slot| &self.tags.get(slot).topics)
    }

    /// Ordered set of a client tag's materialised inverse, if any
    pub fn tag_inverse_topics(&self, id: TagId) -> Option<&TopicSet> {
        let slot = self.tags.resolve(id)?;
        let inverse = self.tags.get(slot).inverse?;
        Some(&self.tags.get(inverse).topics)
    }

    /// Ordered set of a word, if it has ever been indexed
    pub fn word_topics(&self, text: &str) -> Option<&TopicSet> {
        self.words.resolve(text).map(|slot| &self.words.get(slot).topics)
    }

    /// Ordered sets of every word starting with `prefix`, dictionary order
    pub fn word_topics_with_prefix<'a>(
        &'a self,
        prefix: &str,
    ) -> impl Iterator<Item = &'a TopicSet> + 'a {
        self.words
            .prefix_range(prefix)
            .map(|(_, slot)| &self.words.get(slot).topics)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Allocate a topic unless the id is already known.
    ///
    /// New topics join the global tag and every existing inverse tag: a
    /// topic that nobody has tagged yet is by definition outside every
    /// principal.
    pub fn create_topic(&mut self, id: TopicId, ts: Timestamp) {
        if self.topics.contains_key(&id) {
            return;
        }
        let mut topic = Topic::new(id, ts);
        let key = topic.key();

        topic.tags.insert(self.tags.global());
        self.tags.get_mut(self.tags.global()).topics.insert(key);
        let inverses: Vec<TagSlot> = self.tags.inverses().to_vec();
        for slot in inverses {
            topic.tags.insert(slot);
            self.tags.get_mut(slot).topics.insert(key);
        }

        self.topics.insert(id, topic);
        debug!(id, ts, "topic created");
    }

    /// Raise a topic's timestamp and record a post against its window.
    ///
    /// Unknown ids are ignored; a stale timestamp skips the re-index but
    /// still counts the post while the topic is young enough.
    pub fn bump_topic(&mut self, id: TopicId, ts: Timestamp, user: UserId, now: Timestamp) {
        if !self.topics.contains_key(&id) {
            return;
        }
        self.reindex(id, ts);

        let active = self.tags.active();
        let Some(topic) = self.topics.get_mut(&id) else {
            return;
        };
        if now.saturating_sub(topic.created) < self.config.topic_cutoff_secs {
            topic.push_post(ts, user);
            if !topic.tags.contains(&active) {
                let key = topic.key();
                topic.tags.insert(active);
                self.tags.get_mut(active).topics.insert(key);
            }
        }
    }

    /// Attach tags to a topic, creating the topic and any unseen tags.
    pub fn add_tags(&mut self, id: TopicId, ts: Timestamp, tag_ids: &[TagId]) {
        self.get_or_create_topic(id, ts);

        for &tag_id in tag_ids {
            let slot = self.tags.get_or_create(tag_id);
            let carried = self
                .topics
                .get(&id)
                .is_some_and(|topic| topic.tags.contains(&slot));
            if carried {
                continue;
            }

            if let Some(inverse) = self.tags.get(slot).inverse {
                // Once an inverse exists every topic sits on one side or
                // the other; move it across.
                self.unlink_tag(id, inverse);
                self.link_tag(id, slot);
            } else {
                self.link_tag(id, slot);
                self.maybe_materialise_inverse(slot);
            }
        }
    }

    /// Detach a tag from a topic; with an inverse materialised the topic
    /// crosses over to the complement.
    pub fn remove_tag(&mut self, id: TopicId, tag_id: TagId) {
        let Some(slot) = self.tags.resolve(tag_id) else {
            return;
        };
        let carried = self
            .topics
            .get(&id)
            .is_some_and(|topic| topic.tags.contains(&slot));
        if !carried {
            return;
        }
        self.unlink_tag(id, slot);
        if let Some(inverse) = self.tags.get(slot).inverse {
            self.link_tag(id, inverse);
        }
    }

    /// Empty a tag, moving every member into the inverse when one exists.
    pub fn clear_tag(&mut self, tag_id: TagId) {
        let Some(slot) = self.tags.resolve(tag_id) else {
            return;
        };
        let inverse = self.tags.get(slot).inverse;
        let members = std::mem::take(&mut self.tags.get_mut(slot).topics);
        debug!(tag_id, count = members.len(), "tag cleared");
        for key in members {
            if let Some(topic) = self.topics.get_mut(&key.id) {
                topic.tags.remove(&slot);
                if let Some(inverse) = inverse {
                    topic.tags.insert(inverse);
                    self.tags.get_mut(inverse).topics.insert(key);
                }
            }
        }
    }

    /// Replace a topic's word set from a fresh token list.
    ///
    /// The old and new slot sets are both sorted, so a single merge pass
    /// finds departing and arriving words in O(|old| + |new|).
    pub fn full_text(&mut self, id: TopicId, ts: Timestamp, tokens: &[String]) {
        self.get_or_create_topic(id, ts);

        let mut next = BTreeSet::new();
        for token in tokens {
            next.insert(self.words.get_or_create(token));
        }

        let Some(topic) = self.topics.get_mut(&id) else {
            return;
        };
        let key = topic.key();
        let prev = std::mem::replace(&mut topic.words, next.clone());

        let mut old_it = prev.iter().peekable();
        let mut new_it = next.iter().peekable();
        loop {
            match (old_it.peek(), new_it.peek()) {
                (Some(&&old), Some(&&new)) if old == new => {
                    old_it.next();
                    new_it.next();
                }
                (Some(&&old), Some(&&new)) if old < new => {
                    self.words.get_mut(old).topics.remove(&key);
                    old_it.next();
                }
                (Some(_), Some(&&new)) => {
                    self.words.get_mut(new).topics.insert(key);
                    new_it.next();
                }
                (Some(&&old), None) => {
                    self.words.get_mut(old).topics.remove(&key);
                    old_it.next();
                }
                (None, Some(&&new)) => {
                    self.words.get_mut(new).topics.insert(key);
                    new_it.next();
                }
                (None, None) => break,
            }
        }
    }

    /// Expire posts that fell out of the active window.
    pub fn flush_counts(&mut self, now: Timestamp) {
        let cutoff = now.saturating_sub(self.config.message_cutoff_secs);
        let active = self.tags.active();
        let members: Vec<TopicKey> = self.tags.get(active).topics.iter().copied().collect();
        let mut dropped = 0usize;
        for key in members {
            let Some(topic) = self.topics.get_mut(&key.id) else {
                continue;
            };
            if !topic.expire_posts(cutoff) {
                topic.tags.remove(&active);
                self.tags.get_mut(active).topics.remove(&key);
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(dropped, "topics left the active window");
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Create the topic at `ts`, or raise an existing topic's timestamp.
    ///
    /// A raise here re-keys the topic but records no post; only an explicit
    /// bump feeds the active window.
    fn get_or_create_topic(&mut self, id: TopicId, ts: Timestamp) {
        if self.topics.contains_key(&id) {
            self.reindex(id, ts);
        } else {
            self.create_topic(id, ts);
        }
    }

    /// Re-key a topic after a timestamp raise. Stale timestamps are a no-op.
    ///
    /// The topic must leave every ordered set before `ts` changes; the sets
    /// are keyed on it.
    fn reindex(&mut self, id: TopicId, ts: Timestamp) {
        let Some(topic) = self.topics.get(&id) else {
            return;
        };
        if ts <= topic.ts {
            return;
        }
        let old_key = topic.key();
        let tag_slots: Vec<TagSlot> = topic.tags.iter().copied().collect();
        let word_slots: Vec<WordSlot> = topic.words.iter().copied().collect();

        for &slot in &tag_slots {
            self.tags.get_mut(slot).topics.remove(&old_key);
        }
        for &slot in &word_slots {
            self.words.get_mut(slot).topics.remove(&old_key);
        }

        let new_key = match self.topics.get_mut(&id) {
            Some(topic) => {
                topic.ts = ts;
                topic.key()
            }
            None => return,
        };

        for &slot in &tag_slots {
            self.tags.get_mut(slot).topics.insert(new_key);
        }
        for &slot in &word_slots {
            self.words.get_mut(slot).topics.insert(new_key);
        }
    }

    /// Add symmetric tag membership
    fn link_tag(&mut self, id: TopicId, slot: TagSlot) {
        let Some(topic) = self.topics.get_mut(&id) else {
            return;
        };
        let key = topic.key();
        topic.tags.insert(slot);
        self.tags.get_mut(slot).topics.insert(key);
    }

    /// Remove symmetric tag membership
    fn unlink_tag(&mut self, id: TopicId, slot: TagSlot) {
        let Some(topic) = self.topics.get_mut(&id) else {
            return;
        };
        let key = topic.key();
        topic.tags.remove(&slot);
        self.tags.get_mut(slot).topics.remove(&key);
    }

    /// Materialise a complement for a principal that has grown past half of
    /// the global population, once the population itself is large enough.
    fn maybe_materialise_inverse(&mut self, principal: TagSlot) {
        let global_len = self.global_topics().len();
        let principal_len = self.tags.get(principal).topics.len();
        if principal_len * 2 <= global_len || global_len <= self.config.inverse_threshold {
            return;
        }

        let inverse = self.tags.alloc_inverse(principal);
        let members: Vec<TopicKey> = self
            .global_topics()
            .iter()
            .filter(|key| !self.tags.get(principal).topics.contains(key))
            .copied()
            .collect();
        debug!(
            backfilled = members.len(),
            principal_len, global_len, "inverse tag materialised"
        );
        for key in members {
            if let Some(topic) = self.topics.get_mut(&key.id) {
                topic.tags.insert(inverse);
                self.tags.get_mut(inverse).topics.insert(key);
            }
        }
    }

    // ------------------------------------------------------------------
    // Consistency audit, used by tests
    // ------------------------------------------------------------------

    /// Check every structural invariant, returning a description of each
    /// violation found. An empty list means the index is consistent.
    pub fn audit(&self) -> Vec<String> {
        let mut violations = Vec::new();

        // Global completeness: the global tag mirrors the id registry.
        let global = self.global_topics();
        if global.len() != self.topics.len() {
            violations.push(format!(
                "global tag holds {} topics, registry holds {}",
                global.len(),
                self.topics.len()
            ));
        }
        for (id, topic) in &self.topics {
            if !global.contains(&topic.key()) {
                violations.push(format!("topic {id} missing from the global tag"));
            }
        }

        // Symmetric membership and key accuracy for tags and words.
        for (id, topic) in &self.topics {
            let key = topic.key();
            for &slot in &topic.tags {
                if !self.tags.get(slot).topics.contains(&key) {
                    violations.push(format!("topic {id} lists a tag that does not hold it"));
                }
            }
            for &slot in &topic.words {
                if !self.words.get(slot).topics.contains(&key) {
                    violations.push(format!("topic {id} lists a word that does not hold it"));
                }
            }
        }
        for (tag_id, slot) in self.tags.iter_ids() {
            for key in &self.tags.get(slot).topics {
                let listed = self
                    .topics
                    .get(&key.id)
                    .is_some_and(|topic| topic.tags.contains(&slot) && topic.key() == *key);
                if !listed {
                    violations.push(format!(
                        "tag {tag_id} holds topic {} without a back edge",
                        key.id
                    ));
                }
            }
        }

        // Inverse completeness: principal and inverse partition the globe.
        for (tag_id, slot) in self.tags.iter_ids() {
            let Some(inverse) = self.tags.get(slot).inverse else {
                continue;
            };
            let principal_topics = &self.tags.get(slot).topics;
            let inverse_topics = &self.tags.get(inverse).topics;
            if principal_topics.len() + inverse_topics.len() != global.len() {
                violations.push(format!(
                    "tag {tag_id} and its inverse cover {} of {} topics",
                    principal_topics.len() + inverse_topics.len(),
                    global.len()
                ));
            }
            if let Some(key) = principal_topics.intersection(inverse_topics).next() {
                violations.push(format!(
                    "topic {} is in both tag {tag_id} and its inverse",
                    key.id
                ));
            }
        }

        // Active membership matches the post window.
        let active = self.active_topics();
        for (id, topic) in &self.topics {
            let in_active = active.contains(&topic.key());
            if in_active != !topic.posts.is_empty() {
                violations.push(format!(
                    "topic {id} active membership disagrees with its posts"
                ));
            }
            if topic.posts.is_empty() != topic.post_counts.is_empty() {
                violations.push(format!("topic {id} post counts disagree with its posts"));
            }
        }

        violations
    }
}
