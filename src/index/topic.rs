//! Topic records
//!
//! Topics are owned by the central id registry in `IndexStore`; tags and
//! words refer back to them only through `TopicKey`. The tag and word slots
//! stored here are the reverse edges, kept in lockstep with the per-tag and
//! per-word ordered sets.

use std::collections::{BTreeSet, HashMap, VecDeque};

use super::ordering::{Timestamp, TopicId, TopicKey, UserId};
use super::tag::TagSlot;
use super::word::WordSlot;

/// A single post inside a topic's active window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Post {
    pub ts: Timestamp,
    pub user: UserId,
}

/// An identified, timestamped object indexed by tags and words
#[derive(Debug)]
pub struct Topic {
    pub id: TopicId,
    pub ts: Timestamp,
    pub created: Timestamp,
    /// Tags carrying this topic, including the built-ins
    pub tags: BTreeSet<TagSlot>,
    /// Words carrying this topic, sorted by slot for merge diffing
    pub words: BTreeSet<WordSlot>,
    /// Posts inside the active window, oldest first
    pub posts: VecDeque<Post>,
    /// Post count per user over the active window
    pub post_counts: HashMap<UserId, u32>,
}

impl Topic {
    pub fn new(id: TopicId, ts: Timestamp) -> Self {
        Self {
            id,
            ts,
            created: ts,
            tags: BTreeSet::new(),
            words: BTreeSet::new(),
            posts: VecDeque::new(),
            post_counts: HashMap::new(),
        }
    }

    /// Current ordering key of this topic
    pub fn key(&self) -> TopicKey {
        TopicKey::new(self.ts, self.id)
    }

    /// Record a post and count it against its user
    pub fn push_post(&mut self, ts: Timestamp, user: UserId) {
        self.posts.push_back(Post { ts, user });
        *self.post_counts.entry(user).or_insert(0) += 1;
    }

    /// Drop posts older than `cutoff`, returning true if any remain
    pub fn expire_posts(&mut self, cutoff: Timestamp) -> bool {
        while let Some(post) = self.posts.front() {
            if post.ts >= cutoff {
                break;
            }
            let user = post.user;
            self.posts.pop_front();
            if let Some(count) = self.post_counts.get_mut(&user) {
                *count -= 1;
                if *count == 0 {
                    self.post_counts.remove(&user);
                }
            }
        }
        !self.posts.is_empty()
    }

    /// Number of distinct users with a post in the active window
    pub fn active_users(&self) -> usize {
        self.post_counts.len()
    }
}
