//! Canonical topic ordering
//!
//! Every ordered topic set and every cursor walks topics newest-first:
//! higher timestamp first, ties broken by higher id. `TopicKey` denormalises
//! the `(ts, id)` pair out of the topic so that ordered sets never key on a
//! field that can change underneath them; a timestamp change re-keys the
//! topic through remove-then-reinsert.

use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Unique topic identifier assigned upstream
pub type TopicId = u64;
/// Seconds-resolution timestamp
pub type Timestamp = u32;
/// Identifier of the user behind a post
pub type UserId = u32;
/// Client-addressable tag identifier
pub type TagId = u32;

/// Ordering key of a topic inside the index
///
/// `Ord` is arranged so that the smallest key is the newest topic, which
/// lets `BTreeSet` iteration and `range(key..)` walk the canonical order
/// directly.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TopicKey {
    pub ts: Timestamp,
    pub id: TopicId,
}

impl TopicKey {
    pub fn new(ts: Timestamp, id: TopicId) -> Self {
        Self { ts, id }
    }

    /// Synthetic search key for fast-forwarding to a timestamp.
    ///
    /// Id zero sorts after every real topic sharing the timestamp, so a
    /// fast-forward to a probe lands on the first topic at or older than
    /// `ts` that a real id could not reach.
    pub fn probe(ts: Timestamp) -> Self {
        Self { ts, id: 0 }
    }
}

impl Ord for TopicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .ts
            .cmp(&self.ts)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for TopicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An ordered set of topic keys, newest first
pub type TopicSet = BTreeSet<TopicKey>;
