//! In-memory topic index
//!
//! The three entity registries (topics, tags, words), the canonical
//! newest-first ordering they share, and the mutation operations that keep
//! the secondary indexes consistent.

mod ordering;
mod store;
mod tag;
mod topic;
mod word;

pub use ordering::{TagId, Timestamp, TopicId, TopicKey, TopicSet, UserId};
pub use store::IndexStore;
pub use tag::{Tag, TagSlot, TagStore};
pub use topic::{Post, Topic};
pub use word::{Word, WordSlot, WordStore};
