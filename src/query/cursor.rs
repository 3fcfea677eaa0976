//! Lazy topic cursors
//!
//! A cursor produces topic keys in the canonical newest-first order without
//! duplicates, materialising nothing. The protocol is `peek` (stable head),
//! `advance` (move past the head), `fast_forward` (reposition to the first
//! element at or after a reference key) and `max_len` (an upper bound on
//! what remains, used to cap wildcard expansion).
//!
//! Combinators hold their children inline in a tagged enum; dispatch is a
//! match, not a vtable. Advancing an exhausted cursor or fast-forwarding
//! backwards is a bug in the caller, caught by debug assertions.

use std::collections::btree_set;

use crate::index::{TopicKey, TopicSet};

/// A lazy descending stream of topic keys
#[derive(Debug)]
pub enum Cursor<'a> {
    /// Nothingness
    Null,
    Basic(BasicCursor<'a>),
    Union(UnionCursor<'a>),
    Intersection(IntersectionCursor<'a>),
    Difference(DifferenceCursor<'a>),
}

impl<'a> Cursor<'a> {
    /// Cursor over a single ordered topic set
    pub fn basic(set: &'a TopicSet) -> Self {
        Cursor::Basic(BasicCursor::new(set))
    }

    /// Topics present in any child
    pub fn union(children: Vec<Cursor<'a>>) -> Self {
        Cursor::Union(UnionCursor::new(children))
    }

    /// Topics present in every child
    pub fn intersection(children: Vec<Cursor<'a>>) -> Self {
        Cursor::Intersection(IntersectionCursor::new(children))
    }

    /// Topics present in `left` but not in `right`
    pub fn difference(left: Cursor<'a>, right: Cursor<'a>) -> Self {
        Cursor::Difference(DifferenceCursor::new(left, right))
    }

    /// The current head, stable across repeated calls
    pub fn peek(&self) -> Option<TopicKey> {
        match self {
            Cursor::Null => None,
            Cursor::Basic(c) => c.head,
            Cursor::Union(c) => c.current,
            Cursor::Intersection(c) => c.current,
            Cursor::Difference(c) => c.current,
        }
    }

    /// Move past the current head
    pub fn advance(&mut self) {
        match self {
            Cursor::Null => debug_assert!(false, "advance on a null cursor"),
            Cursor::Basic(c) => c.advance(),
            Cursor::Union(c) => c.advance(),
            Cursor::Intersection(c) => c.advance(),
            Cursor::Difference(c) => c.advance(),
        }
    }

    /// Reposition to the first element at or after `key`
    pub fn fast_forward(&mut self, key: TopicKey) {
        match self {
            Cursor::Null => debug_assert!(false, "fast-forward on a null cursor"),
            Cursor::Basic(c) => c.fast_forward(key),
            Cursor::Union(c) => c.fast_forward(key),
            Cursor::Intersection(c) => c.fast_forward(key),
            Cursor::Difference(c) => c.fast_forward(key),
        }
    }

    /// Upper bound on the number of elements still producible
    pub fn max_len(&self) -> usize {
        match self {
            Cursor::Null => 0,
            Cursor::Basic(c) => c.set.len(),
            Cursor::Union(c) => c.children.iter().map(Cursor::max_len).max().unwrap_or(0),
            Cursor::Intersection(c) => {
                c.children.iter().map(Cursor::max_len).min().unwrap_or(0)
            }
            Cursor::Difference(c) => c.left.max_len(),
        }
    }

    /// Drain the cursor into a vector of topic ids
    pub fn collect_ids(mut self) -> Vec<u64> {
        let mut out = Vec::new();
        while let Some(head) = self.peek() {
            out.push(head.id);
            self.advance();
        }
        out
    }
}

/// Adapter over one ordered topic set
#[derive(Debug)]
pub struct BasicCursor<'a> {
    set: &'a TopicSet,
    iter: btree_set::Range<'a, TopicKey>,
    head: Option<TopicKey>,
}

impl<'a> BasicCursor<'a> {
    fn new(set: &'a TopicSet) -> Self {
        let mut iter = set.range(..);
        let head = iter.next().copied();
        Self { set, iter, head }
    }

    fn advance(&mut self) {
        debug_assert!(self.head.is_some(), "advance past the end");
        self.head = self.iter.next().copied();
    }

    fn fast_forward(&mut self, key: TopicKey) {
        debug_assert!(
            self.head.is_some_and(|head| head <= key),
            "fast-forward moves backwards"
        );
        self.iter = self.set.range(key..);
        self.head = self.iter.next().copied();
    }
}

/// Merge of any number of children, emitting each key once
#[derive(Debug)]
pub struct UnionCursor<'a> {
    children: Vec<Cursor<'a>>,
    current: Option<TopicKey>,
}

impl<'a> UnionCursor<'a> {
    fn new(children: Vec<Cursor<'a>>) -> Self {
        let mut cursor = Self {
            children,
            current: None,
        };
        cursor.update();
        cursor
    }

    fn update(&mut self) {
        self.current = self.children.iter().filter_map(Cursor::peek).min();
    }

    fn advance(&mut self) {
        debug_assert!(self.current.is_some(), "advance past the end");
        // Every child sitting on the emitted key moves together, which is
        // what keeps the output duplicate-free.
        for child in &mut self.children {
            if child.peek() == self.current {
                child.advance();
            }
        }
        self.update();
    }

    fn fast_forward(&mut self, key: TopicKey) {
        for child in &mut self.children {
            if child.peek().is_some_and(|head| head < key) {
                child.fast_forward(key);
            }
        }
        self.update();
    }
}

/// Topics common to every child
///
/// Head-finding is a round-robin scan: keep the furthest-along head seen as
/// the candidate, fast-forward anyone behind it, and stop when a full cycle
/// comes back to the candidate's owner without anyone jumping.
#[derive(Debug)]
pub struct IntersectionCursor<'a> {
    children: Vec<Cursor<'a>>,
    current: Option<TopicKey>,
}

impl<'a> IntersectionCursor<'a> {
    fn new(children: Vec<Cursor<'a>>) -> Self {
        let mut cursor = Self {
            children,
            current: None,
        };
        cursor.update();
        cursor
    }

    fn update(&mut self) {
        let Some(first) = self.children.first() else {
            self.current = None;
            return;
        };
        let Some(mut oldest) = first.peek() else {
            self.current = None;
            return;
        };
        let mut oldest_idx = 0;
        let mut idx = 1;
        loop {
            if idx >= self.children.len() {
                idx = 0;
            }
            let Some(head) = self.children[idx].peek() else {
                // One child ran dry, so nothing is common anymore
                self.current = None;
                return;
            };
            if idx == oldest_idx {
                // A full cycle agreed on the candidate
                self.current = Some(oldest);
                return;
            }
            if oldest < head {
                // This child is further along; its head is the new candidate
                oldest = head;
                oldest_idx = idx;
                idx += 1;
            } else if head < oldest {
                // Behind the candidate; catch up and look again
                self.children[idx].fast_forward(oldest);
            } else {
                idx += 1;
            }
        }
    }

    fn advance(&mut self) {
        debug_assert!(self.current.is_some(), "advance past the end");
        // At a found head every child sits on the same key
        for child in &mut self.children {
            child.advance();
        }
        self.update();
    }

    fn fast_forward(&mut self, key: TopicKey) {
        for child in &mut self.children {
            if child.peek().is_some_and(|head| head < key) {
                child.fast_forward(key);
            }
        }
        self.update();
    }
}

/// Topics in `left` that never show up in `right`
#[derive(Debug)]
pub struct DifferenceCursor<'a> {
    left: Box<Cursor<'a>>,
    right: Box<Cursor<'a>>,
    current: Option<TopicKey>,
}

impl<'a> DifferenceCursor<'a> {
    fn new(left: Cursor<'a>, right: Cursor<'a>) -> Self {
        let mut cursor = Self {
            left: Box::new(left),
            right: Box::new(right),
            current: None,
        };
        cursor.update();
        cursor
    }

    fn update(&mut self) {
        loop {
            let Some(left) = self.left.peek() else {
                self.current = None;
                return;
            };
            let Some(right) = self.right.peek() else {
                self.current = Some(left);
                return;
            };
            if left < right {
                // Right has already passed this key, so it cannot contain it
                self.current = Some(left);
                return;
            } else if right < left {
                // Inconclusive until right catches up
                self.right.fast_forward(left);
            } else {
                // Present on both sides; skip it
                self.left.advance();
                self.right.advance();
            }
        }
    }

    fn advance(&mut self) {
        debug_assert!(self.current.is_some(), "advance past the end");
        // The emitted head is strictly ahead of right, so only left moves;
        // update resynchronises the other side.
        self.left.advance();
        self.update();
    }

    fn fast_forward(&mut self, key: TopicKey) {
        self.left.fast_forward(key);
        if self.right.peek().is_some_and(|head| head < key) {
            self.right.fast_forward(key);
        }
        self.update();
    }
}
