//! Read-query drivers
//!
//! `slice` walks a compiled cursor into a page of topic ids, optionally
//! fast-forwarded to a timestamp, optionally followed by a cardinality
//! estimate. `hot` scores recently active topics. Both borrow the store for
//! their whole run; the caller holds the shared lease around them.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::index::{IndexStore, Timestamp, TopicId, TopicKey};

use super::compiler::compile;
use super::cursor::Cursor;
use super::expr::Expr;

/// Options for a slice query
#[derive(Clone, Debug)]
pub struct SliceOptions {
    /// Maximum number of ids to return
    pub count: usize,
    /// Skip results newer than this timestamp; zero disables
    pub fast_forward: Timestamp,
    /// Follow the page with a cardinality estimate
    pub estimate: bool,
}

impl SliceOptions {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            fast_forward: 0,
            estimate: false,
        }
    }

    pub fn with_fast_forward(mut self, ts: Timestamp) -> Self {
        self.fast_forward = ts;
        self
    }

    pub fn with_estimate(mut self, estimate: bool) -> Self {
        self.estimate = estimate;
        self
    }
}

/// Result of a slice query
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SliceResponse {
    /// Topic ids, newest first
    pub results: Vec<TopicId>,
    /// Total cardinality, when requested; exact unless `estimated`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// True when `count` is an order-of-magnitude estimate
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub estimated: bool,
}

/// Run a slice query against the store
pub fn slice(store: &IndexStore, expr: &Expr, opts: &SliceOptions) -> Result<SliceResponse> {
    let mut cursor = compile(store, expr)?;

    if opts.fast_forward > 0 {
        let probe = TopicKey::probe(opts.fast_forward);
        if cursor.peek().is_some_and(|head| head < probe) {
            cursor.fast_forward(probe);
        }
    }

    let mut results = Vec::new();
    let mut first_ts = 0;
    while results.len() < opts.count {
        let Some(head) = cursor.peek() else {
            break;
        };
        if results.is_empty() {
            first_ts = head.ts;
        }
        results.push(head.id);
        cursor.advance();
    }

    if !opts.estimate {
        return Ok(SliceResponse {
            results,
            count: None,
            estimated: false,
        });
    }

    // A short page means the cursor ran dry; the count is exact.
    if results.len() < opts.count {
        let count = results.len() as u64;
        return Ok(SliceResponse {
            results,
            count: Some(count),
            estimated: false,
        });
    }

    // Walk one-by-one a while longer. Running dry in the warm-up still
    // yields an exact count.
    let mut seen = results.len();
    while seen < store.config().estimate_skip {
        if cursor.peek().is_none() {
            return Ok(SliceResponse {
                results,
                count: Some(seen as u64),
                estimated: false,
            });
        }
        cursor.advance();
        seen += 1;
    }

    let count = estimate_remaining(&mut cursor, seen, first_ts);
    debug!(seen, count, "slice count estimated");
    Ok(SliceResponse {
        results,
        count: Some(count),
        estimated: true,
    })
}

/// Estimate the cursor's total cardinality by exponential time skips.
///
/// Each round doubles the time span between the first result and the
/// cursor's head and fast-forwards there, so the number of rounds tracks
/// the binary order of magnitude of the population, assuming its density
/// over time is roughly even.
fn estimate_remaining(cursor: &mut Cursor<'_>, seen: usize, first_ts: Timestamp) -> u64 {
    let mut magnitude = (seen as f64).log2();
    let mut last_ts = first_ts;
    while let Some(head) = cursor.peek() {
        let span = first_ts.wrapping_sub(head.ts);
        let mut probe_ts = first_ts.wrapping_sub(span.wrapping_mul(2));
        if probe_ts > last_ts {
            // The doubled span wrapped below zero; the tail is at most one
            // more doubling deep.
            magnitude += 1.0;
            break;
        }
        if probe_ts == last_ts {
            // A run of same-timestamp topics; force progress.
            probe_ts = last_ts.wrapping_sub(1);
        }
        cursor.fast_forward(TopicKey::probe(probe_ts));
        last_ts = probe_ts;
        magnitude += 1.0;
    }
    magnitude.exp2().round() as u64
}

/// Rank the expression's recently active topics by posting heat.
///
/// The score decays quadratically with topic age across the topic cutoff
/// and scales with the number of distinct posters inside the window.
pub fn hot(
    store: &IndexStore,
    expr: &Expr,
    count: usize,
    now: Timestamp,
) -> Result<Vec<TopicId>> {
    let compiled = compile(store, expr)?;
    let mut cursor = Cursor::intersection(vec![compiled, Cursor::basic(store.active_topics())]);

    let cutoff = store.config().topic_cutoff_secs as f64;
    let mut scored: Vec<(f64, TopicId)> = Vec::new();
    while let Some(head) = cursor.peek() {
        if let Some(topic) = store.topic(head.id) {
            let age = now.saturating_sub(topic.created) as f64 / cutoff;
            let score = (1.0 - age * age) * topic.active_users() as f64;
            scored.push((score, head.id));
        }
        cursor.advance();
    }

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.cmp(&b.1))
    });
    scored.truncate(count);
    Ok(scored.into_iter().map(|(_, id)| id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::query::expr::Expr;
    use serde_json::json;

    fn expr(value: serde_json::Value) -> Expr {
        Expr::parse(&value).expect("expression")
    }

    fn populated(spread_secs: u32, count: u64) -> IndexStore {
        let mut s = IndexStore::new(IndexConfig::default());
        let base = 1_000_000;
        for id in 1..=count {
            let ts = base + (id as u32 % spread_secs);
            s.add_tags(id, ts, &[1]);
        }
        s
    }

    #[test]
    fn test_slice_page() {
        let s = populated(100, 30);
        let page = slice(&s, &expr(json!(1)), &SliceOptions::new(10)).unwrap();
        assert_eq!(page.results.len(), 10);
        assert_eq!(page.count, None);
        assert!(!page.estimated);

        // Newest first throughout the page
        let keys: Vec<_> = page
            .results
            .iter()
            .map(|id| s.topic(*id).expect("topic").key())
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_slice_exact_count_when_exhausted() {
        let s = populated(100, 30);
        let page = slice(
            &s,
            &expr(json!(1)),
            &SliceOptions::new(100).with_estimate(true),
        )
        .unwrap();
        assert_eq!(page.results.len(), 30);
        assert_eq!(page.count, Some(30));
        assert!(!page.estimated);
    }

    #[test]
    fn test_slice_exact_count_during_warmup() {
        let s = populated(100, 500);
        let page = slice(
            &s,
            &expr(json!(1)),
            &SliceOptions::new(10).with_estimate(true),
        )
        .unwrap();
        assert_eq!(page.results.len(), 10);
        assert_eq!(page.count, Some(500));
        assert!(!page.estimated);
    }

    #[test]
    fn test_slice_estimates_large_results() {
        let s = populated(100, 10_000);
        let page = slice(
            &s,
            &expr(json!(1)),
            &SliceOptions::new(10).with_estimate(true),
        )
        .unwrap();
        assert_eq!(page.results.len(), 10);
        assert!(page.estimated);
        let count = page.count.expect("count");
        // Within one binary order of magnitude of the true population
        assert!(count >= 5_000, "estimate {count} too low");
        assert!(count <= 20_000, "estimate {count} too high");
    }

    #[test]
    fn test_slice_fast_forward() {
        let mut s = IndexStore::new(IndexConfig::default());
        s.add_tags(1, 100, &[1]);
        s.add_tags(2, 200, &[1]);
        s.add_tags(3, 300, &[1]);

        let page = slice(
            &s,
            &expr(json!(1)),
            &SliceOptions::new(10).with_fast_forward(200),
        )
        .unwrap();
        assert_eq!(page.results, vec![1]);

        // A fast-forward past every result is empty
        let page = slice(
            &s,
            &expr(json!(1)),
            &SliceOptions::new(10).with_fast_forward(50),
        )
        .unwrap();
        assert!(page.results.is_empty());
    }

    #[test]
    fn test_slice_empty_expression() {
        let s = populated(100, 10);
        let page = slice(
            &s,
            &expr(json!(999)),
            &SliceOptions::new(10).with_estimate(true),
        )
        .unwrap();
        assert!(page.results.is_empty());
        assert_eq!(page.count, Some(0));
        assert!(!page.estimated);
    }

    #[test]
    fn test_hot_ranks_by_posters_and_age() {
        let mut s = IndexStore::new(IndexConfig::default());
        let now = 1_000_000;
        s.add_tags(1, now - 10, &[1]);
        s.add_tags(2, now - 10, &[1]);
        s.add_tags(3, now - 10, &[1]);

        // Topic 2 hears from three users, topic 1 from one
        s.bump_topic(1, now - 5, 100, now);
        s.bump_topic(2, now - 5, 200, now);
        s.bump_topic(2, now - 4, 201, now);
        s.bump_topic(2, now - 3, 202, now);

        let ranked = hot(&s, &expr(json!(1)), 10, now).unwrap();
        assert_eq!(ranked, vec![2, 1]);

        let top = hot(&s, &expr(json!(1)), 1, now).unwrap();
        assert_eq!(top, vec![2]);
    }

    #[test]
    fn test_hot_only_sees_active_topics() {
        let mut s = IndexStore::new(IndexConfig::default());
        let now = 1_000_000;
        s.add_tags(1, now - 10, &[1]);
        s.add_tags(2, now - 10, &[2]);
        s.bump_topic(2, now - 5, 7, now);

        // Tag 1's only topic never got a post
        assert!(hot(&s, &expr(json!(1)), 10, now).unwrap().is_empty());
        assert_eq!(hot(&s, &expr(json!(0)), 10, now).unwrap(), vec![2]);
    }

    #[test]
    fn test_serialized_shape() {
        let page = SliceResponse {
            results: vec![3, 1],
            count: None,
            estimated: false,
        };
        assert_eq!(
            serde_json::to_string(&page).unwrap(),
            r#"{"results":[3,1]}"#
        );

        let page = SliceResponse {
            results: vec![3],
            count: Some(1024),
            estimated: true,
        };
        assert_eq!(
            serde_json::to_string(&page).unwrap(),
            r#"{"results":[3],"count":1024,"estimated":true}"#
        );
    }
}
