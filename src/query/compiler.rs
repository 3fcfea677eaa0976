//! Expression compilation
//!
//! Turns a parsed expression into a cursor tree over the live index. Names
//! resolve here: an unreferenced tag or unknown word in a positive position
//! is an empty result, not an error.
//!
//! One structural rewrite applies: subtracting a tag whose complement is
//! materialised becomes an intersection with that complement, which walks
//! the (usually much smaller) inverse set instead of rescanning the
//! subtrahend on every step.

use crate::error::{Result, TagdexError};
use crate::index::{IndexStore, TopicSet};

use super::cursor::Cursor;
use super::expr::Expr;

/// A wildcard may expand to at most this fraction of all topics
const WILDCARD_CAP_DIVISOR: usize = 4;

/// Compile an expression against the index
pub fn compile<'a>(store: &'a IndexStore, expr: &Expr) -> Result<Cursor<'a>> {
    match expr {
        Expr::Tag(0) => Ok(Cursor::basic(store.global_topics())),
        Expr::Tag(id) => Ok(match store.tag_topics(*id) {
            Some(set) => Cursor::basic(set),
            None => Cursor::Null,
        }),
        Expr::Word(word) => Ok(match store.word_topics(word) {
            Some(set) => Cursor::basic(set),
            None => Cursor::Null,
        }),
        Expr::Prefix(prefix) => compile_prefix(store, prefix),
        Expr::Union(children) => Ok(Cursor::union(compile_all(store, children)?)),
        Expr::Intersection(children) => Ok(Cursor::intersection(compile_all(store, children)?)),
        Expr::Difference(minuend, subtrahend) => compile_difference(store, minuend, subtrahend),
    }
}

fn compile_all<'a>(store: &'a IndexStore, exprs: &[Expr]) -> Result<Vec<Cursor<'a>>> {
    exprs.iter().map(|expr| compile(store, expr)).collect()
}

/// Compile `minuend − subtrahend`, rewriting through materialised inverses
/// where possible.
fn compile_difference<'a>(
    store: &'a IndexStore,
    minuend: &Expr,
    subtrahend: &Expr,
) -> Result<Cursor<'a>> {
    match subtrahend {
        Expr::Tag(id) if *id > 0 => {
            if let Some(inverse) = store.tag_inverse_topics(*id) {
                return Ok(Cursor::intersection(vec![
                    compile(store, minuend)?,
                    Cursor::basic(inverse),
                ]));
            }
        }
        Expr::Union(members) => {
            // Split the union into members with materialised inverses and
            // the rest. The inverses fold into an intersection; whatever is
            // left is still subtracted.
            let mut inverses: Vec<&TopicSet> = Vec::new();
            let mut rest: Vec<&Expr> = Vec::new();
            for member in members {
                match member {
                    Expr::Tag(id) if *id > 0 => match store.tag_inverse_topics(*id) {
                        Some(set) => inverses.push(set),
                        None => rest.push(member),
                    },
                    other => rest.push(other),
                }
            }
            if !inverses.is_empty() {
                let mut children = vec![compile(store, minuend)?];
                children.extend(inverses.into_iter().map(Cursor::basic));
                let narrowed = Cursor::intersection(children);
                return match rest.len() {
                    0 => Ok(narrowed),
                    1 => Ok(Cursor::difference(narrowed, compile(store, rest[0])?)),
                    _ => {
                        let remainder = rest
                            .into_iter()
                            .map(|member| compile(store, member))
                            .collect::<Result<Vec<_>>>()?;
                        Ok(Cursor::difference(narrowed, Cursor::union(remainder)))
                    }
                };
            }
        }
        _ => {}
    }
    Ok(Cursor::difference(
        compile(store, minuend)?,
        compile(store, subtrahend)?,
    ))
}

/// Expand a word prefix into a union over every matching word
fn compile_prefix<'a>(store: &'a IndexStore, prefix: &str) -> Result<Cursor<'a>> {
    let cap = store.global_topics().len() / WILDCARD_CAP_DIVISOR;
    let mut children = Vec::new();
    let mut budget = 0usize;
    for set in store.word_topics_with_prefix(prefix) {
        let child = Cursor::basic(set);
        budget += child.max_len();
        if budget > cap {
            return Err(TagdexError::TooManyMatches {
                prefix: prefix.to_string(),
            });
        }
        children.push(child);
    }
    Ok(match children.len() {
        0 => Cursor::Null,
        1 => children.remove(0),
        _ => Cursor::union(children),
    })
}
