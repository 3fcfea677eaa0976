//! Query expression AST
//!
//! Expressions arrive as JSON values: an integer names a tag (zero for the
//! whole index), a string names a word (with a trailing `*` for a prefix
//! scan), and an array is an operator applied to sub-expressions, e.g.
//!
//! ```json
//! ["difference", ["intersection", 7, "cats"], 9]
//! ```
//!
//! Parsing validates shape and arity only; names resolve later, against the
//! index, at compile time.

use serde_json::Value;

use crate::error::{Result, TagdexError};
use crate::index::TagId;

/// A parsed slice-query expression
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    /// A tag's topics; tag zero means every topic
    Tag(TagId),
    /// An exact word's topics
    Word(String),
    /// Every word starting with the prefix
    Prefix(String),
    Union(Vec<Expr>),
    Intersection(Vec<Expr>),
    Difference(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parse a JSON value into an expression tree
    pub fn parse(value: &Value) -> Result<Expr> {
        match value {
            Value::Number(n) => {
                let id = n
                    .as_u64()
                    .and_then(|id| TagId::try_from(id).ok())
                    .ok_or(TagdexError::UnknownExpression)?;
                Ok(Expr::Tag(id))
            }
            Value::String(s) => match s.strip_suffix('*') {
                Some(prefix) => Ok(Expr::Prefix(prefix.to_string())),
                None => Ok(Expr::Word(s.clone())),
            },
            Value::Array(items) => Self::parse_operator(items),
            _ => Err(TagdexError::UnknownExpression),
        }
    }

    fn parse_operator(items: &[Value]) -> Result<Expr> {
        let op = items
            .first()
            .and_then(Value::as_str)
            .ok_or(TagdexError::UnknownExpression)?;
        let operands = &items[1..];

        match op {
            "difference" => {
                if operands.len() != 2 {
                    return Err(TagdexError::UnknownExpression);
                }
                Ok(Expr::Difference(
                    Box::new(Self::parse(&operands[0])?),
                    Box::new(Self::parse(&operands[1])?),
                ))
            }
            "union" | "intersection" => match operands.len() {
                0 => Err(TagdexError::UnknownExpression),
                // A one-operand combinator is just its operand
                1 => Self::parse(&operands[0]),
                _ => {
                    let children = operands
                        .iter()
                        .map(Self::parse)
                        .collect::<Result<Vec<_>>>()?;
                    Ok(if op == "union" {
                        Expr::Union(children)
                    } else {
                        Expr::Intersection(children)
                    })
                }
            },
            _ => Err(TagdexError::UnknownExpression),
        }
    }
}
