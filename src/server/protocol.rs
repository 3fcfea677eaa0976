//! Wire protocol
//!
//! Each line on the socket is a JSON array of payload objects. A payload is
//! either a fire-and-forget `message` or a `request` carrying a `uniq`
//! handle the reply is correlated by:
//!
//! ```json
//! [{"type":"request","name":"slice","uniq":"q1","data":[[ "union", 1, 2 ], 20]}]
//! ```
//!
//! Replies go back one line per request:
//!
//! ```json
//! [{"type":"resolved","uniq":"q1","data":{"results":[...]}}]
//! ```
//!
//! A handler failure resolves to `threw` with the error text as data; the
//! connection stays up.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TagdexError};
use crate::index::{TagId, Timestamp, TopicId, UserId};

/// Kind of an inbound payload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Request,
    Message,
}

/// One decoded payload off the wire
#[derive(Clone, Debug, Deserialize)]
pub struct Payload {
    #[serde(rename = "type")]
    pub kind: PayloadKind,
    pub name: String,
    #[serde(default)]
    pub uniq: Option<String>,
    #[serde(default)]
    pub data: Vec<Value>,
}

/// Decode one wire line into its payloads
pub fn decode_line(line: &str) -> Result<Vec<Payload>> {
    Ok(serde_json::from_str(line)?)
}

/// Reply to a single request
#[derive(Clone, Debug, Serialize)]
pub struct Reply {
    #[serde(rename = "type")]
    kind: &'static str,
    uniq: String,
    data: Value,
}

impl Reply {
    pub fn resolved(uniq: String, data: Value) -> Self {
        Self {
            kind: "resolved",
            uniq,
            data,
        }
    }

    pub fn threw(uniq: String, error: &TagdexError) -> Self {
        Self {
            kind: "threw",
            uniq,
            data: Value::String(error.to_string()),
        }
    }

    /// Encode as one wire line, newline included
    pub fn encode_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(&[self])?;
        line.push('\n');
        Ok(line)
    }
}

// Argument decoding. Operations take positional arguments; a missing or
// mistyped one fails the whole payload.

pub fn arg_u64(args: &[Value], idx: usize, name: &str) -> Result<u64> {
    args.get(idx)
        .and_then(Value::as_u64)
        .ok_or_else(|| TagdexError::InvalidRequest(format!("argument {idx} ({name}) must be u64")))
}

pub fn arg_u32(args: &[Value], idx: usize, name: &str) -> Result<u32> {
    arg_u64(args, idx, name)?
        .try_into()
        .map_err(|_| TagdexError::InvalidRequest(format!("argument {idx} ({name}) out of range")))
}

pub fn arg_topic_id(args: &[Value], idx: usize) -> Result<TopicId> {
    arg_u64(args, idx, "topic id")
}

pub fn arg_ts(args: &[Value], idx: usize) -> Result<Timestamp> {
    arg_u32(args, idx, "timestamp")
}

pub fn arg_user(args: &[Value], idx: usize) -> Result<UserId> {
    arg_u32(args, idx, "user id")
}

pub fn arg_tag_list(args: &[Value], idx: usize) -> Result<Vec<TagId>> {
    let items = args
        .get(idx)
        .and_then(Value::as_array)
        .ok_or_else(|| TagdexError::InvalidRequest(format!("argument {idx} must be a tag list")))?;
    items
        .iter()
        .map(|item| {
            item.as_u64()
                .and_then(|id| TagId::try_from(id).ok())
                .ok_or_else(|| TagdexError::InvalidRequest("tag ids must be u32".to_string()))
        })
        .collect()
}

pub fn arg_token_list(args: &[Value], idx: usize) -> Result<Vec<String>> {
    let items = args.get(idx).and_then(Value::as_array).ok_or_else(|| {
        TagdexError::InvalidRequest(format!("argument {idx} must be a token list"))
    })?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| TagdexError::InvalidRequest("tokens must be strings".to_string()))
        })
        .collect()
}

/// Optional fast-forward argument; a bare boolean stands for zero or one
pub fn arg_ff_ts(args: &[Value], idx: usize) -> Result<Timestamp> {
    match args.get(idx) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Bool(flag)) => Ok(u32::from(*flag)),
        Some(value) => value
            .as_u64()
            .and_then(|ts| Timestamp::try_from(ts).ok())
            .ok_or_else(|| {
                TagdexError::InvalidRequest(format!("argument {idx} (fast-forward) must be u32"))
            }),
    }
}

/// Optional boolean argument defaulting to false
pub fn arg_flag(args: &[Value], idx: usize) -> Result<bool> {
    match args.get(idx) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(_) => Err(TagdexError::InvalidRequest(format!(
            "argument {idx} must be a boolean"
        ))),
    }
}
