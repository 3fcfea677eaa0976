//! Socket server
//!
//! Accepts connections on a unix stream socket and feeds decoded payloads
//! to the engine. Mutation messages are fire-and-forget; requests get one
//! reply line each, in arrival order per connection. A malformed line is
//! logged and dropped without killing the connection.

mod protocol;

pub use protocol::{decode_line, Payload, PayloadKind, Reply};

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::engine::TopicIndex;
use crate::error::{Result, TagdexError};
use crate::index::Timestamp;
use crate::query::{Expr, SliceOptions};

use protocol::{
    arg_ff_ts, arg_flag, arg_tag_list, arg_token_list, arg_topic_id, arg_ts, arg_u32, arg_user,
};

/// Seconds since the unix epoch, truncated to the index's resolution
pub fn unix_now() -> Timestamp {
    let now = chrono::Utc::now().timestamp();
    Timestamp::try_from(now).unwrap_or(Timestamp::MAX)
}

/// Serve the index until the listener fails or the task is dropped
pub async fn run(index: Arc<TopicIndex>, config: ServerConfig) -> Result<()> {
    // A previous run may have left its socket file behind
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)?;
    info!(socket = %config.socket_path.display(), "listening");

    let flusher = {
        let index = Arc::clone(&index);
        let period = Duration::from_secs(config.flush_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // the first tick fires immediately
            loop {
                ticker.tick().await;
                index.flush_counts(unix_now());
            }
        })
    };

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let index = Arc::clone(&index);
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(index, stream).await {
                        warn!(%err, "connection closed with error");
                    }
                });
            }
            Err(err) => {
                flusher.abort();
                return Err(err.into());
            }
        }
    }
}

async fn handle_connection(index: Arc<TopicIndex>, stream: UnixStream) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let payloads = match decode_line(&line) {
            Ok(payloads) => payloads,
            Err(err) => {
                warn!(%err, "invalid payload line");
                continue;
            }
        };
        for payload in payloads {
            if let Some(reply) = dispatch(&index, payload) {
                writer.write_all(reply.encode_line()?.as_bytes()).await?;
            }
        }
    }
    Ok(())
}

/// Route one payload to the engine; requests produce a reply
fn dispatch(index: &TopicIndex, payload: Payload) -> Option<Reply> {
    match payload.kind {
        PayloadKind::Message => {
            if let Err(err) = handle_message(index, &payload.name, &payload.data) {
                warn!(name = %payload.name, %err, "message dropped");
            }
            None
        }
        PayloadKind::Request => {
            let uniq = payload.uniq.unwrap_or_default();
            Some(match handle_request(index, &payload.name, &payload.data) {
                Ok(data) => Reply::resolved(uniq, data),
                Err(err) => Reply::threw(uniq, &err),
            })
        }
    }
}

fn handle_message(index: &TopicIndex, name: &str, args: &[Value]) -> Result<()> {
    match name {
        "createTopic" => {
            index.create_topic(arg_topic_id(args, 0)?, arg_ts(args, 1)?);
        }
        "bumpTopic" => {
            index.bump_topic(
                arg_topic_id(args, 0)?,
                arg_ts(args, 1)?,
                arg_user(args, 2)?,
                unix_now(),
            );
        }
        "addTags" => {
            index.add_tags(
                arg_topic_id(args, 0)?,
                arg_ts(args, 1)?,
                &arg_tag_list(args, 2)?,
            );
        }
        "removeTag" => {
            index.remove_tag(arg_topic_id(args, 0)?, arg_u32(args, 1, "tag id")?);
        }
        "clearTag" => {
            index.clear_tag(arg_u32(args, 0, "tag id")?);
        }
        "fullText" => {
            index.full_text(
                arg_topic_id(args, 0)?,
                arg_ts(args, 1)?,
                &arg_token_list(args, 2)?,
            );
        }
        "flushCounts" => {
            index.flush_counts(unix_now());
        }
        _ => {
            return Err(TagdexError::InvalidRequest(format!(
                "unknown message '{name}'"
            )));
        }
    }
    Ok(())
}

fn handle_request(index: &TopicIndex, name: &str, args: &[Value]) -> Result<Value> {
    match name {
        "slice" => {
            let expr = Expr::parse(args.first().unwrap_or(&Value::Null))?;
            let opts = SliceOptions::new(arg_u32(args, 1, "count")? as usize)
                .with_fast_forward(arg_ff_ts(args, 2)?)
                .with_estimate(arg_flag(args, 3)?);
            Ok(serde_json::to_value(index.slice(&expr, &opts)?)?)
        }
        "hot" => {
            let expr = Expr::parse(args.first().unwrap_or(&Value::Null))?;
            let count = arg_u32(args, 1, "count")? as usize;
            Ok(json!(index.hot(&expr, count, unix_now())?))
        }
        "sync" => Ok(Value::Bool(index.sync())),
        _ => Err(TagdexError::InvalidRequest(format!(
            "unknown request '{name}'"
        ))),
    }
}
