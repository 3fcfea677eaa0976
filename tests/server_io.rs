//! Socket transport round trips
//!
//! Boots the server on a throwaway socket, speaks the line protocol over a
//! real connection and checks reply framing and ordering.

use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tagdex::{server, IndexConfig, ServerConfig, TopicIndex};

async fn boot(dir: &TempDir) -> (Arc<TopicIndex>, UnixStream) {
    let socket = dir.path().join("tagdex.sock");
    let index = Arc::new(TopicIndex::new(IndexConfig::default()));
    let config = ServerConfig::new(&socket).with_flush_interval_secs(3_600);
    tokio::spawn(server::run(Arc::clone(&index), config));

    // The listener needs a moment to bind
    let stream = loop {
        match UnixStream::connect(&socket).await {
            Ok(stream) => break stream,
            Err(_) => tokio::time::sleep(std::time::Duration::from_millis(10)).await,
        }
    };
    (index, stream)
}

async fn roundtrip(stream: &mut UnixStream, line: String) -> Value {
    let (reader, mut writer) = stream.split();
    writer.write_all(line.as_bytes()).await.expect("write");
    let mut lines = BufReader::new(reader).lines();
    let reply = lines
        .next_line()
        .await
        .expect("read")
        .expect("reply line");
    serde_json::from_str(&reply).expect("reply json")
}

#[tokio::test]
async fn mutations_then_slice_over_the_wire() {
    let dir = TempDir::new().expect("tempdir");
    let (_index, mut stream) = boot(&dir).await;

    // Batch several messages and a request on one line; the reply comes
    // after every earlier payload applied
    let line = json!([
        {"type": "message", "name": "addTags", "data": [10, 100, [1]]},
        {"type": "message", "name": "addTags", "data": [20, 200, [1]]},
        {"type": "message", "name": "addTags", "data": [30, 150, [1]]},
        {"type": "request", "name": "slice", "uniq": "q1", "data": [1, 10]},
    ])
    .to_string()
        + "\n";

    let reply = roundtrip(&mut stream, line).await;
    assert_eq!(reply[0]["type"], "resolved");
    assert_eq!(reply[0]["uniq"], "q1");
    assert_eq!(reply[0]["data"]["results"], json!([20, 30, 10]));
}

#[tokio::test]
async fn sync_flushes_prior_mutations() {
    let dir = TempDir::new().expect("tempdir");
    let (index, mut stream) = boot(&dir).await;

    let line = json!([
        {"type": "message", "name": "fullText", "data": [7, 500, ["lantern"]]},
        {"type": "request", "name": "sync", "uniq": "s1", "data": []},
    ])
    .to_string()
        + "\n";

    let reply = roundtrip(&mut stream, line).await;
    assert_eq!(reply[0]["data"], json!(true));
    assert_eq!(index.len(), 1);
}

#[tokio::test]
async fn query_errors_resolve_as_threw() {
    let dir = TempDir::new().expect("tempdir");
    let (_index, mut stream) = boot(&dir).await;

    let line = json!([
        {"type": "request", "name": "slice", "uniq": "e1", "data": [["nope", 1, 2], 10]},
    ])
    .to_string()
        + "\n";

    let reply = roundtrip(&mut stream, line).await;
    assert_eq!(reply[0]["type"], "threw");
    assert_eq!(reply[0]["uniq"], "e1");
    assert_eq!(reply[0]["data"], json!("unknown expression"));
}

#[tokio::test]
async fn invalid_lines_do_not_kill_the_connection() {
    let dir = TempDir::new().expect("tempdir");
    let (_index, mut stream) = boot(&dir).await;

    let line = "this is not json\n".to_string()
        + &json!([
            {"type": "request", "name": "sync", "uniq": "s2", "data": []},
        ])
        .to_string()
        + "\n";

    let reply = roundtrip(&mut stream, line).await;
    assert_eq!(reply[0]["uniq"], "s2");
    assert_eq!(reply[0]["data"], json!(true));
}

#[tokio::test]
async fn hot_over_the_wire() {
    let dir = TempDir::new().expect("tempdir");
    let (index, mut stream) = boot(&dir).await;

    // Posts go through the engine directly so the window math uses a
    // controlled clock
    let now = server::unix_now();
    index.add_tags(1, now - 10, &[1]);
    index.add_tags(2, now - 10, &[1]);
    index.bump_topic(2, now - 5, 7, now);
    index.bump_topic(2, now - 4, 8, now);
    index.bump_topic(1, now - 3, 9, now);

    let line = json!([
        {"type": "request", "name": "hot", "uniq": "h1", "data": [1, 10]},
    ])
    .to_string()
        + "\n";

    let reply = roundtrip(&mut stream, line).await;
    assert_eq!(reply[0]["type"], "resolved");
    assert_eq!(reply[0]["data"], json!([2, 1]));
}
