//! Slack Web API response handling, against a local HTTP stub

#![cfg(feature = "slack")]

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use slack_query_bridge::slack::check_response;
use slack_query_bridge::{BridgeError, ChatTransport, ErrorCategory, SlackClient};

/// Requests seen by the stub, as (method, body)
type Seen = Arc<Mutex<Vec<(String, Value)>>>;

/// Serve canned Web API bodies keyed by method name
async fn stub_server(responses: Vec<(&'static str, Value)>) -> (String, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: Seen = Arc::default();
    let responses = Arc::new(responses);

    let log = Arc::clone(&seen);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let responses = Arc::clone(&responses);
            let log = Arc::clone(&log);
            tokio::spawn(async move { serve_one(stream, &responses, &log).await });
        }
    });

    (format!("http://{addr}/api"), seen)
}

async fn serve_one(mut stream: TcpStream, responses: &[(&'static str, Value)], seen: &Seen) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed mid-body");
        buf.extend_from_slice(&chunk[..n]);
    }

    let path = head.split_whitespace().nth(1).unwrap_or_default();
    let method = path.rsplit('/').next().unwrap_or_default().to_string();
    let body = serde_json::from_slice(&buf[header_end..header_end + content_length])
        .unwrap_or(Value::Null);
    seen.lock().push((method.clone(), body));

    let reply = responses
        .iter()
        .find(|(name, _)| *name == method)
        .map_or_else(|| json!({ "ok": false, "error": "unknown_method" }), |(_, v)| v.clone())
        .to_string();
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reply}",
        reply.len()
    );
    stream.write_all(response.as_bytes()).await.unwrap();
    stream.shutdown().await.unwrap();
}

#[test]
fn test_ok_response_passes_through() {
    let value = json!({ "ok": true, "ts": "1700000000.000200" });
    assert_eq!(check_response("chat.postMessage", value.clone()).unwrap(), value);
}

#[test]
fn test_ok_false_is_transport_error() {
    let err = check_response(
        "chat.postMessage",
        json!({ "ok": false, "error": "channel_not_found" }),
    )
    .unwrap_err();
    assert!(
        matches!(&err, BridgeError::Transport(msg) if msg == "chat.postMessage: channel_not_found"),
        "{err:?}"
    );
    assert_eq!(err.category(), ErrorCategory::TransportError);
}

#[test]
fn test_missing_ok_is_transport_error() {
    let err = check_response("chat.update", json!({ "ts": "1" })).unwrap_err();
    assert!(
        matches!(&err, BridgeError::Transport(msg) if msg == "chat.update: unknown_error"),
        "{err:?}"
    );
}

#[tokio::test]
async fn test_already_reacted_is_accepted() {
    let (base_url, seen) = stub_server(vec![(
        "reactions.add",
        json!({ "ok": false, "error": "already_reacted" }),
    )])
    .await;
    let client = SlackClient::with_base_url(base_url, "xoxb-test", "xapp-test");

    client
        .add_reaction("C01", "1700000000.000100", "eyes")
        .await
        .unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "reactions.add");
    assert_eq!(
        seen[0].1,
        json!({ "channel": "C01", "timestamp": "1700000000.000100", "name": "eyes" })
    );
}

#[tokio::test]
async fn test_other_reaction_errors_propagate() {
    let (base_url, _) = stub_server(vec![(
        "reactions.add",
        json!({ "ok": false, "error": "missing_scope" }),
    )])
    .await;
    let client = SlackClient::with_base_url(base_url, "xoxb-test", "xapp-test");

    let err = client
        .add_reaction("C01", "1700000000.000100", "eyes")
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TransportError);
}

#[tokio::test]
async fn test_post_message_returns_ts() {
    let (base_url, seen) = stub_server(vec![(
        "chat.postMessage",
        json!({ "ok": true, "channel": "C01", "ts": "1700000000.000200" }),
    )])
    .await;
    let client = SlackClient::with_base_url(base_url, "xoxb-test", "xapp-test");

    let ts = client
        .post_message("C01", "1700000000.000100", "Working on: _q_")
        .await
        .unwrap();

    assert_eq!(ts, "1700000000.000200");
    assert_eq!(seen.lock()[0].1["thread_ts"], "1700000000.000100");
}
