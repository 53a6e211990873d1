//! Socket Mode envelope parsing

#![cfg(feature = "slack")]

use serde_json::json;

use slack_query_bridge::EventKind;
use slack_query_bridge::slack::{SocketEnvelope, envelope_ack, parse_events_api_payload};

#[test]
fn test_app_mention_envelope() {
    let raw = json!({
        "type": "events_api",
        "envelope_id": "env-1",
        "payload": {
            "event": {
                "type": "app_mention",
                "channel": "C01",
                "user": "U42",
                "ts": "1700000000.000100",
                "thread_ts": "1699999999.000001",
                "text": "<@U0BOT> revenue by region"
            }
        }
    });
    let envelope: SocketEnvelope = serde_json::from_value(raw).unwrap();
    assert_eq!(envelope.kind, "events_api");
    assert_eq!(envelope.envelope_id.as_deref(), Some("env-1"));

    let event = parse_events_api_payload(envelope.payload.as_ref().unwrap()).unwrap();
    assert_eq!(event.kind, EventKind::Mention);
    assert_eq!(event.channel_id, "C01");
    assert_eq!(event.reply_thread(), "1699999999.000001");
    assert_eq!(event.user_id.as_deref(), Some("U42"));
}

#[test]
fn test_bot_message_keeps_bot_id() {
    let payload = json!({
        "event": {
            "type": "message",
            "channel": "D01",
            "bot_id": "B01",
            "ts": "1.2",
            "text": "Working on: _x_"
        }
    });
    let event = parse_events_api_payload(&payload).unwrap();
    assert_eq!(event.kind, EventKind::Message);
    assert_eq!(event.bot_id.as_deref(), Some("B01"));
    assert_eq!(event.reply_thread(), "1.2");
}

#[test]
fn test_other_events_are_skipped() {
    let reaction = json!({ "event": { "type": "reaction_added", "reaction": "eyes" } });
    assert!(parse_events_api_payload(&reaction).is_none());

    let no_channel = json!({ "event": { "type": "message", "ts": "1.2", "text": "hi" } });
    assert!(parse_events_api_payload(&no_channel).is_none());

    let hello: SocketEnvelope =
        serde_json::from_value(json!({ "type": "hello", "num_connections": 1 })).unwrap();
    assert!(hello.envelope_id.is_none());
}

#[test]
fn test_envelope_ack_echoes_envelope_id() {
    let envelope: SocketEnvelope = serde_json::from_value(json!({
        "type": "events_api",
        "envelope_id": "env-7",
        "payload": {}
    }))
    .unwrap();
    let ack: serde_json::Value = serde_json::from_str(&envelope_ack(&envelope).unwrap()).unwrap();
    assert_eq!(ack, json!({ "envelope_id": "env-7" }));
}

#[test]
fn test_hello_needs_no_ack() {
    let envelope: SocketEnvelope =
        serde_json::from_value(json!({ "type": "hello", "num_connections": 1 })).unwrap();
    assert_eq!(envelope_ack(&envelope), None);
}
