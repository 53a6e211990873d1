//! Line codec for the agent protocol

use serde_json::json;

use slack_query_bridge::error::BridgeError;
use slack_query_bridge::protocol::{decode, encode};
use slack_query_bridge::{ErrorCategory, ProtocolMessage, RequestId, Scalar};

#[test]
fn test_encode_question_is_one_line() {
    let msg = ProtocolMessage::Question {
        id: RequestId::new("req-1"),
        text: "How many orders\nshipped last week?".to_string(),
    };
    let line = encode(&msg).unwrap();

    assert!(line.ends_with('\n'));
    assert_eq!(line.matches('\n').count(), 1);

    let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(value["type"], "question");
    assert_eq!(value["id"], "req-1");
    assert_eq!(value["text"], "How many orders\nshipped last week?");
}

#[test]
fn test_decode_each_kind() {
    let partial = decode(r#"{"type":"partial_output","text":"Looking at tables..."}"#).unwrap();
    assert_eq!(
        partial,
        ProtocolMessage::PartialOutput {
            text: "Looking at tables...".to_string()
        }
    );
    assert!(!partial.is_terminal());

    let notice = decode(r#"{"type":"tool_call_notice","tool":"query","input":{"sql":"SELECT 1"}}"#)
        .unwrap();
    match notice {
        ProtocolMessage::ToolCallNotice {
            tool,
            input,
            denied,
        } => {
            assert_eq!(tool, "query");
            assert_eq!(input, Some(json!({ "sql": "SELECT 1" })));
            assert!(!denied);
        }
        other => panic!("unexpected message: {other:?}"),
    }

    let error = decode(r#"{"type":"error","message":"no such table: orders"}"#).unwrap();
    assert!(error.is_terminal());
    assert_eq!(error.kind(), "error");
}

#[test]
fn test_decode_final_result_scalars() {
    let line = r#"{"type":"final_result","columns":["name","revenue","active","note"],
        "rows":[["Acme",100,true,null],["Globex",2.5,false,"x"]]}"#
        .replace('\n', "");
    let msg = decode(&line).unwrap();

    let ProtocolMessage::FinalResult(result) = msg else {
        panic!("expected final_result");
    };
    assert_eq!(result.columns, vec!["name", "revenue", "active", "note"]);
    assert_eq!(result.row_count(), 2);
    assert_eq!(result.rows[0][0], Scalar::from("Acme"));
    assert_eq!(result.rows[0][1], Scalar::from(100_i64));
    assert_eq!(result.rows[0][2], Scalar::Bool(true));
    assert_eq!(result.rows[0][3], Scalar::Null);
    assert_eq!(result.rows[1][1].to_field().as_deref(), Some("2.5"));
}

#[test]
fn test_decode_final_result_without_rows() {
    let msg = decode(r#"{"type":"final_result","columns":["a"]}"#).unwrap();
    let ProtocolMessage::FinalResult(result) = msg else {
        panic!("expected final_result");
    };
    assert_eq!(result.row_count(), 0);
    assert_eq!(result.column_count(), 1);
}

#[test]
fn test_decode_tolerates_trailing_newline() {
    let msg = decode("{\"type\":\"partial_output\",\"text\":\"hi\"}\r\n").unwrap();
    assert_eq!(msg.kind(), "partial_output");
}

#[test]
fn test_decode_rejects_malformed_lines() {
    for line in [
        "",
        "   ",
        "not valid json",
        r#"{"text":"no tag"}"#,
        r#"{"type":"telemetry","text":"unknown tag"}"#,
        r#"{"type":"final_result"}"#,
        r#"{"type":"final_result","columns":["a"],"rows":[[[1,2]]]}"#,
    ] {
        let err = decode(line).unwrap_err();
        assert_eq!(
            err.category(),
            ErrorCategory::MalformedMessage,
            "line {line:?} gave {err}"
        );
    }
}

#[test]
fn test_decode_rejects_ragged_rows() {
    let err = decode(r#"{"type":"final_result","columns":["a","b"],"rows":[["x","y"],["z"]]}"#)
        .unwrap_err();
    match err {
        BridgeError::MalformedMessage { message, .. } => {
            assert!(message.contains("row 1"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_decode_keeps_bad_line_for_diagnostics() {
    let err = decode("{oops").unwrap_err();
    match err {
        BridgeError::MalformedMessage { line, .. } => assert_eq!(line.as_deref(), Some("{oops")),
        other => panic!("unexpected error: {other:?}"),
    }
}
