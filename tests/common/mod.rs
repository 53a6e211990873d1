//! Scripted fakes shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::json;

use slack_query_bridge::error::{BridgeError, Result};
use slack_query_bridge::{
    AgentConnector, AgentTransport, ChatEvent, ChatTransport, CsvArtifact, EventKind, AgentLaunch,
    Shutdown,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Protocol lines
// ============================================================================

pub fn final_result(columns: &[&str], rows: serde_json::Value) -> String {
    json!({ "type": "final_result", "columns": columns, "rows": rows }).to_string()
}

pub fn partial(text: &str) -> String {
    json!({ "type": "partial_output", "text": text }).to_string()
}

pub fn tool_call(tool: &str) -> String {
    json!({ "type": "tool_call_notice", "tool": tool, "input": { "sql": "SELECT 1" } }).to_string()
}

pub fn agent_error(message: &str, code: Option<&str>) -> String {
    match code {
        Some(code) => json!({ "type": "error", "message": message, "code": code }),
        None => json!({ "type": "error", "message": message }),
    }
    .to_string()
}

// ============================================================================
// Fake agent
// ============================================================================

/// What one fake agent does after receiving its question
#[derive(Debug, Clone)]
pub enum Script {
    /// Emit these lines, then end the stream
    Respond(Vec<String>),
    /// Emit these lines, then go silent without closing
    RespondThenHang(Vec<String>),
    /// Refuse to start
    FailToStart,
}

#[derive(Debug, Default)]
pub struct Counters {
    pub connects: AtomicUsize,
    pub closes: AtomicUsize,
    pub kills: AtomicUsize,
    pub written: Mutex<Vec<String>>,
}

impl Counters {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

/// Hands out fake agents following queued scripts
///
/// Once the queue is empty every new agent follows the fallback script.
pub struct FakeConnector {
    scripts: Mutex<VecDeque<Script>>,
    fallback: Script,
    pub counters: Arc<Counters>,
}

impl FakeConnector {
    pub fn new(fallback: Script) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            fallback,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn answering(lines: Vec<String>) -> Self {
        Self::new(Script::Respond(lines))
    }

    pub fn then(self, script: Script) -> Self {
        self.scripts.lock().push_back(script);
        self
    }
}

impl AgentConnector for FakeConnector {
    type Transport = FakeTransport;

    async fn connect(&self, _launch: &AgentLaunch) -> Result<FakeTransport> {
        let script = self
            .scripts
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        let (lines, hang) = match script {
            Script::Respond(lines) => (lines, false),
            Script::RespondThenHang(lines) => (lines, true),
            Script::FailToStart => return Err(BridgeError::spawn("fake agent refused to start")),
        };
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        Ok(FakeTransport {
            lines: lines.into(),
            hang,
            counters: Arc::clone(&self.counters),
        })
    }
}

pub struct FakeTransport {
    lines: VecDeque<String>,
    hang: bool,
    counters: Arc<Counters>,
}

impl AgentTransport for FakeTransport {
    async fn write(&mut self, data: &str) -> Result<()> {
        self.counters.written.lock().push(data.to_string());
        Ok(())
    }

    async fn next_line(&mut self) -> Option<Result<String>> {
        if let Some(line) = self.lines.pop_front() {
            return Some(Ok(line));
        }
        if self.hang {
            std::future::pending::<()>().await;
        }
        None
    }

    async fn close(&mut self, mode: Shutdown) -> Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        if mode == Shutdown::Kill {
            self.counters.kills.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

// ============================================================================
// Fake chat
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCall {
    Reaction {
        channel: String,
        message_id: String,
        name: String,
    },
    Post {
        channel: String,
        thread: String,
        text: String,
    },
    Update {
        channel: String,
        message_id: String,
        text: String,
    },
    Upload {
        channel: String,
        thread: String,
        filename: String,
        bytes: Vec<u8>,
    },
}

/// Records every outbound call; posted messages get sequential IDs
#[derive(Debug, Default)]
pub struct FakeChat {
    pub calls: Mutex<Vec<ChatCall>>,
    pub next_id: AtomicUsize,
    pub fail_uploads: bool,
}

impl FakeChat {
    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().clone()
    }

    pub fn posts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ChatCall::Post { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ChatCall::Update { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn uploads(&self) -> Vec<ChatCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, ChatCall::Upload { .. }))
            .collect()
    }
}

impl ChatTransport for FakeChat {
    async fn add_reaction(&self, channel: &str, message_id: &str, name: &str) -> Result<()> {
        self.calls.lock().push(ChatCall::Reaction {
            channel: channel.to_string(),
            message_id: message_id.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }

    async fn post_message(&self, channel: &str, thread: &str, text: &str) -> Result<String> {
        self.calls.lock().push(ChatCall::Post {
            channel: channel.to_string(),
            thread: thread.to_string(),
            text: text.to_string(),
        });
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(format!("posted-{id}"))
    }

    async fn update_message(&self, channel: &str, message_id: &str, text: &str) -> Result<()> {
        self.calls.lock().push(ChatCall::Update {
            channel: channel.to_string(),
            message_id: message_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn upload_file(&self, channel: &str, thread: &str, artifact: &CsvArtifact) -> Result<()> {
        if self.fail_uploads {
            return Err(BridgeError::transport("files.completeUploadExternal: not_in_channel"));
        }
        self.calls.lock().push(ChatCall::Upload {
            channel: channel.to_string(),
            thread: thread.to_string(),
            filename: artifact.filename.clone(),
            bytes: artifact.bytes.clone(),
        });
        Ok(())
    }
}

pub fn mention(text: &str) -> ChatEvent {
    ChatEvent {
        kind: EventKind::Mention,
        channel_id: "C01".to_string(),
        message_id: "1700000000.000100".to_string(),
        thread_id: None,
        user_id: Some("U42".to_string()),
        bot_id: None,
        subtype: None,
        text: text.to_string(),
    }
}

pub fn message(text: &str) -> ChatEvent {
    ChatEvent {
        kind: EventKind::Message,
        ..mention(text)
    }
}
