//! Slack event payloads and their conversion into chat events

use serde::Deserialize;

use crate::types::request::{ChatEvent, EventKind};

/// A Socket Mode envelope
#[derive(Debug, Clone, Deserialize)]
pub struct SocketEnvelope {
    /// Envelope type: `hello`, `events_api`, `disconnect`, ...
    #[serde(rename = "type")]
    pub kind: String,
    /// Present on envelopes that must be acknowledged
    #[serde(default)]
    pub envelope_id: Option<String>,
    /// Envelope payload
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    /// Reason given with `disconnect` envelopes
    #[serde(default)]
    pub reason: Option<String>,
}

/// The inner event of an `events_api` payload
#[derive(Debug, Clone, Deserialize)]
pub struct SlackEvent {
    /// Event type
    #[serde(rename = "type")]
    pub kind: String,
    /// Channel ID
    #[serde(default)]
    pub channel: Option<String>,
    /// Message timestamp (its ID)
    #[serde(default)]
    pub ts: Option<String>,
    /// Parent thread timestamp
    #[serde(default)]
    pub thread_ts: Option<String>,
    /// Author
    #[serde(default)]
    pub user: Option<String>,
    /// Set for bot authors
    #[serde(default)]
    pub bot_id: Option<String>,
    /// Message subtype
    #[serde(default)]
    pub subtype: Option<String>,
    /// Message text
    #[serde(default)]
    pub text: Option<String>,
}

impl SlackEvent {
    /// Convert into a chat event, if this is a mention or a message
    #[must_use]
    pub fn into_chat_event(self) -> Option<ChatEvent> {
        let kind = match self.kind.as_str() {
            "app_mention" => EventKind::Mention,
            "message" => EventKind::Message,
            _ => return None,
        };
        Some(ChatEvent {
            kind,
            channel_id: self.channel?,
            message_id: self.ts?,
            thread_id: self.thread_ts,
            user_id: self.user,
            bot_id: self.bot_id,
            subtype: self.subtype,
            text: self.text.unwrap_or_default(),
        })
    }
}

/// Pull the chat event out of an `events_api` payload
#[must_use]
pub fn parse_events_api_payload(payload: &serde_json::Value) -> Option<ChatEvent> {
    let event = payload.get("event")?;
    let event: SlackEvent = match serde_json::from_value(event.clone()) {
        Ok(event) => event,
        Err(e) => {
            log::debug!("Skipping unparseable Slack event: {e}");
            return None;
        }
    };
    event.into_chat_event()
}
