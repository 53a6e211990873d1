//! Inbound chat events and the query requests built from them

use serde::{Deserialize, Serialize};

use super::identifiers::RequestId;

/// How an inbound event addressed the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The bot was @-mentioned
    Mention,
    /// A plain message, e.g. in a direct conversation with the bot
    Message,
}

/// A chat event as delivered by the chat transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Mention or plain message
    pub kind: EventKind,
    /// Channel the event was posted in
    pub channel_id: String,
    /// ID (timestamp) of the triggering message
    pub message_id: String,
    /// Thread the message belongs to, if it is a reply
    pub thread_id: Option<String>,
    /// Author of the message
    pub user_id: Option<String>,
    /// Set when the author is a bot
    pub bot_id: Option<String>,
    /// Message subtype (edits, joins, ...)
    pub subtype: Option<String>,
    /// Raw message text, mention tokens included
    pub text: String,
}

impl ChatEvent {
    /// Thread replies should land in
    ///
    /// Messages outside a thread start one rooted at themselves.
    #[must_use]
    pub fn reply_thread(&self) -> &str {
        self.thread_id.as_deref().unwrap_or(&self.message_id)
    }
}

/// An accepted question, immutable for its lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Unique per accepted event
    pub request_id: RequestId,
    /// Channel to reply in
    pub origin_channel_id: String,
    /// Thread to reply in
    pub origin_thread_id: String,
    /// Message that triggered the request
    pub origin_message_id: String,
    /// Who asked
    pub requesting_user_id: Option<String>,
    /// Question with the mention stripped
    pub question_text: String,
}

impl QueryRequest {
    /// Build a request for `question` from the event that carried it
    #[must_use]
    pub fn from_event(event: &ChatEvent, question: String) -> Self {
        Self {
            request_id: RequestId::generate(),
            origin_channel_id: event.channel_id.clone(),
            origin_thread_id: event.reply_thread().to_string(),
            origin_message_id: event.message_id.clone(),
            requesting_user_id: event.user_id.clone(),
            question_text: question,
        }
    }
}
