//! Chat event bridge
//!
//! Turns chat events into query requests and posts the answers back:
//!
//! ```text
//! event ─▶ extract question ─▶ coordinator ─▶ run_query ─▶ reply in thread
//!                │ empty                          │ error
//!                └─▶ usage hint                   └─▶ category message
//! ```
//!
//! Each event is handled on its own task, so a slow question never holds up
//! the event stream or other channels.

mod mention;
mod pipeline;

pub use mention::{contains_mention, extract_question, should_handle, strip_mentions};
pub use pipeline::run_query;

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::DatabaseHandle;
use crate::coordinator::Coordinator;
use crate::error::{BridgeError, ErrorCategory, Result};
use crate::format::CsvArtifact;
use crate::session::SessionManager;
use crate::transport::AgentConnector;
use crate::types::request::{ChatEvent, EventKind, QueryRequest};

/// Reaction added to every mention as soon as it arrives
pub const ACK_REACTION: &str = "eyes";

/// Longest question prefix written to the log
const LOG_PREVIEW_CHARS: usize = 80;

/// Outbound side of the chat platform
pub trait ChatTransport: Send + Sync {
    /// React to a message
    ///
    /// # Errors
    /// Returns `BridgeError::Transport` if the platform rejects the call
    fn add_reaction(
        &self,
        channel: &str,
        message_id: &str,
        name: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Post a text message into a thread, returning the new message's ID
    ///
    /// # Errors
    /// Returns `BridgeError::Transport` if the platform rejects the call
    fn post_message(
        &self,
        channel: &str,
        thread: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Replace the text of a message posted earlier
    ///
    /// # Errors
    /// Returns `BridgeError::Transport` if the platform rejects the call
    fn update_message(
        &self,
        channel: &str,
        message_id: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Attach a file to a thread
    ///
    /// # Errors
    /// Returns `BridgeError::Transport` if the platform rejects the call
    fn upload_file(
        &self,
        channel: &str,
        thread: &str,
        artifact: &CsvArtifact,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// What the bridge did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Not addressed to the bridge
    Ignored,
    /// No question after the mention; the usage hint was posted
    UsageHint,
    /// The CSV was produced (and delivered unless the upload failed)
    Answered {
        /// Data rows in the result
        rows: usize,
        /// Columns in the result
        columns: usize,
    },
    /// The pipeline failed; the category message was posted
    Failed(ErrorCategory),
}

/// Connects the chat transport to the session manager
pub struct ChatEventBridge<C: AgentConnector, T: ChatTransport> {
    sessions: Arc<SessionManager<C>>,
    coordinator: Coordinator,
    chat: Arc<T>,
    database: Arc<DatabaseHandle>,
}

impl<C, T> ChatEventBridge<C, T>
where
    C: AgentConnector + 'static,
    T: ChatTransport + 'static,
{
    /// Create a bridge over shared components
    pub fn new(
        sessions: Arc<SessionManager<C>>,
        coordinator: Coordinator,
        chat: Arc<T>,
        database: Arc<DatabaseHandle>,
    ) -> Self {
        Self {
            sessions,
            coordinator,
            chat,
            database,
        }
    }

    /// The session manager
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionManager<C>> {
        &self.sessions
    }

    /// The admission coordinator
    #[must_use]
    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Consume events until the channel closes, one task per event
    ///
    /// Returns the pipelines still running once the channel is closed, so the
    /// caller can wait for them or abort them.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<ChatEvent>,
    ) -> JoinSet<Disposition> {
        let mut tasks = JoinSet::new();
        while let Some(event) = events.recv().await {
            let bridge = Arc::clone(&self);
            tasks.spawn(async move { bridge.on_event(event).await });

            while let Some(done) = tasks.try_join_next() {
                if let Err(e) = done {
                    log::error!("Event task failed: {e}");
                }
            }
        }
        log::info!(
            "Chat event stream closed ({} pipeline(s) still running)",
            tasks.len()
        );
        tasks
    }

    /// Handle one event to completion
    ///
    /// Plain messages with no text are dropped silently; only mentions get the
    /// usage hint.
    pub async fn on_event(&self, event: ChatEvent) -> Disposition {
        if !should_handle(&event) {
            return Disposition::Ignored;
        }
        if event.kind == EventKind::Message && extract_question(&event).is_empty() {
            return Disposition::Ignored;
        }
        self.on_mention(event).await
    }

    /// Answer the question carried by `event`
    ///
    /// Does not check whether the event is addressed to the bridge; use
    /// [`on_event`](Self::on_event) for raw events.
    pub async fn on_mention(&self, event: ChatEvent) -> Disposition {
        let question = extract_question(&event);
        let thread = event.reply_thread().to_string();

        // Mentions are acknowledged before anything else, blank ones included
        if event.kind == EventKind::Mention
            && let Err(e) = self
                .chat
                .add_reaction(&event.channel_id, &event.message_id, ACK_REACTION)
                .await
        {
            log::debug!("[{}] could not add reaction: {e}", event.channel_id);
        }

        if question.is_empty() {
            let hint = BridgeError::EmptyQuestion.user_message();
            if let Err(e) = self.chat.post_message(&event.channel_id, &thread, &hint).await {
                log::warn!("[{}] failed to post usage hint: {e}", event.channel_id);
            }
            return Disposition::UsageHint;
        }

        let request = QueryRequest::from_event(&event, question);
        log::info!(
            "[{}] → {}",
            request.origin_channel_id,
            preview(&request.question_text)
        );

        let ack = match self
            .chat
            .post_message(
                &request.origin_channel_id,
                &request.origin_thread_id,
                &format!("Working on: _{}_", request.question_text),
            )
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("[{}] failed to acknowledge: {e}", request.request_id);
                None
            }
        };

        let outcome = self
            .coordinator
            .submit(&request, || {
                run_query(&self.sessions, &self.database, &request)
            })
            .await;

        match outcome {
            Ok(artifact) => {
                let summary = artifact.summary();
                self.reply(&request, ack.as_deref(), &summary).await;
                if let Err(e) = self
                    .chat
                    .upload_file(&request.origin_channel_id, &request.origin_thread_id, &artifact)
                    .await
                {
                    log::warn!("[{}] failed to upload results: {e}", request.request_id);
                }
                log::info!("[{}] ✓ {summary}", request.origin_channel_id);
                Disposition::Answered {
                    rows: artifact.row_count,
                    columns: artifact.column_count,
                }
            }
            Err(e) => {
                let category = e.category();
                log::warn!(
                    "[{}] {} ({}): {e}",
                    request.origin_channel_id,
                    request.request_id,
                    category
                );
                self.reply(&request, ack.as_deref(), &e.user_message()).await;
                Disposition::Failed(category)
            }
        }
    }

    /// Update the acknowledgement, or post anew if there is none
    async fn reply(&self, request: &QueryRequest, ack: Option<&str>, body: &str) {
        let text = format!("*Query:* _{}_\n\n{body}", request.question_text);
        let result = match ack {
            Some(ack) => {
                self.chat
                    .update_message(&request.origin_channel_id, ack, &text)
                    .await
            }
            None => self
                .chat
                .post_message(&request.origin_channel_id, &request.origin_thread_id, &text)
                .await
                .map(|_| ()),
        };
        if let Err(e) = result {
            log::warn!("[{}] failed to post reply: {e}", request.request_id);
        }
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > LOG_PREVIEW_CHARS {
        let head: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
