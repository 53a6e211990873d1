//! Socket Mode event source
//!
//! Opens a WebSocket with the app token, acknowledges every envelope and
//! forwards mention and message events to the bridge. The connection is
//! re-established whenever Slack asks for it or the socket drops.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use super::api::SlackClient;
use super::events::{SocketEnvelope, parse_events_api_payload};
use crate::error::{BridgeError, Result};
use crate::types::request::ChatEvent;

/// Acknowledgement frame for an envelope, if it expects one
pub fn envelope_ack(envelope: &SocketEnvelope) -> Option<String> {
    envelope
        .envelope_id
        .as_ref()
        .map(|id| json!({ "envelope_id": id }).to_string())
}

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Why a WebSocket session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// Slack asked us to reconnect, or the socket closed
    Reconnect,
    /// The bridge stopped consuming events
    ReceiverGone,
}

/// Long-running Socket Mode listener
#[derive(Debug, Clone)]
pub struct SocketModeListener {
    client: SlackClient,
}

impl SocketModeListener {
    /// Listen using `client`'s app token
    pub fn new(client: SlackClient) -> Self {
        Self { client }
    }

    /// Forward events into `events` until its receiver is dropped
    ///
    /// Connection failures are retried with exponential back-off.
    ///
    /// # Errors
    /// Never returns an error today; the `Result` leaves room for fatal
    /// conditions such as a revoked app token
    pub async fn run(self, events: mpsc::Sender<ChatEvent>) -> Result<()> {
        let mut backoff = INITIAL_BACKOFF;
        loop {
            let outcome = match self.client.open_connection().await {
                Ok(url) => self.session(&url, &events).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(SessionEnd::ReceiverGone) => return Ok(()),
                Ok(SessionEnd::Reconnect) => {
                    backoff = INITIAL_BACKOFF;
                    log::info!("Reconnecting to Slack");
                }
                Err(e) => {
                    log::warn!("Slack connection failed: {e}; retrying in {backoff:?}");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }

            if events.is_closed() {
                return Ok(());
            }
        }
    }

    async fn session(&self, url: &str, events: &mpsc::Sender<ChatEvent>) -> Result<SessionEnd> {
        let (socket, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| BridgeError::transport(format!("websocket connect: {e}")))?;
        let (mut write, mut read) = socket.split();

        while let Some(frame) = read.next().await {
            let frame = frame.map_err(|e| BridgeError::transport(format!("websocket: {e}")))?;
            let text = match frame {
                Message::Text(text) => text,
                Message::Ping(payload) => {
                    write
                        .send(Message::Pong(payload))
                        .await
                        .map_err(|e| BridgeError::transport(format!("websocket: {e}")))?;
                    continue;
                }
                Message::Close(_) => return Ok(SessionEnd::Reconnect),
                _ => continue,
            };

            let envelope: SocketEnvelope = match serde_json::from_str(&text) {
                Ok(envelope) => envelope,
                Err(e) => {
                    log::debug!("Skipping unparseable envelope: {e}");
                    continue;
                }
            };

            if let Some(ack) = envelope_ack(&envelope) {
                write
                    .send(Message::Text(ack))
                    .await
                    .map_err(|e| BridgeError::transport(format!("websocket: {e}")))?;
            }

            match envelope.kind.as_str() {
                "hello" => log::info!("Connected to Slack (Socket Mode)"),
                "disconnect" => {
                    log::info!(
                        "Slack requested reconnect ({})",
                        envelope.reason.as_deref().unwrap_or("no reason")
                    );
                    return Ok(SessionEnd::Reconnect);
                }
                "events_api" => {
                    let Some(event) = envelope.payload.as_ref().and_then(parse_events_api_payload)
                    else {
                        continue;
                    };
                    if events.send(event).await.is_err() {
                        return Ok(SessionEnd::ReceiverGone);
                    }
                }
                other => log::debug!("Ignoring {other} envelope"),
            }
        }

        Ok(SessionEnd::Reconnect)
    }
}
