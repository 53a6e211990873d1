//! Session manager: open, ask, close
//!
//! One session answers exactly one question. `ask` drives the conversation
//! until a terminal message or the deadline; `close_session` must follow on
//! every path and is what releases the agent.

use std::sync::Arc;
use std::time::Duration;

use super::handle::SessionHandle;
use super::ledger::{SessionInfo, SessionLedger, SessionStats};
use super::state::SessionState;
use crate::config::{DEFAULT_DEADLINE, DatabaseHandle};
use crate::error::{BridgeError, Result};
use crate::protocol;
use crate::transport::{AgentConnector, AgentTransport, AgentLaunch, Shutdown};
use crate::types::identifiers::{RequestId, SessionId};
use crate::types::messages::{CAPABILITY_VIOLATION_CODE, ProtocolMessage, TabularResult};

/// Handle type produced by a manager over connector `C`
pub type SessionFor<C> = SessionHandle<<C as AgentConnector>::Transport>;

/// Owns the agent connector and the per-question deadline
pub struct SessionManager<C: AgentConnector> {
    connector: C,
    deadline: Duration,
    ledger: Arc<SessionLedger>,
}

impl<C: AgentConnector> SessionManager<C> {
    /// Create a manager with the default deadline
    pub fn new(connector: C) -> Self {
        Self::with_deadline(connector, DEFAULT_DEADLINE)
    }

    /// Create a manager whose `ask` gives up after `deadline`
    pub fn with_deadline(connector: C, deadline: Duration) -> Self {
        Self {
            connector,
            deadline,
            ledger: Arc::new(SessionLedger::default()),
        }
    }

    /// Deadline applied to each question
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// The underlying connector
    #[must_use]
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Start a new agent with read access to `database`
    ///
    /// # Errors
    /// Returns error if the agent cannot be started
    pub async fn open_session(&self, database: &Arc<DatabaseHandle>) -> Result<SessionFor<C>> {
        let launch = AgentLaunch {
            session_id: SessionId::generate(),
            database: Arc::clone(database),
        };
        let transport = self.connector.connect(&launch).await?;
        log::debug!("[{}] session opened", launch.session_id);
        Ok(SessionHandle::new(
            launch.session_id,
            transport,
            Arc::clone(&self.ledger),
        ))
    }

    /// Send `question` and wait for the agent's answer
    ///
    /// Progress messages are skipped. On timeout the agent is terminated before
    /// this returns. A session only ever takes one question.
    ///
    /// # Errors
    /// - `SessionNotReady` if the session was already asked
    /// - `MalformedMessage` for undecodable or out-of-place lines
    /// - `Agent` / `CapabilityViolation` when the agent reports failure
    /// - `UnexpectedEof` if the agent's output ends first
    /// - `Timeout` if the deadline elapses
    pub async fn ask(
        &self,
        session: &mut SessionFor<C>,
        request_id: &RequestId,
        question: &str,
    ) -> Result<TabularResult> {
        if session.state != SessionState::Created {
            return Err(BridgeError::SessionNotReady(session.session_id.to_string()));
        }
        session.transition(SessionState::Running);

        let outcome = tokio::time::timeout(self.deadline, converse(session, request_id, question)).await;

        match outcome {
            Ok(Ok(result)) => {
                session.transition(SessionState::Completed);
                Ok(result)
            }
            Ok(Err(e)) => {
                log::debug!("[{}] session failed: {e}", session.session_id);
                session.transition(SessionState::Failed);
                Err(e)
            }
            Err(_) => {
                session.transition(SessionState::TimedOut);
                if let Err(e) = session.release(Shutdown::Kill).await {
                    log::warn!("[{}] failed to terminate agent: {e}", session.session_id);
                }
                Err(BridgeError::timeout(format!(
                    "no answer within {}s",
                    self.deadline.as_secs_f64()
                )))
            }
        }
    }

    /// Release the session's agent
    ///
    /// Consumes the handle, so a session cannot be closed twice. Sessions that
    /// did not complete cleanly are killed rather than asked to exit.
    ///
    /// # Errors
    /// Returns error if shutting the transport down failed; the session is
    /// considered closed either way
    pub async fn close_session(&self, mut session: SessionFor<C>) -> Result<()> {
        let mode = session.state.shutdown_mode();
        let result = session.release(mode).await;
        let previous = session.state;
        session.transition(SessionState::Closed);
        self.ledger.closed(&session.session_id);
        log::debug!(
            "[{}] session closed from {previous} after {:?}",
            session.session_id,
            session.age()
        );
        result
    }

    /// Sessions that are currently open
    #[must_use]
    pub fn live_sessions(&self) -> Vec<SessionInfo> {
        self.ledger.snapshot()
    }

    /// Lifetime counters
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.ledger.stats()
    }
}

/// Send the question, then read until a terminal message
async fn converse<T: AgentTransport>(
    session: &mut SessionHandle<T>,
    request_id: &RequestId,
    question: &str,
) -> Result<TabularResult> {
    let frame = protocol::encode(&ProtocolMessage::Question {
        id: request_id.clone(),
        text: question.to_string(),
    })?;
    session.transport.write(&frame).await?;

    loop {
        let line = match session.transport.next_line().await {
            Some(line) => line?,
            None => return Err(BridgeError::UnexpectedEof),
        };
        session.touch();

        match protocol::decode(&line)? {
            ProtocolMessage::PartialOutput { text } => {
                log::debug!("[{}] partial: {}", session.session_id, preview(&text));
            }
            ProtocolMessage::ToolCallNotice { tool, denied, .. } => {
                if denied {
                    return Err(BridgeError::CapabilityViolation(format!(
                        "tool `{tool}` was denied"
                    )));
                }
                log::debug!("[{}] tool call: {tool}", session.session_id);
            }
            ProtocolMessage::FinalResult(result) => return Ok(result),
            ProtocolMessage::Error { message, code } => {
                return Err(if code.as_deref() == Some(CAPABILITY_VIOLATION_CODE) {
                    BridgeError::CapabilityViolation(message)
                } else {
                    BridgeError::agent(message, code)
                });
            }
            ProtocolMessage::Question { .. } => {
                return Err(BridgeError::malformed(
                    "agent sent a question message",
                    None,
                ));
            }
        }
    }
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(80).collect();
    if text.chars().count() > 80 {
        out.push_str("...");
    }
    out
}
