//! Handle to one agent session

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::Instant;

use super::ledger::SessionLedger;
use super::state::SessionState;
use crate::error::Result;
use crate::transport::{AgentTransport, Shutdown};
use crate::types::identifiers::SessionId;

/// Exclusive owner of one agent transport
///
/// Obtained from `SessionManager::open_session` and given back through
/// `SessionManager::close_session`, which consumes it. Dropping a handle
/// without closing it is a bug: it is logged and counted as a leak.
pub struct SessionHandle<T: AgentTransport> {
    pub(super) session_id: SessionId,
    pub(super) transport: T,
    pub(super) state: SessionState,
    pub(super) started_at: DateTime<Utc>,
    pub(super) start: Instant,
    pub(super) last_activity: Instant,
    /// Transport already shut down (forced termination on timeout)
    pub(super) released: bool,
    pub(super) ledger: Arc<SessionLedger>,
}

impl<T: AgentTransport> SessionHandle<T> {
    pub(super) fn new(session_id: SessionId, transport: T, ledger: Arc<SessionLedger>) -> Self {
        let now = Instant::now();
        let started_at = Utc::now();
        ledger.opened(&session_id, started_at);
        Self {
            session_id,
            transport,
            state: SessionState::Created,
            started_at,
            start: now,
            last_activity: now,
            released: false,
            ledger,
        }
    }

    /// Session identifier
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.session_id
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// When the agent was started (wall-clock time)
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time since the agent was started
    #[must_use]
    pub fn age(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    /// Time since the agent last produced a line
    #[must_use]
    pub fn idle(&self) -> std::time::Duration {
        self.last_activity.elapsed()
    }

    pub(super) fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub(super) fn transition(&mut self, next: SessionState) {
        if !self.state.can_transition_to(next) {
            log::error!(
                "[{}] invalid session transition {} -> {}",
                self.session_id,
                self.state,
                next
            );
            return;
        }
        log::debug!("[{}] {} -> {}", self.session_id, self.state, next);
        self.state = next;
        self.ledger.update(&self.session_id, next);
    }

    /// Shut the transport down once; later calls are no-ops
    pub(super) async fn release(&mut self, mode: Shutdown) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.transport.close(mode).await
    }
}

impl<T: AgentTransport> Drop for SessionHandle<T> {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            log::error!(
                "[{}] session dropped in state {} without close_session",
                self.session_id,
                self.state
            );
            self.ledger.leaked(&self.session_id);
        }
    }
}

impl<T: AgentTransport> std::fmt::Debug for SessionHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .field("state", &self.state)
            .field("started_at", &self.started_at)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
