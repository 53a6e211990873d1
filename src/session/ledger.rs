//! Bookkeeping for sessions owned by pipelines
//!
//! The manager never holds session handles itself (each pipeline owns its
//! own), so it keeps a ledger of what is alive and how sessions ended.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::state::SessionState;
use crate::types::identifiers::SessionId;

/// Snapshot of one live session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Session identifier
    pub session_id: SessionId,
    /// Current state
    pub state: SessionState,
    /// When the agent was started (wall-clock time)
    pub started_at: DateTime<Utc>,
}

/// Counters over the manager's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Sessions opened
    pub opened: u64,
    /// Sessions released through `close_session`
    pub closed: u64,
    /// Sessions dropped without `close_session`
    pub leaked: u64,
    /// Sessions currently alive
    pub live: usize,
}

#[derive(Default)]
pub(super) struct SessionLedger {
    live: Mutex<HashMap<SessionId, SessionInfo>>,
    opened: AtomicU64,
    closed: AtomicU64,
    leaked: AtomicU64,
}

impl SessionLedger {
    pub(super) fn opened(&self, session_id: &SessionId, started_at: DateTime<Utc>) {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.live.lock().insert(
            session_id.clone(),
            SessionInfo {
                session_id: session_id.clone(),
                state: SessionState::Created,
                started_at,
            },
        );
    }

    pub(super) fn update(&self, session_id: &SessionId, state: SessionState) {
        if let Some(info) = self.live.lock().get_mut(session_id) {
            info.state = state;
        }
    }

    pub(super) fn closed(&self, session_id: &SessionId) {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.live.lock().remove(session_id);
    }

    pub(super) fn leaked(&self, session_id: &SessionId) {
        self.leaked.fetch_add(1, Ordering::SeqCst);
        self.live.lock().remove(session_id);
    }

    pub(super) fn snapshot(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> = self.live.lock().values().cloned().collect();
        sessions.sort_by_key(|s| s.started_at);
        sessions
    }

    pub(super) fn stats(&self) -> SessionStats {
        SessionStats {
            opened: self.opened.load(Ordering::SeqCst),
            closed: self.closed.load(Ordering::SeqCst),
            leaked: self.leaked.load(Ordering::SeqCst),
            live: self.live.lock().len(),
        }
    }
}
