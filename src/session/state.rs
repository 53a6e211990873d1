//! Session state machine
//!
//! ```text
//! CREATED ──ask──▶ RUNNING ──▶ COMPLETED | FAILED | TIMED_OUT
//!    │                │                    │
//!    └────────────────┴──── close ─────────┴──▶ CLOSED
//! ```

use crate::transport::Shutdown;

/// Lifecycle state of one agent session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Agent started, no question sent yet
    Created,
    /// Question sent, awaiting a terminal message
    Running,
    /// A final result arrived
    Completed,
    /// Decode failure, agent error, capability violation or early EOF
    Failed,
    /// The deadline elapsed before a terminal message
    TimedOut,
    /// Released; nothing further may happen
    Closed,
}

impl SessionState {
    /// Whether the move from `self` to `next` is part of the state machine
    #[must_use]
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Created, Running) => true,
            (Running, Completed | Failed | TimedOut) => true,
            _ => false,
        }
    }

    /// Whether the conversation has ended (closing is all that is left)
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }

    /// How the transport should be released from this state
    ///
    /// Only sessions that ended cleanly (or never started) get a graceful exit.
    #[must_use]
    pub fn shutdown_mode(self) -> Shutdown {
        match self {
            Self::Created | Self::Completed | Self::Closed => Shutdown::Graceful,
            Self::Running | Self::Failed | Self::TimedOut => Shutdown::Kill,
        }
    }

    /// Upper-case name used in logs
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::TimedOut => "TIMED_OUT",
            Self::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
