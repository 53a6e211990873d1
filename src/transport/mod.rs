//! Transport layer for talking to the query agent
//!
//! The session manager only needs three things from an agent: write a line,
//! read the next line, and shut down. [`AgentConnector`] opens a fresh
//! [`AgentTransport`] per session; the subprocess implementation lives in
//! [`subprocess`], and tests substitute scripted fakes.

pub mod subprocess;

use std::sync::Arc;

use crate::config::DatabaseHandle;
use crate::error::Result;
use crate::types::identifiers::SessionId;

/// How a transport should be shut down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Close input and give the agent its grace period to exit
    Graceful,
    /// Terminate immediately
    Kill,
}

/// Everything a connector needs to start one agent session
#[derive(Debug, Clone)]
pub struct AgentLaunch {
    /// Session being started
    pub session_id: SessionId,
    /// Databases and startup statements, shared by all sessions
    pub database: Arc<DatabaseHandle>,
}

/// A live connection to one agent
pub trait AgentTransport: Send {
    /// Write one encoded frame (newline included)
    ///
    /// # Errors
    /// Returns error if the agent's input is closed or the write fails
    fn write(&mut self, data: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Read the next frame
    ///
    /// Returns `None` once the agent's output has ended.
    fn next_line(&mut self) -> impl std::future::Future<Output = Option<Result<String>>> + Send;

    /// Release the connection and whatever process backs it
    ///
    /// # Errors
    /// Returns error if cleanup fails; the connection is released regardless
    fn close(&mut self, mode: Shutdown) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Opens agent transports
pub trait AgentConnector: Send + Sync {
    /// Transport produced by this connector
    type Transport: AgentTransport + 'static;

    /// Start a new agent for `launch`
    ///
    /// # Errors
    /// Returns error if the agent cannot be started
    fn connect(
        &self,
        launch: &AgentLaunch,
    ) -> impl std::future::Future<Output = Result<Self::Transport>> + Send;
}

pub use subprocess::{SubprocessConnector, SubprocessTransport};
