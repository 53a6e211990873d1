//! # Slack Query Bridge
//!
//! Answers data questions asked in Slack by handing each one to a fresh,
//! read-only query agent subprocess and posting the result back as a CSV.
//!
//! ## Flow
//!
//! ```text
//! Slack event ─▶ ChatEventBridge ─▶ Coordinator ─▶ SessionManager ─▶ agent
//!                                                        │
//!               thread reply + results.csv ◀── format ◀──┘
//! ```
//!
//! ## Quick Start
//!
//! Asking one question without Slack:
//!
//! ```no_run
//! use std::sync::Arc;
//! use slack_query_bridge::{
//!     AgentConfig, DatabaseHandle, RequestId, SessionManager, SubprocessConnector,
//! };
//!
//! # async fn example() -> slack_query_bridge::Result<()> {
//! let database = Arc::new(DatabaseHandle::open(&["sales=./sales.duckdb".into()], None)?);
//! let connector = SubprocessConnector::new(AgentConfig::resolve(None)?);
//! let sessions = SessionManager::new(connector);
//!
//! let mut session = sessions.open_session(&database).await?;
//! let answer = sessions
//!     .ask(&mut session, &RequestId::generate(), "Top 5 customers by revenue?")
//!     .await;
//! sessions.close_session(session).await?;
//!
//! let csv = slack_query_bridge::format::format(&answer?)?;
//! println!("{}", csv.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Agent protocol
//!
//! One JSON object per line, tagged by `"type"`. See [`ProtocolMessage`].
//!
//! ## Features
//!
//! - `slack` (default): the Socket Mode listener and Web API client, plus
//!   the `slack-query-bridge` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bridge;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod format;
pub mod protocol;
pub mod session;
#[cfg(feature = "slack")]
pub mod slack;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use bridge::{ChatEventBridge, ChatTransport, Disposition, run_query};
pub use config::{AgentConfig, BridgeConfig, DatabaseAttachment, DatabaseHandle};
pub use coordinator::Coordinator;
pub use error::{BridgeError, ErrorCategory, Result};
pub use format::CsvArtifact;
pub use session::{SessionHandle, SessionManager, SessionState, SessionStats};
pub use transport::{
    AgentConnector, AgentTransport, AgentLaunch, Shutdown, SubprocessConnector,
    SubprocessTransport,
};
pub use types::identifiers::{RequestId, SessionId};
pub use types::messages::{ProtocolMessage, Scalar, TabularResult};
pub use types::request::{ChatEvent, EventKind, QueryRequest};

#[cfg(feature = "slack")]
pub use slack::{SlackClient, SocketModeListener};

/// Version of the bridge
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
