//! Type definitions shared across the bridge
//!
//! - [`identifiers`] - Type-safe ID wrappers (`RequestId`, `SessionId`)
//! - [`messages`] - Agent protocol messages and tabular results
//! - [`request`] - Inbound chat events and query requests

pub mod identifiers;
pub mod messages;
pub mod request;

// Re-export commonly used types
pub use identifiers::{RequestId, SessionId};
pub use messages::{CAPABILITY_VIOLATION_CODE, ProtocolMessage, Scalar, TabularResult};
pub use request::{ChatEvent, EventKind, QueryRequest};
