//! Agent session management
//!
//! [`SessionManager`] opens one agent per question through an
//! [`AgentConnector`](crate::transport::AgentConnector), asks it, and closes it.
//!
//! # Module Structure
//!
//! - `manager` - `SessionManager` with `open_session` / `ask` / `close_session`
//! - `handle` - `SessionHandle`, the exclusive owner of a transport
//! - `state` - the session state machine
//! - `ledger` - bookkeeping of live sessions and lifetime counters

mod handle;
mod ledger;
mod manager;
mod state;

pub use handle::SessionHandle;
pub use ledger::{SessionInfo, SessionStats};
pub use manager::{SessionFor, SessionManager};
pub use state::SessionState;
