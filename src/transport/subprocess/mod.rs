//! Subprocess transport for the query agent
//!
//! Spawns the agent as a child process and exchanges protocol lines with it
//! over stdin/stdout.

mod command;
mod config;
mod lifecycle;
mod reader;
mod transport;

// Re-export public types
pub use command::CommandBuilder;
pub use config::{DANGEROUS_ENV_VARS, SESSION_ENV_VAR, VERSION_ENV_VAR};
pub use transport::{SubprocessConnector, SubprocessTransport};
