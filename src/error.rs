//! Error types for the query bridge
//!
//! Everything that can go wrong inside a pipeline is a [`BridgeError`]. Before
//! anything reaches the chat surface it is folded into one of the five
//! [`ErrorCategory`] values, each of which has a fixed user-facing message.

use thiserror::Error;

/// Longest agent-supplied summary we are willing to echo back into chat
const MAX_SUMMARY_CHARS: usize = 300;

/// Main error type for the query bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A protocol line could not be decoded, or arrived where it makes no sense
    #[error("Malformed agent message: {message}")]
    MalformedMessage {
        /// What was wrong with the line
        message: String,
        /// The offending line, if it is worth keeping
        line: Option<String>,
    },

    /// The agent reported a failure of its own
    #[error("Agent error: {message}")]
    Agent {
        /// Message reported by the agent
        message: String,
        /// Optional machine-readable code reported by the agent
        code: Option<String>,
    },

    /// The agent reported an attempt to leave its read-only sandbox
    #[error("Capability violation: {0}")]
    CapabilityViolation(String),

    /// No terminal message arrived before the deadline
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The agent's output ended before a terminal message
    #[error("Agent stream ended before a terminal message")]
    UnexpectedEof,

    /// Nothing was left after stripping the mention
    #[error("Empty question")]
    EmptyQuestion,

    /// The chat platform refused or failed a request
    #[error("Chat transport error: {0}")]
    Transport(String),

    /// The agent executable could not be located
    #[error("Query agent not found: {0}")]
    AgentNotFound(String),

    /// The agent process could not be started
    #[error("Failed to start query agent: {0}")]
    Spawn(String),

    /// The session cannot accept another question
    #[error("Session {0} is not ready for a question")]
    SessionNotReady(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A result could not be written as CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// Create a malformed message error
    pub fn malformed(msg: impl Into<String>, line: Option<String>) -> Self {
        Self::MalformedMessage {
            message: msg.into(),
            line,
        }
    }

    /// Create an agent error
    pub fn agent(msg: impl Into<String>, code: Option<String>) -> Self {
        Self::Agent {
            message: msg.into(),
            code,
        }
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a chat transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a spawn error
    pub fn spawn(msg: impl Into<String>) -> Self {
        Self::Spawn(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a query agent not found error
    #[must_use]
    pub fn agent_not_found(program: &str) -> Self {
        Self::AgentNotFound(format!(
            "could not find `{program}` on PATH. Pass --agent <PATH> or set QUERY_AGENT_PATH"
        ))
    }

    /// Map this error onto the user-visible taxonomy
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedMessage { .. } | Self::Json(_) => ErrorCategory::MalformedMessage,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::EmptyQuestion => ErrorCategory::EmptyQuestion,
            Self::Transport(_) => ErrorCategory::TransportError,
            Self::Agent { .. }
            | Self::CapabilityViolation(_)
            | Self::UnexpectedEof
            | Self::AgentNotFound(_)
            | Self::Spawn(_)
            | Self::SessionNotReady(_)
            | Self::Io(_)
            | Self::InvalidConfig(_)
            | Self::Csv(_) => ErrorCategory::AgentError,
        }
    }

    /// The message posted to chat for this error
    ///
    /// Only agent-reported messages are echoed, and only as a one-line summary.
    /// Everything else uses the category's fixed text.
    #[must_use]
    pub fn user_message(&self) -> String {
        let category = self.category();
        match self {
            Self::Agent { message, .. } => {
                format!("{} `{}`", category.message(), summarize(message))
            }
            Self::CapabilityViolation(_) => format!(
                "{} `the agent tried an operation outside its read-only access`",
                category.message()
            ),
            Self::UnexpectedEof => format!(
                "{} `the query agent stopped before answering`",
                category.message()
            ),
            Self::AgentNotFound(_) | Self::Spawn(_) | Self::Io(_) => format!(
                "{} `the query agent could not be started`",
                category.message()
            ),
            Self::SessionNotReady(_) | Self::InvalidConfig(_) | Self::Csv(_) => {
                format!("{} `internal error`", category.message())
            }
            _ => category.message().to_string(),
        }
    }
}

/// The fixed vocabulary of failures that can reach the chat surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The agent produced output that could not be understood
    MalformedMessage,
    /// The agent failed or could not be run
    AgentError,
    /// The agent did not finish in time
    Timeout,
    /// The mention carried no question
    EmptyQuestion,
    /// Replying to chat failed
    TransportError,
}

impl ErrorCategory {
    /// Stable label for logs and metrics
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::MalformedMessage => "malformed_message",
            Self::AgentError => "agent_error",
            Self::Timeout => "timeout",
            Self::EmptyQuestion => "empty_question",
            Self::TransportError => "transport_error",
        }
    }

    /// Fixed user-facing text
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::MalformedMessage => {
                "*Error:* the query agent sent a response I couldn't read. Please try again."
            }
            Self::AgentError => "*Error:*",
            Self::Timeout => "Still thinking... the query took too long. Please try again.",
            Self::EmptyQuestion => "Please include a question or query after mentioning me.",
            Self::TransportError => "*Error:* could not deliver the result.",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Collapse an agent message to a single bounded line
fn summarize(message: &str) -> String {
    let line = message.split_whitespace().collect::<Vec<_>>().join(" ");
    let line = line.replace('`', "'");
    if line.chars().count() > MAX_SUMMARY_CHARS {
        let truncated: String = line.chars().take(MAX_SUMMARY_CHARS).collect();
        format!("{truncated}...")
    } else {
        line
    }
}
