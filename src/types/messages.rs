//! Agent protocol message types
//!
//! The agent speaks one JSON object per line, tagged by `"type"`. Every kind of
//! frame is a variant of [`ProtocolMessage`]; an unknown tag fails to decode.

use serde::{Deserialize, Serialize};

use super::identifiers::RequestId;

// ============================================================================
// Message Types
// ============================================================================

/// Error code an agent uses to report an attempt outside its read-only access
pub const CAPABILITY_VIOLATION_CODE: &str = "capability_violation";

/// A single message exchanged with the query agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolMessage {
    /// The question, sent from the bridge to the agent
    Question {
        /// Request this question belongs to
        id: RequestId,
        /// Natural-language question text
        text: String,
    },
    /// Free-form progress output from the agent
    PartialOutput {
        /// Output text
        text: String,
    },
    /// The agent is invoking one of its tools
    ToolCallNotice {
        /// Tool name
        tool: String,
        /// Tool input, if the agent reports it
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<serde_json::Value>,
        /// Set when the agent refused the call for exceeding its capabilities
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        denied: bool,
    },
    /// The answer
    FinalResult(TabularResult),
    /// The agent gave up
    Error {
        /// Human-readable failure message
        message: String,
        /// Optional machine-readable code
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl ProtocolMessage {
    /// Whether this message ends the session's conversation
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FinalResult(_) | Self::Error { .. })
    }

    /// Wire tag of this message, for logging
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Question { .. } => "question",
            Self::PartialOutput { .. } => "partial_output",
            Self::ToolCallNotice { .. } => "tool_call_notice",
            Self::FinalResult(_) => "final_result",
            Self::Error { .. } => "error",
        }
    }
}

// ============================================================================
// Tabular Results
// ============================================================================

/// A single cell value
///
/// Only JSON scalars are accepted; arrays and objects do not decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// SQL NULL
    Null,
    /// Boolean
    Bool(bool),
    /// Number, kept in its JSON text form
    Number(serde_json::Number),
    /// Text
    Text(String),
}

impl Scalar {
    /// Render the value for a CSV field; `None` for NULL
    #[must_use]
    pub fn to_field(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Column names plus rows of scalars, as returned by the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    /// Ordered column names
    pub columns: Vec<String>,
    /// Ordered rows; each has exactly `columns.len()` cells
    #[serde(default)]
    pub rows: Vec<Vec<Scalar>>,
}

impl TabularResult {
    /// Build a result from columns and rows
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Self {
        Self { columns, rows }
    }

    /// Index of the first row whose width differs from the header, if any
    #[must_use]
    pub fn ragged_row(&self) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.len() != self.columns.len())
    }

    /// Number of rows
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}
