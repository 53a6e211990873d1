//! Line codec for the agent protocol
//!
//! One [`ProtocolMessage`] per line. Framing (splitting the byte stream at
//! `\n`) belongs to the transport; this module only turns a single frame into
//! a message and back.

use crate::error::{BridgeError, Result};
use crate::types::messages::ProtocolMessage;

/// How much of a bad line to keep in the error for diagnostics
const MAX_RECORDED_LINE: usize = 512;

/// Encode a message as one newline-terminated frame
///
/// # Errors
/// Returns `BridgeError::Json` if the message cannot be serialized
pub fn encode(message: &ProtocolMessage) -> Result<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Decode one frame into a typed message
///
/// Surrounding whitespace (including the trailing newline, if the caller left
/// it on) is ignored.
///
/// # Errors
/// Returns `BridgeError::MalformedMessage` if the line is not JSON, carries an
/// unknown `type`, is missing fields, or is a `final_result` whose rows do not
/// match its header
pub fn decode(line: &str) -> Result<ProtocolMessage> {
    let line = line.trim();
    if line.is_empty() {
        return Err(BridgeError::malformed("empty frame", None));
    }

    let message: ProtocolMessage = serde_json::from_str(line).map_err(|e| {
        BridgeError::malformed(
            format!("Failed to parse message: {e}"),
            Some(clip(line)),
        )
    })?;

    if let ProtocolMessage::FinalResult(ref result) = message
        && let Some(row) = result.ragged_row()
    {
        return Err(BridgeError::malformed(
            format!(
                "row {row} has {} cells but the header has {} columns",
                result.rows[row].len(),
                result.columns.len()
            ),
            None,
        ));
    }

    Ok(message)
}

fn clip(line: &str) -> String {
    line.chars().take(MAX_RECORDED_LINE).collect()
}
