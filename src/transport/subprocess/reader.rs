//! Output reading for subprocess transport

use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use crate::error::{BridgeError, Result};
use crate::types::identifiers::SessionId;

/// Spawn a task that splits stdout into lines and forwards them
///
/// The channel closes when stdout reaches EOF, when a read fails, or when a
/// line exceeds `max_line_length` (the error is sent first).
pub(super) fn spawn_line_reader(
    stdout: ChildStdout,
    max_line_length: usize,
    tx: mpsc::UnboundedSender<Result<String>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut frames = FramedRead::new(stdout, LinesCodec::new_with_max_length(max_line_length));

        while let Some(frame) = frames.next().await {
            let item = match frame {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => Ok(line),
                Err(LinesCodecError::MaxLineLengthExceeded) => Err(BridgeError::malformed(
                    format!("agent line exceeded maximum length of {max_line_length} bytes"),
                    None,
                )),
                Err(LinesCodecError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                    Err(BridgeError::malformed("agent line is not valid UTF-8", None))
                }
                Err(LinesCodecError::Io(e)) => Err(BridgeError::Io(e)),
            };

            let failed = item.is_err();
            if tx.send(item).is_err() || failed {
                // Receiver dropped or the stream is unusable
                break;
            }
        }
    })
}

/// Spawn a task that drains stderr into the log so the pipe never fills
pub(super) fn spawn_stderr_drain(stderr: ChildStderr, session_id: SessionId) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            log::debug!("[agent {session_id}] {line}");
        }
    })
}
