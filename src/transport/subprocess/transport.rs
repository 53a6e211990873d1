//! Subprocess transport implementation for the query agent

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::AgentConfig;
use crate::error::{BridgeError, Result};
use crate::transport::{AgentConnector, AgentTransport, AgentLaunch, Shutdown};
use crate::types::identifiers::SessionId;

/// One running agent process, spoken to over stdin/stdout
pub struct SubprocessTransport {
    pub(super) session_id: SessionId,
    pub(super) process: Option<Child>,
    pub(super) stdin: Option<ChildStdin>,
    pub(super) lines: mpsc::UnboundedReceiver<Result<String>>,
    pub(super) reader_task: Option<JoinHandle<()>>,
    pub(super) stderr_task: Option<JoinHandle<()>>,
    pub(super) shutdown_grace: std::time::Duration,
}

impl SubprocessTransport {
    /// Spawn the agent described by `config` for `launch`
    ///
    /// # Errors
    /// Returns `BridgeError::Spawn` if the process cannot be started
    pub async fn spawn(config: &AgentConfig, launch: &AgentLaunch) -> Result<Self> {
        Self::spawn_impl(config, launch).await
    }

    /// OS process ID, while the process is running
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(Child::id)
    }
}

impl AgentTransport for SubprocessTransport {
    async fn write(&mut self, data: &str) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "agent stdin is closed",
            ))
        })?;

        stdin.write_all(data.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn next_line(&mut self) -> Option<Result<String>> {
        self.lines.recv().await
    }

    async fn close(&mut self, mode: Shutdown) -> Result<()> {
        self.close_impl(mode).await
    }
}

impl Drop for SubprocessTransport {
    fn drop(&mut self) {
        self.drop_impl();
    }
}

/// Connector that launches a fresh agent process per session
#[derive(Debug, Clone)]
pub struct SubprocessConnector {
    config: AgentConfig,
}

impl SubprocessConnector {
    /// Create a connector for the given agent configuration
    #[must_use]
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// The agent configuration in use
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

impl AgentConnector for SubprocessConnector {
    type Transport = SubprocessTransport;

    async fn connect(&self, launch: &AgentLaunch) -> Result<SubprocessTransport> {
        SubprocessTransport::spawn(&self.config, launch).await
    }
}
