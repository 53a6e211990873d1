//! Lifecycle management for subprocess transport (spawn, close)

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Child;
use tokio::sync::mpsc;

use crate::config::AgentConfig;
use crate::error::{BridgeError, Result};
use crate::transport::{AgentLaunch, Shutdown};

use super::command::CommandBuilder;
use super::reader::{spawn_line_reader, spawn_stderr_drain};
use super::transport::SubprocessTransport;

impl SubprocessTransport {
    /// Spawn the agent process and wire up its stdio
    ///
    /// # Errors
    /// Returns error if process spawning fails or stdio handles cannot be obtained
    pub(super) async fn spawn_impl(config: &AgentConfig, launch: &AgentLaunch) -> Result<Self> {
        let mut cmd = CommandBuilder::new(config, launch).build();

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BridgeError::AgentNotFound(config.program.display().to_string())
            } else {
                BridgeError::spawn(format!("{}: {e}", config.program.display()))
            }
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::spawn("Failed to get stdin handle"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::spawn("Failed to get stdout handle"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BridgeError::spawn("Failed to get stderr handle"))?;

        let (tx, lines) = mpsc::unbounded_channel();
        let reader_task = spawn_line_reader(stdout, config.max_line_length, tx);
        let stderr_task = spawn_stderr_drain(stderr, launch.session_id.clone());

        log::debug!(
            "[{}] spawned agent {} (pid {:?})",
            launch.session_id,
            config.program.display(),
            child.id()
        );

        Ok(Self {
            session_id: launch.session_id.clone(),
            process: Some(child),
            stdin: Some(stdin),
            lines,
            reader_task: Some(reader_task),
            stderr_task: Some(stderr_task),
            shutdown_grace: config.shutdown_grace,
        })
    }

    /// Close the transport and clean up resources
    ///
    /// `Graceful` closes stdin and hands the child to a background reaper that
    /// waits up to the grace period before killing, so the caller is not held
    /// while the agent winds down. `Kill` terminates right away.
    ///
    /// # Errors
    /// Currently infallible; kill failures are logged
    pub(super) async fn close_impl(&mut self, mode: Shutdown) -> Result<()> {
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.shutdown().await;
        }

        if let Some(mut child) = self.process.take() {
            match mode {
                Shutdown::Graceful => {
                    spawn_reaper(child, self.session_id.to_string(), self.shutdown_grace);
                }
                Shutdown::Kill => {
                    log::debug!("[{}] killing agent", self.session_id);
                    if let Err(e) = child.kill().await {
                        log::debug!("[{}] kill failed: {e}", self.session_id);
                    }
                }
            }
        }

        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        self.lines.close();

        Ok(())
    }

    /// Handle Drop cleanup
    pub(super) fn drop_impl(&mut self) {
        drop(self.stdin.take());

        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }

        if let Some(mut child) = self.process.take() {
            let _ = child.start_kill();
        }
    }
}

/// Wait for a child whose stdin is closed, killing it after `grace`
fn spawn_reaper(mut child: Child, session_id: String, grace: Duration) {
    tokio::spawn(async move {
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => log::debug!("[{session_id}] agent exited with {status}"),
            Ok(Err(e)) => log::warn!("[{session_id}] waiting on agent failed: {e}"),
            Err(_) => {
                log::warn!("[{session_id}] agent did not exit within {grace:?}, killing");
                let _ = child.kill().await;
            }
        }
    });
}
