//! Agent command building logic for subprocess transport

use std::process::Stdio;
use tokio::process::Command;

use crate::VERSION;
use crate::config::AgentConfig;
use crate::transport::AgentLaunch;

use super::config::{DANGEROUS_ENV_VARS, SESSION_ENV_VAR, VERSION_ENV_VAR};

/// Command builder for the query agent
pub struct CommandBuilder<'a> {
    config: &'a AgentConfig,
    launch: &'a AgentLaunch,
}

impl<'a> CommandBuilder<'a> {
    /// Create a new command builder
    pub fn new(config: &'a AgentConfig, launch: &'a AgentLaunch) -> Self {
        Self { config, launch }
    }

    /// Arguments passed to the agent, in order
    pub fn args(&self) -> Vec<String> {
        let mut args = self.config.args.clone();

        // The agent only ever gets read access
        args.push("--read-only".to_string());
        args.push("--session-id".to_string());
        args.push(self.launch.session_id.to_string());

        let statements = self.launch.database.startup_statements();
        if !statements.is_empty() {
            args.push("--startup-sql".to_string());
            args.push(statements.join("\n"));
        }

        args
    }

    /// Build the complete command with piped stdio
    pub fn build(&self) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(self.args());

        for (key, value) in &self.config.env {
            if DANGEROUS_ENV_VARS.contains(&key.as_str()) {
                log::warn!("Dropping {key} from agent environment");
                continue;
            }
            cmd.env(key, value);
        }
        cmd.env(VERSION_ENV_VAR, VERSION);
        cmd.env(SESSION_ENV_VAR, self.launch.session_id.as_str());

        // stderr is piped (not inherited) so the agent cannot touch our terminal
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        cmd
    }
}
