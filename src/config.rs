//! Configuration for the bridge and the agent it launches
//!
//! Flags and environment are parsed by the binary. This module validates the
//! result into a [`DatabaseHandle`], an [`AgentConfig`] and a [`BridgeConfig`]
//! before anything starts.

use std::collections::{HashMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Agent executable searched for on `PATH` when none is given
pub const DEFAULT_AGENT_PROGRAM: &str = "duckdb-agent";

/// Default maximum length of one protocol line (1MB)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Default time an agent gets to exit after its stdin is closed
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Default deadline for one question
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(300);

/// Default number of pipelines allowed to run at once
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

// ============================================================================
// Database attachments
// ============================================================================

/// A database file exposed to the agent under a display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseAttachment {
    /// Name the database is attached as
    pub name: String,
    /// Path of the database file
    pub path: PathBuf,
}

impl DatabaseAttachment {
    /// Parse `NAME=PATH` or `PATH` (name taken from the file stem)
    ///
    /// # Errors
    /// Returns `BridgeError::InvalidConfig` if the file does not exist or the
    /// name is not a plain identifier
    pub fn parse(spec: &str) -> Result<Self> {
        let (name, path) = match spec.split_once('=') {
            Some((name, path)) if is_identifier(name) => (Some(name.to_string()), PathBuf::from(path)),
            _ => (None, PathBuf::from(spec)),
        };

        if !path.exists() {
            return Err(BridgeError::invalid_config(format!(
                "Database not found: {}",
                path.display()
            )));
        }

        let name = match name {
            Some(name) => name,
            None => path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .ok_or_else(|| {
                    BridgeError::invalid_config(format!(
                        "Cannot derive a name for {}",
                        path.display()
                    ))
                })?,
        };

        if !is_identifier(&name) {
            return Err(BridgeError::invalid_config(format!(
                "Database name `{name}` is not a valid identifier; use NAME=PATH"
            )));
        }

        Ok(Self { name, path })
    }

    /// Statement that attaches this database read-only
    #[must_use]
    pub fn attach_statement(&self) -> String {
        let path = self.path.to_string_lossy().replace('\'', "''");
        format!("ATTACH '{path}' AS {} (READ_ONLY);", self.name)
    }
}

/// The databases and startup SQL every agent session is launched with
///
/// Built once at startup and shared read-only between pipelines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseHandle {
    attachments: Vec<DatabaseAttachment>,
    init_sql: Option<String>,
}

impl DatabaseHandle {
    /// Validate attachments and load the init SQL file
    ///
    /// # Errors
    /// Returns `BridgeError::InvalidConfig` for missing files, bad or duplicate
    /// names, or an unreadable init SQL file
    pub fn open(specs: &[String], init_sql: Option<&Path>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut attachments = Vec::with_capacity(specs.len());
        for spec in specs {
            let attachment = DatabaseAttachment::parse(spec)?;
            if !seen.insert(attachment.name.clone()) {
                return Err(BridgeError::invalid_config(format!(
                    "Database name `{}` is used more than once",
                    attachment.name
                )));
            }
            attachments.push(attachment);
        }

        let init_sql = match init_sql {
            Some(path) => {
                if !path.exists() {
                    return Err(BridgeError::invalid_config(format!(
                        "Init SQL file not found: {}",
                        path.display()
                    )));
                }
                Some(std::fs::read_to_string(path)?)
            }
            None => None,
        };

        Ok(Self {
            attachments,
            init_sql,
        })
    }

    /// Build a handle from already validated parts
    #[must_use]
    pub fn from_parts(attachments: Vec<DatabaseAttachment>, init_sql: Option<String>) -> Self {
        Self {
            attachments,
            init_sql,
        }
    }

    /// Attached databases, in command-line order
    #[must_use]
    pub fn attachments(&self) -> &[DatabaseAttachment] {
        &self.attachments
    }

    /// Raw init SQL, if any
    #[must_use]
    pub fn init_sql(&self) -> Option<&str> {
        self.init_sql.as_deref()
    }

    /// Statements the agent runs before taking a question
    ///
    /// Attachments come first so the init SQL can refer to them.
    #[must_use]
    pub fn startup_statements(&self) -> Vec<String> {
        let mut statements: Vec<String> = self
            .attachments
            .iter()
            .map(DatabaseAttachment::attach_statement)
            .collect();
        if let Some(sql) = self.init_sql.as_deref().map(str::trim)
            && !sql.is_empty()
        {
            statements.push(sql.to_string());
        }
        statements
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ============================================================================
// Agent process configuration
// ============================================================================

/// How to launch the query agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Agent executable
    pub program: PathBuf,
    /// Extra arguments placed before the generated ones
    pub args: Vec<String>,
    /// Extra environment variables (dangerous ones are dropped at spawn)
    pub env: HashMap<String, String>,
    /// Longest accepted protocol line
    pub max_line_length: usize,
    /// Time the agent gets to exit after stdin closes before it is killed
    pub shutdown_grace: Duration,
}

impl AgentConfig {
    /// Config for a known agent executable with default limits
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Use `program` if given, otherwise search `PATH` for the default agent
    ///
    /// # Errors
    /// Returns `BridgeError::AgentNotFound` if no executable can be found
    pub fn resolve(program: Option<PathBuf>) -> Result<Self> {
        match program {
            Some(path) => Ok(Self::new(path)),
            None => Ok(Self::new(Self::find_agent()?)),
        }
    }

    /// Find the agent binary on `PATH` or in common install locations
    ///
    /// # Errors
    /// Returns error if it cannot be found
    pub fn find_agent() -> Result<PathBuf> {
        if let Ok(path) = which::which(DEFAULT_AGENT_PROGRAM) {
            return Ok(path);
        }

        let home = env::var("HOME").unwrap_or_else(|_| String::from("/root"));
        let locations = [
            PathBuf::from(&home).join(".local/bin").join(DEFAULT_AGENT_PROGRAM),
            PathBuf::from("/usr/local/bin").join(DEFAULT_AGENT_PROGRAM),
            PathBuf::from(&home).join(".cargo/bin").join(DEFAULT_AGENT_PROGRAM),
        ];

        locations
            .into_iter()
            .find(|path| path.is_file())
            .ok_or_else(|| BridgeError::agent_not_found(DEFAULT_AGENT_PROGRAM))
    }

    /// Append extra arguments
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }
}

// ============================================================================
// Bridge configuration
// ============================================================================

/// Chat credentials and pipeline limits
#[derive(Clone)]
pub struct BridgeConfig {
    /// Bot token used for Web API calls
    pub bot_token: String,
    /// App-level token used to open the Socket Mode connection
    pub app_token: String,
    /// Maximum number of pipelines running at once
    pub max_concurrent: usize,
    /// Deadline for one question, from sending it to the terminal message
    pub deadline: Duration,
}

impl BridgeConfig {
    /// Validate tokens and limits
    ///
    /// # Errors
    /// Returns `BridgeError::InvalidConfig` if a token is empty or a limit is zero
    pub fn new(
        bot_token: impl Into<String>,
        app_token: impl Into<String>,
        max_concurrent: usize,
        deadline: Duration,
    ) -> Result<Self> {
        let bot_token = bot_token.into();
        let app_token = app_token.into();
        if bot_token.trim().is_empty() {
            return Err(BridgeError::invalid_config(
                "Missing --bot-token or SLACK_BOT_TOKEN",
            ));
        }
        if app_token.trim().is_empty() {
            return Err(BridgeError::invalid_config(
                "Missing --app-token or SLACK_APP_TOKEN",
            ));
        }
        if max_concurrent == 0 {
            return Err(BridgeError::invalid_config(
                "--max-concurrent must be at least 1",
            ));
        }
        if deadline.is_zero() {
            return Err(BridgeError::invalid_config("--timeout-secs must be at least 1"));
        }
        Ok(Self {
            bot_token,
            app_token,
            max_concurrent,
            deadline,
        })
    }
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("bot_token", &"<redacted>")
            .field("app_token", &"<redacted>")
            .field("max_concurrent", &self.max_concurrent)
            .field("deadline", &self.deadline)
            .finish()
    }
}
