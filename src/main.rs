//! Slack query bridge
//!
//! Listens for mentions over Socket Mode and answers each question with a
//! fresh read-only query agent.
//!
//! ## Usage
//!
//! ```bash
//! export SLACK_BOT_TOKEN=xoxb-...
//! export SLACK_APP_TOKEN=xapp-...
//!
//! # Name taken from the file stem
//! slack-query-bridge --db ./sales.duckdb
//!
//! # Explicit names, setup SQL, custom agent
//! slack-query-bridge --db sales=./sales.duckdb --db crm=./crm.duckdb \
//!   --init-sql ./views.sql --agent ./target/release/duckdb-agent
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;

use slack_query_bridge::config::{DEFAULT_MAX_CONCURRENT, DEFAULT_DEADLINE};
use slack_query_bridge::{
    AgentConfig, BridgeConfig, ChatEventBridge, Coordinator, DatabaseHandle, SessionManager,
    SlackClient, SocketModeListener, SubprocessConnector,
};

/// How long shutdown waits for running questions
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Buffered events between the socket and the bridge
const EVENT_BUFFER: usize = 64;

#[derive(Parser)]
#[command(
    name = "slack-query-bridge",
    version,
    about = "Answer Slack questions about DuckDB databases with a query agent"
)]
struct Cli {
    /// Slack bot token (xoxb-...)
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    bot_token: String,

    /// Slack app-level token for Socket Mode (xapp-...)
    #[arg(long, env = "SLACK_APP_TOKEN", hide_env_values = true)]
    app_token: String,

    /// Database to expose, as PATH or NAME=PATH (repeatable)
    #[arg(long = "db", value_name = "[NAME=]PATH")]
    databases: Vec<String>,

    /// SQL file run by every agent after the databases are attached
    #[arg(long, value_name = "PATH")]
    init_sql: Option<PathBuf>,

    /// Agent executable (searched on PATH when omitted)
    #[arg(long, env = "QUERY_AGENT_PATH", value_name = "PATH")]
    agent: Option<PathBuf>,

    /// Extra argument passed to the agent (repeatable)
    #[arg(long = "agent-arg", value_name = "ARG", allow_hyphen_values = true)]
    agent_args: Vec<String>,

    /// Maximum number of questions answered at once
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT)]
    max_concurrent: usize,

    /// Seconds an agent gets to answer one question
    #[arg(long, default_value_t = DEFAULT_DEADLINE.as_secs())]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = BridgeConfig::new(
        cli.bot_token,
        cli.app_token,
        cli.max_concurrent,
        Duration::from_secs(cli.timeout_secs),
    )?;
    let database = Arc::new(
        DatabaseHandle::open(&cli.databases, cli.init_sql.as_deref())
            .context("Invalid database configuration")?,
    );
    let agent = AgentConfig::resolve(cli.agent)
        .context("Cannot locate the query agent; pass --agent or set QUERY_AGENT_PATH")?
        .with_args(cli.agent_args);

    if database.attachments().is_empty() {
        log::warn!("No databases attached; the agent starts with an empty catalog");
    }
    for attachment in database.attachments() {
        log::info!("Database {} = {}", attachment.name, attachment.path.display());
    }
    if let Some(path) = &cli.init_sql {
        log::info!("Init SQL: {}", path.display());
    }
    log::info!("Agent: {}", agent.program.display());
    log::debug!("{config:?}");

    let slack = SlackClient::new(&config.bot_token, &config.app_token);
    let identity = slack
        .auth_test()
        .await
        .context("Slack rejected the bot token")?;
    log::info!(
        "Authenticated as {} ({})",
        identity.user.as_deref().unwrap_or("bot"),
        identity.user_id
    );

    let sessions = Arc::new(SessionManager::with_deadline(
        SubprocessConnector::new(agent),
        config.deadline,
    ));
    let coordinator = Coordinator::new(config.max_concurrent)?;
    let bridge = Arc::new(ChatEventBridge::new(
        Arc::clone(&sessions),
        coordinator,
        Arc::new(slack.clone()),
        database,
    ));

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let listener = tokio::spawn(SocketModeListener::new(slack).run(tx));
    let dispatcher = tokio::spawn(bridge.run(rx));

    log::info!(
        "Listening for mentions (max {} concurrent, {}s deadline)",
        config.max_concurrent,
        config.deadline.as_secs()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    log::info!("Shutting down...");

    listener.abort();
    let mut pipelines = dispatcher.await.context("Event dispatcher panicked")?;

    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while pipelines.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        log::warn!(
            "{} question(s) still running after {DRAIN_TIMEOUT:?}; terminating their agents",
            pipelines.len()
        );
        // Aborted pipelines drop their sessions, which kills the agents
        pipelines.shutdown().await;
    }

    let stats = sessions.stats();
    log::info!(
        "Sessions: {} opened, {} closed, {} leaked",
        stats.opened,
        stats.closed,
        stats.leaked
    );
    Ok(())
}
