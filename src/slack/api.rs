//! Slack Web API client

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::bridge::ChatTransport;
use crate::error::{BridgeError, Result};
use crate::format::CsvArtifact;

/// Default Web API base URL
pub const SLACK_API_BASE: &str = "https://slack.com/api";

/// Authenticated Web API client
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: String,
    app_token: String,
}

/// Identity returned by `auth.test`
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    /// The bot's user ID
    pub user_id: String,
    /// The bot's user name
    #[serde(default)]
    pub user: Option<String>,
    /// Workspace name
    #[serde(default)]
    pub team: Option<String>,
}

#[derive(Deserialize)]
struct PostedMessage {
    ts: String,
}

#[derive(Deserialize)]
struct ConnectionUrl {
    url: String,
}

#[derive(Deserialize)]
struct UploadTarget {
    upload_url: String,
    file_id: String,
}

impl SlackClient {
    /// Create a client against the public Slack API
    pub fn new(bot_token: impl Into<String>, app_token: impl Into<String>) -> Self {
        Self::with_base_url(SLACK_API_BASE, bot_token, app_token)
    }

    /// Create a client against a custom base URL
    pub fn with_base_url(
        base_url: impl Into<String>,
        bot_token: impl Into<String>,
        app_token: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            app_token: app_token.into(),
        }
    }

    /// Resolve the bot's own identity
    ///
    /// # Errors
    /// Returns `BridgeError::Transport` if the token is rejected
    pub async fn auth_test(&self) -> Result<BotIdentity> {
        self.call("auth.test", &self.bot_token, &json!({})).await
    }

    /// Ask for a Socket Mode WebSocket URL
    ///
    /// # Errors
    /// Returns `BridgeError::Transport` if the app token is rejected
    pub async fn open_connection(&self) -> Result<String> {
        let conn: ConnectionUrl = self
            .call("apps.connections.open", &self.app_token, &json!({}))
            .await?;
        Ok(conn.url)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        token: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| BridgeError::transport(format!("{method}: {e}")))?;
        Self::parse(method, response).await
    }

    async fn call_form<T: DeserializeOwned>(
        &self,
        method: &str,
        form: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(&self.bot_token)
            .form(form)
            .send()
            .await
            .map_err(|e| BridgeError::transport(format!("{method}: {e}")))?;
        Self::parse(method, response).await
    }

    async fn parse<T: DeserializeOwned>(method: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BridgeError::transport(format!("{method}: HTTP {status}: {e}")))?;

        let value = check_response(method, value)?;
        serde_json::from_value(value)
            .map_err(|e| BridgeError::transport(format!("{method}: unexpected response: {e}")))
    }
}

/// Accept a Web API response body only when it carries `"ok": true`
///
/// # Errors
/// Returns `BridgeError::Transport` naming `method` and Slack's `error` code
/// when `ok` is false or missing
pub fn check_response(method: &str, value: serde_json::Value) -> Result<serde_json::Value> {
    if value.get("ok").and_then(serde_json::Value::as_bool) == Some(true) {
        return Ok(value);
    }
    let error = value
        .get("error")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown_error");
    Err(BridgeError::transport(format!("{method}: {error}")))
}

impl ChatTransport for SlackClient {
    async fn add_reaction(&self, channel: &str, message_id: &str, name: &str) -> Result<()> {
        let body = json!({ "channel": channel, "timestamp": message_id, "name": name });
        match self
            .call::<serde_json::Value>("reactions.add", &self.bot_token, &body)
            .await
        {
            Ok(_) => Ok(()),
            Err(BridgeError::Transport(msg)) if msg.ends_with("already_reacted") => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn post_message(&self, channel: &str, thread: &str, text: &str) -> Result<String> {
        let body = json!({ "channel": channel, "thread_ts": thread, "text": text });
        let posted: PostedMessage = self.call("chat.postMessage", &self.bot_token, &body).await?;
        Ok(posted.ts)
    }

    async fn update_message(&self, channel: &str, message_id: &str, text: &str) -> Result<()> {
        let body = json!({ "channel": channel, "ts": message_id, "text": text });
        self.call::<serde_json::Value>("chat.update", &self.bot_token, &body)
            .await
            .map(|_| ())
    }

    async fn upload_file(&self, channel: &str, thread: &str, artifact: &CsvArtifact) -> Result<()> {
        let target: UploadTarget = self
            .call_form(
                "files.getUploadURLExternal",
                &[
                    ("filename", artifact.filename.clone()),
                    ("length", artifact.bytes.len().to_string()),
                ],
            )
            .await?;

        let response = self
            .http
            .post(&target.upload_url)
            .header(reqwest::header::CONTENT_TYPE, artifact.mime_type())
            .body(artifact.bytes.clone())
            .send()
            .await
            .map_err(|e| BridgeError::transport(format!("file upload: {e}")))?;
        if !response.status().is_success() {
            return Err(BridgeError::transport(format!(
                "file upload: HTTP {}",
                response.status()
            )));
        }

        let body = json!({
            "files": [{ "id": target.file_id, "title": artifact.title }],
            "channel_id": channel,
            "thread_ts": thread,
        });
        self.call::<serde_json::Value>("files.completeUploadExternal", &self.bot_token, &body)
            .await
            .map(|_| ())
    }
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
