//! The open → ask → format → close pipeline for one request

use std::sync::Arc;

use crate::config::DatabaseHandle;
use crate::error::Result;
use crate::format::{self, CsvArtifact};
use crate::session::SessionManager;
use crate::transport::AgentConnector;
use crate::types::request::QueryRequest;

/// Answer one request with a fresh agent session
///
/// The session is closed on every path once it has been opened; a close
/// failure is logged and does not mask the answer.
///
/// # Errors
/// Returns the error that ended the session, or the error from opening it
pub async fn run_query<C: AgentConnector>(
    sessions: &SessionManager<C>,
    database: &Arc<DatabaseHandle>,
    request: &QueryRequest,
) -> Result<CsvArtifact> {
    let mut session = sessions.open_session(database).await?;
    log::debug!(
        "[{}] answering with session {}",
        request.request_id,
        session.id()
    );

    let answer = sessions
        .ask(&mut session, &request.request_id, &request.question_text)
        .await;

    if let Err(e) = sessions.close_session(session).await {
        log::warn!("[{}] failed to close session: {e}", request.request_id);
    }

    format::format(&answer?)
}
