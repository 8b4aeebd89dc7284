//! Turn-level facade tying sessions, the registry and the engine together.
//!
//! The HTTP entry point itself lives outside this crate; this module stops
//! at the request/response contract it speaks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::answer::Citation;
use crate::client::AssistantsClient;
use crate::config::ConciergeConfig;
use crate::engine::{RunEngine, Turn};
use crate::error::Result;
use crate::session::Session;
use crate::tools::ToolRegistry;

/// One inbound conversational turn.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// The answer produced for a turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub thread_id: String,
    pub answer: String,
    pub citations: Vec<Citation>,
}

impl From<Turn> for TurnResponse {
    fn from(turn: Turn) -> Self {
        Self {
            thread_id: turn.thread_id,
            answer: turn.answer,
            citations: turn.citations,
        }
    }
}

/// Conversational service facade. The registry is built once and shared
/// read-only across turns; each turn gets its own session.
pub struct Chat {
    client: Arc<AssistantsClient>,
    engine: RunEngine,
}

impl Chat {
    pub fn new(config: &ConciergeConfig) -> Self {
        let client = Arc::new(AssistantsClient::new(
            &config.base_url,
            &config.api_key,
            &config.model,
        ));
        let registry = Arc::new(ToolRegistry::load(config, &config.enabled_tools));
        if !registry.failed_tools().is_empty() {
            info!(failed = ?registry.failed_tools(), "some configured tools did not load");
        }
        let engine = RunEngine::new(
            Arc::clone(&client),
            registry,
            config.assistant_id.clone(),
            config.poll.clone(),
        );
        Self { client, engine }
    }

    /// Handle one turn: ensure or resume the thread, append the user's
    /// message, and drive the run to a final answer.
    ///
    /// Errors out of this function are client-facing (an unknown thread id,
    /// an unreachable service while establishing the thread); once the run
    /// itself starts, failures degrade into the fallback answer instead.
    pub async fn handle_turn(&self, request: &TurnRequest) -> Result<TurnResponse> {
        let mut session = Session::new(Arc::clone(&self.client));
        match &request.thread_id {
            Some(thread_id) => session.resume_thread(thread_id).await?,
            None => {
                session.create_thread().await?;
            }
        }
        session.append_user_message(&request.content).await?;
        let turn = self.engine.execute_turn(&session).await;
        Ok(turn.into())
    }
}
