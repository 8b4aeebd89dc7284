//! Client for the remote assistant service (threads, runs, messages).
//!
//! Thread and run lifecycle primitives are consumed here, never
//! reimplemented; the engine layers its state machine on top.

pub mod http;
pub mod types;

pub use types::{
    ChatMessage, ContentBlock, MessageList, RequiredAction, Role, Run, RunRequest, RunStatus,
    TextContent, Thread, ThreadMessage, ToolCall, ToolOutput,
};

use tracing::debug;

use crate::error::{ConciergeError, Result};

use http::{bearer_headers, shared_client, status_to_error};
use types::ChatCompletionResponse;

/// HTTP client for the assistant service.
#[derive(Debug, Clone)]
pub struct AssistantsClient {
    base_url: String,
    api_key: String,
    /// Model deployment used for restricted follow-up completions.
    model: String,
}

impl AssistantsClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Create a new, empty thread.
    pub async fn create_thread(&self) -> Result<Thread> {
        debug!("creating thread");
        self.post_json(&format!("{}/threads", self.base_url), &serde_json::json!({}))
            .await
    }

    /// Retrieve an existing thread. A 404 maps to [`ConciergeError::ThreadNotFound`].
    pub async fn retrieve_thread(&self, thread_id: &str) -> Result<Thread> {
        debug!(thread_id, "retrieving thread");
        let resp = shared_client()
            .get(format!("{}/threads/{thread_id}", self.base_url))
            .headers(bearer_headers(&self.api_key))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 404 {
            return Err(ConciergeError::ThreadNotFound(thread_id.to_string()));
        }
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body));
        }
        Ok(resp.json().await?)
    }

    /// Append a message to a thread.
    pub async fn create_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> Result<ThreadMessage> {
        debug!(thread_id, role = role.as_str(), "appending message");
        self.post_json(
            &format!("{}/threads/{thread_id}/messages", self.base_url),
            &serde_json::json!({
                "role": role.as_str(),
                "content": content,
            }),
        )
        .await
    }

    /// Start a run against a thread.
    pub async fn create_run(&self, thread_id: &str, request: &RunRequest) -> Result<Run> {
        let mut body = serde_json::json!({
            "assistant_id": request.assistant_id,
            "additional_instructions": request.additional_instructions,
        });
        let obj = body.as_object_mut().expect("body is an object");
        if request.require_tool_use && !request.tools.is_empty() {
            obj.insert("tool_choice".into(), "required".into());
        }
        if !request.tools.is_empty() {
            let tool_defs: Vec<serde_json::Value> = request
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters.schema,
                        }
                    })
                })
                .collect();
            obj.insert("tools".into(), tool_defs.into());
        }

        debug!(thread_id, assistant_id = %request.assistant_id, "starting run");
        self.post_json(&format!("{}/threads/{thread_id}/runs", self.base_url), &body)
            .await
    }

    /// Poll the current status of a run.
    pub async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.get_json(&format!(
            "{}/threads/{thread_id}/runs/{run_id}",
            self.base_url
        ))
        .await
    }

    /// Hand a batch of tool outputs back to the service and resume the run.
    pub async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run> {
        debug!(thread_id, run_id, count = outputs.len(), "submitting tool outputs");
        self.post_json(
            &format!(
                "{}/threads/{thread_id}/runs/{run_id}/submit_tool_outputs",
                self.base_url
            ),
            &serde_json::json!({ "tool_outputs": outputs }),
        )
        .await
    }

    /// List messages on a thread, newest first, optionally scoped to one run.
    pub async fn list_messages(
        &self,
        thread_id: &str,
        run_id: Option<&str>,
    ) -> Result<Vec<ThreadMessage>> {
        let mut url = format!("{}/threads/{thread_id}/messages", self.base_url);
        if let Some(run_id) = run_id {
            url.push_str(&format!("?run_id={run_id}"));
        }
        let list: MessageList = self.get_json(&url).await?;
        Ok(list.data)
    }

    /// One-shot chat completion, used for the restricted "ask the model a
    /// follow-up" capability exposed to tools.
    pub async fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": max_tokens,
        });
        let data: ChatCompletionResponse = self
            .post_json(&format!("{}/chat/completions", self.base_url), &body)
            .await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ConciergeError::upstream(200, "no choices in completion response"))?;
        Ok(choice.message.content.unwrap_or_default().trim().to_string())
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let resp = shared_client()
            .post(url)
            .headers(bearer_headers(&self.api_key))
            .json(body)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = shared_client()
            .get(url)
            .headers(bearer_headers(&self.api_key))
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body));
        }
        Ok(resp.json().await?)
    }
}
