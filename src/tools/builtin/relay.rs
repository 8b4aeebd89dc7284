//! Hand the conversation off to a human agent over a chat webhook.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::client::http::shared_client;
use crate::config::ConciergeConfig;
use crate::error::{ConciergeError, Result};
use crate::tools::arguments::ToolArguments;
use crate::tools::tool::{Tool, ToolContext, ToolInvocation};
use crate::tools::types::{ToolDescriptor, ToolParameters};

pub const NAME: &str = "relay_to_agent";

const SUMMARY_INSTRUCTION: &str =
    "You are an assistant that summarizes conversations, extracting only what the user wants resolved.";

pub fn factory(config: &ConciergeConfig) -> Result<Arc<dyn Tool>> {
    let webhook_url = config
        .webhook_url
        .clone()
        .ok_or_else(|| ConciergeError::Configuration("relay webhook url is required".into()))?;
    Ok(Arc::new(RelayToAgentTool::new(webhook_url)))
}

/// Summarizes the conversation so far through the injected conversation view
/// and posts the summary to the configured webhook as an adaptive card.
#[derive(Debug)]
pub struct RelayToAgentTool {
    webhook_url: String,
}

impl RelayToAgentTool {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
        }
    }

    async fn post_card(&self, summary: &str) -> Result<()> {
        let payload = serde_json::json!({
            "attachments": [{
                "contentType": "application/vnd.microsoft.card.adaptive",
                "content": format!("{summary}\nCan you help?"),
            }]
        });
        let resp = shared_client()
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;
        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(ConciergeError::tool_execution(
                NAME,
                format!("webhook rejected the handoff (status {status})"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Tool for RelayToAgentTool {
    fn name(&self) -> &str {
        NAME
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            NAME,
            "Detects when the user wants to talk to a human agent and hands the conversation off.",
            ToolParameters::object()
                .string(
                    "message",
                    "The user's message asking to be put in contact with an agent.",
                    true,
                )
                .build(),
        )
    }

    async fn invoke(&self, args: &ToolArguments, ctx: &ToolContext) -> Result<ToolInvocation> {
        args.get_str("message")?;
        let Some(conversation) = &ctx.conversation else {
            warn!("relay tool invoked without a conversation view");
            return Err(ConciergeError::tool_execution(
                NAME,
                "no conversation available to hand off",
            ));
        };

        let summary = conversation.summarize(SUMMARY_INSTRUCTION).await?;
        debug!("handing conversation off to a human agent");
        self.post_card(&summary).await?;

        Ok(ToolInvocation::output(serde_json::json!({
            "summary": summary,
            "status": "the conversation was handed off to a human agent",
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn requires_a_conversation_view() {
        let tool = RelayToAgentTool::new("http://localhost:1/webhook");
        let args = ToolArguments::new(serde_json::json!({"message": "get me a human"}));
        let err = tool
            .invoke(&args, &ToolContext::detached())
            .await
            .unwrap_err();
        assert!(matches!(err, ConciergeError::ToolExecution { .. }));
    }
}
