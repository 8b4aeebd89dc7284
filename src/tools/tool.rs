//! Tool trait and the narrow execution-context capability.

use std::sync::Arc;

use async_trait::async_trait;

use crate::answer::Citation;
use crate::client::Role;
use crate::error::Result;

use super::arguments::ToolArguments;
use super::types::ToolDescriptor;

/// Result of one tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolInvocation {
    /// Output value, serialized back to the remote service as text.
    pub output: serde_json::Value,
    /// Source attributions contributed by this call.
    pub citations: Vec<Citation>,
}

impl ToolInvocation {
    pub fn output(output: serde_json::Value) -> Self {
        Self {
            output,
            citations: Vec::new(),
        }
    }

    pub fn with_citations(output: serde_json::Value, citations: Vec<Citation>) -> Self {
        Self { output, citations }
    }
}

/// One entry of the conversation transcript, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
}

/// Read-only view of the active conversation, injected into tools that need
/// it. Deliberately narrow: tools never see the session or client handle.
#[async_trait]
pub trait ConversationView: Send + Sync {
    /// Ordered (role, text) history of the active thread.
    async fn transcript(&self) -> Result<Vec<TranscriptEntry>>;

    /// Restricted follow-up model call over the conversation so far.
    async fn summarize(&self, instruction: &str) -> Result<String>;
}

/// Context available during tool execution.
#[derive(Clone, Default)]
pub struct ToolContext {
    /// Conversation accessor, absent for tools executed outside a session.
    pub conversation: Option<Arc<dyn ConversationView>>,
    /// Identifier of the originating tool call, when dispatched from a run.
    pub tool_call_id: Option<String>,
}

impl ToolContext {
    pub fn new(conversation: Arc<dyn ConversationView>) -> Self {
        Self {
            conversation: Some(conversation),
            tool_call_id: None,
        }
    }

    /// Context with no conversation attached (tests, standalone execution).
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn for_call(&self, tool_call_id: &str) -> Self {
        Self {
            conversation: self.conversation.clone(),
            tool_call_id: Some(tool_call_id.to_string()),
        }
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("conversation", &self.conversation.as_ref().map(|_| ".."))
            .field("tool_call_id", &self.tool_call_id)
            .finish()
    }
}

/// Core tool trait: expose a capability descriptor, execute on demand.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the remote model calls).
    fn name(&self) -> &str;

    /// Capability descriptor advertised to the remote model.
    fn descriptor(&self) -> ToolDescriptor;

    /// Execute the tool with parsed arguments.
    async fn invoke(&self, args: &ToolArguments, ctx: &ToolContext) -> Result<ToolInvocation>;
}
