//! Conversation session: owns exactly one remote thread handle.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::answer::concat_text_blocks;
use crate::client::{AssistantsClient, ChatMessage, Role};
use crate::error::{ConciergeError, Result};
use crate::tools::tool::{ConversationView, TranscriptEntry};

/// One logical conversation. Exactly one thread is active at a time;
/// switching threads means a new session or an explicit resume.
#[derive(Debug)]
pub struct Session {
    client: Arc<AssistantsClient>,
    thread_id: Option<String>,
}

impl Session {
    pub fn new(client: Arc<AssistantsClient>) -> Self {
        Self {
            client,
            thread_id: None,
        }
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Request a fresh thread from the remote service. Always creates a new
    /// one; any previously active thread is abandoned.
    pub async fn create_thread(&mut self) -> Result<String> {
        let thread = self.client.create_thread().await?;
        info!(thread_id = %thread.id, "thread created");
        self.thread_id = Some(thread.id.clone());
        Ok(thread.id)
    }

    /// Resume an existing thread after verifying it exists server-side.
    pub async fn resume_thread(&mut self, thread_id: &str) -> Result<()> {
        let thread = self.client.retrieve_thread(thread_id).await?;
        info!(thread_id = %thread.id, "thread resumed");
        self.thread_id = Some(thread.id);
        Ok(())
    }

    /// Append a user message to the active thread.
    pub async fn append_user_message(&self, text: &str) -> Result<()> {
        let thread_id = self.active_thread()?;
        self.client
            .create_message(thread_id, Role::User, text)
            .await?;
        Ok(())
    }

    /// Narrow read-only view of this conversation for tool execution.
    pub fn view(&self) -> Result<ThreadView> {
        Ok(ThreadView {
            client: Arc::clone(&self.client),
            thread_id: self.active_thread()?.to_string(),
        })
    }

    pub(crate) fn active_thread(&self) -> Result<&str> {
        self.thread_id
            .as_deref()
            .ok_or(ConciergeError::NoActiveThread)
    }
}

/// Read-only conversation accessor handed to tools. Holds the thread id by
/// value so a tool can never follow it to another thread.
#[derive(Debug, Clone)]
pub struct ThreadView {
    client: Arc<AssistantsClient>,
    thread_id: String,
}

#[async_trait]
impl ConversationView for ThreadView {
    async fn transcript(&self) -> Result<Vec<TranscriptEntry>> {
        let mut messages = self.client.list_messages(&self.thread_id, None).await?;
        // The service lists newest first; the transcript reads oldest first.
        messages.reverse();
        Ok(messages
            .iter()
            .map(|m| TranscriptEntry {
                role: m.role,
                text: concat_text_blocks(m),
            })
            .collect())
    }

    async fn summarize(&self, instruction: &str) -> Result<String> {
        let transcript = self.transcript().await?;
        let user_entries: Vec<&TranscriptEntry> = transcript
            .iter()
            .filter(|e| e.role == Role::User && !e.text.is_empty())
            .collect();
        if user_entries.is_empty() {
            return Ok("No messages available to summarize.".to_string());
        }

        let mut messages = vec![
            ChatMessage {
                role: "system",
                content: instruction.to_string(),
            },
            ChatMessage {
                role: "user",
                content: "Summarize the following conversation:".to_string(),
            },
        ];
        for entry in user_entries {
            messages.push(ChatMessage {
                role: "user",
                content: entry.text.clone(),
            });
        }
        self.client.complete(&messages, 150).await
    }
}
