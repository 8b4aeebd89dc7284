//! The run engine: drives one conversational turn to completion.
//!
//! State machine: a run starts `Queued`, is polled through `InProgress`,
//! and either finishes in a terminal state or detours through
//! `RequiresAction`, where the engine dispatches the requested tool calls,
//! submits the batch of outputs, and resumes polling.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::answer::{newest_assistant_text, Citation, CitationCollector};
use crate::client::{AssistantsClient, RunRequest, RunStatus, ToolCall, ToolOutput};
use crate::error::{ConciergeError, Result};
use crate::session::Session;
use crate::tools::{ToolContext, ToolRegistry};

/// Fixed instruction block for every run.
pub const GROUNDING_INSTRUCTIONS: &str = "You are a technical assistant that gives precise, \
    well-structured answers. Always ground your answers in the retrieved context, cite the \
    retrieved sources using bracketed numbers, and format everything in Markdown (headings, \
    lists, code blocks). If you find no relevant information, reply only: Sorry, I could not \
    find relevant information for your question.";

/// Degraded answer returned when a turn fails internally.
pub const FALLBACK_ANSWER: &str =
    "Sorry, something went wrong while processing your question. Please try again later.";

/// A run demanding more tool cycles than this is considered stuck.
const MAX_ACTION_CYCLES: usize = 8;

/// Polling cadence and budget for one turn.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    /// Total wall-clock budget for the whole turn's polling.
    pub budget: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(5),
            multiplier: 1.5,
            budget: Duration::from_secs(120),
        }
    }
}

impl PollPolicy {
    fn next_interval(&self, current: Duration) -> Duration {
        let grown = Duration::from_secs_f64(current.as_secs_f64() * self.multiplier);
        grown.min(self.max_interval)
    }
}

/// The outcome of one conversational turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub thread_id: String,
    pub answer: String,
    pub citations: Vec<Citation>,
}

/// Drives runs against the active thread, dispatching tools as required.
pub struct RunEngine {
    client: Arc<AssistantsClient>,
    registry: Arc<ToolRegistry>,
    assistant_id: String,
    poll: PollPolicy,
}

impl RunEngine {
    pub fn new(
        client: Arc<AssistantsClient>,
        registry: Arc<ToolRegistry>,
        assistant_id: impl Into<String>,
        poll: PollPolicy,
    ) -> Self {
        Self {
            client,
            registry,
            assistant_id: assistant_id.into(),
            poll,
        }
    }

    /// Execute one turn against the session's active thread.
    ///
    /// Never fails: any error escaping the internal state machine is logged
    /// and converted into the fixed degraded answer with no citations.
    pub async fn execute_turn(&self, session: &Session) -> Turn {
        let thread_id = session.thread_id().unwrap_or_default().to_string();
        match self.drive(session).await {
            Ok((answer, citations)) => Turn {
                thread_id,
                answer,
                citations,
            },
            Err(err) => {
                error!(error = %err, %thread_id, "turn failed; returning degraded answer");
                Turn {
                    thread_id,
                    answer: FALLBACK_ANSWER.to_string(),
                    citations: Vec::new(),
                }
            }
        }
    }

    async fn drive(&self, session: &Session) -> Result<(String, Vec<Citation>)> {
        let thread_id = session.active_thread()?;
        // Citations are run-scoped; a fresh collector per turn.
        let mut citations = CitationCollector::new();
        let ctx = ToolContext::new(Arc::new(session.view()?));

        let mut run = self
            .client
            .create_run(
                thread_id,
                &RunRequest {
                    assistant_id: self.assistant_id.clone(),
                    additional_instructions: GROUNDING_INSTRUCTIONS.to_string(),
                    tools: self.registry.descriptors(),
                    require_tool_use: true,
                },
            )
            .await?;
        info!(thread_id, run_id = %run.id, "run started");

        let started = Instant::now();
        let mut interval = self.poll.initial_interval;
        let mut action_cycles = 0usize;

        loop {
            while run.status.is_pending() {
                if started.elapsed() >= self.poll.budget {
                    return Err(ConciergeError::Timeout(self.poll.budget.as_millis() as u64));
                }
                debug!(run_id = %run.id, status = ?run.status, "waiting for run");
                sleep(interval).await;
                interval = self.poll.next_interval(interval);
                run = self.client.retrieve_run(thread_id, &run.id).await?;
            }

            match run.status {
                RunStatus::RequiresAction => {
                    action_cycles += 1;
                    if action_cycles > MAX_ACTION_CYCLES {
                        return Err(ConciergeError::RunStalled(MAX_ACTION_CYCLES));
                    }

                    let calls = run
                        .required_action
                        .as_ref()
                        .map(|a| a.submit_tool_outputs.tool_calls.clone())
                        .unwrap_or_default();
                    let outputs = self.dispatch_calls(&calls, &ctx, &mut citations).await;

                    run = self
                        .client
                        .submit_tool_outputs(thread_id, &run.id, &outputs)
                        .await
                        .map_err(|e| ConciergeError::ToolSubmission(e.to_string()))?;
                    // New polling cycle, fresh backoff.
                    interval = self.poll.initial_interval;
                }
                status => {
                    debug_assert!(status.is_terminal());
                    break;
                }
            }
        }

        let answer = match run.status {
            RunStatus::Completed => {
                let messages = self.client.list_messages(thread_id, Some(&run.id)).await?;
                newest_assistant_text(&messages)
            }
            status => {
                warn!(run_id = %run.id, ?status, error = ?run.last_error, "run ended without completing");
                // Best effort: surface whatever partial answer exists.
                self.client
                    .list_messages(thread_id, Some(&run.id))
                    .await
                    .map(|messages| newest_assistant_text(&messages))
                    .unwrap_or_default()
            }
        };
        Ok((answer, citations.into_citations()))
    }

    /// Dispatch each requested call in order, shaping every per-call failure
    /// into an error output so the batch (and the run) can still proceed.
    async fn dispatch_calls(
        &self,
        calls: &[ToolCall],
        ctx: &ToolContext,
        citations: &mut CitationCollector,
    ) -> Vec<ToolOutput> {
        let mut outputs = Vec::with_capacity(calls.len());
        for call in calls {
            let name = &call.function.name;
            debug!(call_id = %call.id, tool = %name, "dispatching tool call");
            let output = match self
                .registry
                .dispatch(name, &call.function.arguments, &ctx.for_call(&call.id))
                .await
            {
                Ok(invocation) => {
                    citations.absorb(invocation.citations);
                    serialize_output(&invocation.output)
                }
                Err(err) => {
                    warn!(call_id = %call.id, tool = %name, error = %err, "tool call failed");
                    serde_json::json!({ "error": err.to_string() }).to_string()
                }
            };
            outputs.push(ToolOutput {
                tool_call_id: call.id.clone(),
                output,
            });
        }
        outputs
    }
}

/// Textual serialization of a tool's output value. Plain strings pass
/// through unquoted.
fn serialize_output(output: &serde_json::Value) -> String {
    match output {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_interval_grows_to_cap() {
        let poll = PollPolicy {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_millis(300),
            multiplier: 2.0,
            budget: Duration::from_secs(1),
        };
        let second = poll.next_interval(poll.initial_interval);
        assert_eq!(second, Duration::from_millis(200));
        assert_eq!(poll.next_interval(second), Duration::from_millis(300));
        assert_eq!(
            poll.next_interval(Duration::from_millis(300)),
            Duration::from_millis(300)
        );
    }

    #[test]
    fn string_outputs_pass_through_unquoted() {
        assert_eq!(serialize_output(&serde_json::json!("plain text")), "plain text");
        assert_eq!(serialize_output(&serde_json::json!({"k": 1})), r#"{"k":1}"#);
    }
}
