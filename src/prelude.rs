//! Convenience re-exports.

pub use crate::answer::Citation;
pub use crate::chat::{Chat, TurnRequest, TurnResponse};
pub use crate::client::AssistantsClient;
pub use crate::config::ConciergeConfig;
pub use crate::engine::{PollPolicy, RunEngine, Turn};
pub use crate::error::{ConciergeError, Result};
pub use crate::session::Session;
pub use crate::tools::{Tool, ToolContext, ToolInvocation, ToolRegistry};
