//! Tool system: descriptors, arguments, registry, built-in capabilities.

pub mod arguments;
pub mod builtin;
pub mod registry;
pub mod tool;
pub mod types;

pub use arguments::ToolArguments;
pub use registry::ToolRegistry;
pub use tool::{ConversationView, Tool, ToolContext, ToolInvocation, TranscriptEntry};
pub use types::{ToolDescriptor, ToolParameters};
