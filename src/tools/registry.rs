//! Tool registry: startup-time loading and name-based dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ConciergeConfig;
use crate::error::{ConciergeError, Result};

use super::arguments::ToolArguments;
use super::builtin;
use super::tool::{Tool, ToolContext, ToolInvocation};
use super::types::ToolDescriptor;

/// Constructor for a named tool. Fails when required configuration for the
/// tool is absent; the registry records the failure and keeps loading.
pub type ToolFactory = fn(&ConciergeConfig) -> Result<Arc<dyn Tool>>;

/// The built-in name-to-factory map. Only configured names become active.
fn builtin_factories() -> Vec<(&'static str, ToolFactory)> {
    vec![
        (builtin::doc_search::NAME, builtin::doc_search::factory),
        (builtin::incident::NAME, builtin::incident::factory),
        (builtin::weather::NAME, builtin::weather::factory),
        (builtin::relay::NAME, builtin::relay::factory),
    ]
}

/// Name-to-executor mapping, built once at startup and read-only after.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
    failed: Vec<String>,
}

impl ToolRegistry {
    /// An empty registry (a deliberately tool-less configuration).
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an ordered list of configured tool names into executors.
    ///
    /// A name with no known factory, or a factory that fails (typically on
    /// missing configuration), is skipped with a warning; loading continues
    /// for the remaining names.
    pub fn load(config: &ConciergeConfig, enabled: &[String]) -> Self {
        let factories: HashMap<&str, ToolFactory> = builtin_factories().into_iter().collect();
        let mut registry = Self::new();

        if enabled.is_empty() {
            warn!("no tools enabled; assistant will run tool-less");
            return registry;
        }

        for name in enabled {
            let Some(factory) = factories.get(name.as_str()) else {
                warn!(tool = %name, "unknown tool name; skipping");
                registry.failed.push(name.clone());
                continue;
            };
            match factory(config) {
                Ok(tool) => {
                    info!(tool = %name, "tool loaded");
                    registry.register(tool);
                }
                Err(err) => {
                    warn!(tool = %name, error = %err, "tool failed to load; skipping");
                    registry.failed.push(name.clone());
                }
            }
        }
        registry
    }

    /// Add a tool, preserving registration order. Later registrations of the
    /// same name replace the executor but keep the original position.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&pos) => self.tools[pos] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Capability descriptors in load order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    /// Configured names that could not be loaded, for observability.
    pub fn failed_tools(&self) -> &[String] {
        &self.failed
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Parse the serialized arguments, resolve the named tool, shape-check
    /// the arguments against its schema, and invoke it.
    pub async fn dispatch(
        &self,
        name: &str,
        raw_arguments: &str,
        ctx: &ToolContext,
    ) -> Result<ToolInvocation> {
        let args = ToolArguments::parse(raw_arguments)?;
        let tool = self
            .index
            .get(name)
            .map(|&pos| &self.tools[pos])
            .ok_or_else(|| ConciergeError::ToolNotFound(name.to_string()))?;
        tool.descriptor().parameters.validate(&args)?;
        tool.invoke(&args, ctx).await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.index.keys().collect::<Vec<_>>())
            .field("failed", &self.failed)
            .finish()
    }
}
