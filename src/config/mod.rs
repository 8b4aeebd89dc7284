//! Environment-driven configuration and the enabled-tool list.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::engine::PollPolicy;
use crate::error::{ConciergeError, Result};

/// Default path of the tool-selection file.
pub const TOOLS_CONFIG_PATH: &str = "concierge.toml";

/// Top-level configuration, resolved once at startup.
///
/// Missing credentials or endpoints are fatal here; per-tool configuration
/// blocks are optional and only gate the tools that need them.
#[derive(Debug, Clone)]
pub struct ConciergeConfig {
    /// Base URL of the remote assistant service.
    pub base_url: String,
    pub api_key: String,
    /// Identifier of the remote assistant runs are started against.
    pub assistant_id: String,
    /// Model deployment used for restricted follow-up completions.
    pub model: String,
    pub search: Option<SearchConfig>,
    pub incident: Option<IncidentConfig>,
    pub webhook_url: Option<String>,
    /// Ordered list of tool names to activate.
    pub enabled_tools: Vec<String>,
    pub poll: PollPolicy,
}

/// Document-retrieval service settings.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: String,
    pub index: String,
}

/// Ticket-lookup service settings.
#[derive(Debug, Clone)]
pub struct IncidentConfig {
    pub instance_url: String,
    pub username: String,
    pub password: String,
}

impl ConciergeConfig {
    /// Load configuration from the environment (after `.env`, if present)
    /// and the enabled-tool list from [`TOOLS_CONFIG_PATH`].
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let base_url = required("CONCIERGE_BASE_URL")?;
        let api_key = required("CONCIERGE_API_KEY")?;
        let assistant_id = required("CONCIERGE_ASSISTANT_ID")?;
        let model = env::var("CONCIERGE_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let search = match (
            env::var("CONCIERGE_SEARCH_ENDPOINT"),
            env::var("CONCIERGE_SEARCH_API_KEY"),
            env::var("CONCIERGE_SEARCH_INDEX"),
        ) {
            (Ok(endpoint), Ok(api_key), Ok(index)) => Some(SearchConfig {
                endpoint,
                api_key,
                index,
            }),
            _ => None,
        };

        let incident = match (
            env::var("CONCIERGE_SN_INSTANCE_URL"),
            env::var("CONCIERGE_SN_USER"),
            env::var("CONCIERGE_SN_PASSWORD"),
        ) {
            (Ok(instance_url), Ok(username), Ok(password)) => Some(IncidentConfig {
                instance_url,
                username,
                password,
            }),
            _ => None,
        };

        let webhook_url = env::var("CONCIERGE_TEAMS_WEBHOOK_URL").ok();

        let mut poll = PollPolicy::default();
        if let Some(ms) = env_u64("CONCIERGE_POLL_INTERVAL_MS") {
            poll.initial_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("CONCIERGE_POLL_BUDGET_MS") {
            poll.budget = Duration::from_millis(ms);
        }

        Ok(Self {
            base_url,
            api_key,
            assistant_id,
            model,
            search,
            incident,
            webhook_url,
            enabled_tools: load_enabled_tools(TOOLS_CONFIG_PATH),
            poll,
        })
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConciergeError::Configuration(format!("{name} is not set")))
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[derive(Debug, Deserialize)]
struct ToolsFile {
    #[serde(default)]
    tools: ToolsSection,
}

#[derive(Debug, Default, Deserialize)]
struct ToolsSection {
    #[serde(default)]
    enabled: Vec<String>,
}

/// Read the ordered enabled-tool list from a TOML file.
///
/// A missing or malformed file yields an empty list with a warning; a
/// tool-less configuration is deliberate, not fatal.
pub fn load_enabled_tools(path: impl AsRef<Path>) -> Vec<String> {
    let path = path.as_ref();
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "tools config not readable; no tools enabled");
            return Vec::new();
        }
    };
    match toml::from_str::<ToolsFile>(&text) {
        Ok(file) => file.tools.enabled,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "tools config malformed; no tools enabled");
            Vec::new()
        }
    }
}
