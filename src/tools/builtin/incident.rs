//! Ticket lookup against a ServiceNow-style table API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::client::http::shared_client;
use crate::config::{ConciergeConfig, IncidentConfig};
use crate::error::{ConciergeError, Result};
use crate::tools::arguments::ToolArguments;
use crate::tools::tool::{Tool, ToolContext, ToolInvocation};
use crate::tools::types::{ToolDescriptor, ToolParameters};

pub const NAME: &str = "get_incident_status";

const INCIDENT_PATTERN: &str = "^INC\\d{8}$";

pub fn factory(config: &ConciergeConfig) -> Result<Arc<dyn Tool>> {
    let incident = config.incident.clone().ok_or_else(|| {
        ConciergeError::Configuration("incident instance url and credentials are required".into())
    })?;
    Ok(Arc::new(IncidentStatusTool::new(incident)))
}

/// Looks up one incident record by number. Lookup failures become
/// error-shaped outputs so the remote model can react, not Rust errors.
#[derive(Debug)]
pub struct IncidentStatusTool {
    config: IncidentConfig,
}

#[derive(Debug, Deserialize)]
struct TableResponse {
    #[serde(default)]
    result: Vec<serde_json::Value>,
}

impl IncidentStatusTool {
    pub fn new(config: IncidentConfig) -> Self {
        Self { config }
    }
}

/// Matches `INC` followed by exactly eight digits.
fn is_valid_incident_number(number: &str) -> bool {
    let Some(digits) = number.strip_prefix("INC") else {
        return false;
    };
    digits.len() == 8 && digits.bytes().all(|b| b.is_ascii_digit())
}

#[async_trait]
impl Tool for IncidentStatusTool {
    fn name(&self) -> &str {
        NAME
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            NAME,
            "Looks up the status and details of a support incident by its number.",
            ToolParameters::object()
                .string_pattern(
                    "incident_number",
                    "Incident number, e.g. INC00012345.",
                    INCIDENT_PATTERN,
                    true,
                )
                .build(),
        )
    }

    async fn invoke(&self, args: &ToolArguments, _ctx: &ToolContext) -> Result<ToolInvocation> {
        let number = args.get_str("incident_number")?;
        if !is_valid_incident_number(number) {
            return Ok(ToolInvocation::output(serde_json::json!({
                "error": format!("'{number}' is not a valid incident number"),
            })));
        }

        let url = format!(
            "{}/api/now/table/incident",
            self.config.instance_url.trim_end_matches('/')
        );
        debug!(incident = number, "looking up incident");
        let resp = shared_client()
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .query(&[
                ("sysparm_query", format!("number={number}")),
                ("sysparm_limit", "1".to_string()),
            ])
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            return Ok(ToolInvocation::output(serde_json::json!({
                "error": format!("lookup failed (status {status}): {body}"),
            })));
        }

        let data: TableResponse = resp.json().await?;
        let Some(record) = data.result.into_iter().next() else {
            return Ok(ToolInvocation::output(serde_json::json!({
                "message": format!("no incident found with number {number}"),
            })));
        };
        Ok(ToolInvocation::output(record))
    }
}
