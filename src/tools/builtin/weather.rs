//! Simulated weather lookup.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ConciergeConfig;
use crate::error::Result;
use crate::tools::arguments::ToolArguments;
use crate::tools::tool::{Tool, ToolContext, ToolInvocation};
use crate::tools::types::{ToolDescriptor, ToolParameters};

pub const NAME: &str = "get_weather";

pub fn factory(_config: &ConciergeConfig) -> Result<Arc<dyn Tool>> {
    Ok(Arc::new(WeatherTool))
}

/// Returns canned weather data for a city, with a small delay imitating a
/// real provider's response time.
#[derive(Debug, Default)]
pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        NAME
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            NAME,
            "Returns the current weather for a specific city.",
            ToolParameters::object()
                .string("city", "Name of the city to report the weather for.", true)
                .build(),
        )
    }

    async fn invoke(&self, args: &ToolArguments, _ctx: &ToolContext) -> Result<ToolInvocation> {
        let city = args.get_str("city")?;
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok(ToolInvocation::output(serde_json::json!({
            "city": city,
            "temperature": "25C",
            "condition": "Sunny",
            "humidity": "60%",
            "wind_speed": "15 km/h",
        })))
    }
}
