//! Built-in tool implementations.
//!
//! Domain logic here is intentionally shallow; the engine only relies on the
//! shared descriptor/invoke contract.

pub mod doc_search;
pub mod incident;
pub mod relay;
pub mod weather;

pub use doc_search::DocSearchTool;
pub use incident::IncidentStatusTool;
pub use relay::RelayToAgentTool;
pub use weather::WeatherTool;
