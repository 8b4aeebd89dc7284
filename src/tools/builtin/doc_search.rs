//! Document retrieval tool backing the assistant's grounding context.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::answer::Citation;
use crate::client::http::{shared_client, status_to_error};
use crate::config::{ConciergeConfig, SearchConfig};
use crate::error::{ConciergeError, Result};
use crate::tools::arguments::ToolArguments;
use crate::tools::tool::{Tool, ToolContext, ToolInvocation};
use crate::tools::types::{ToolDescriptor, ToolParameters};

pub const NAME: &str = "doc_search";

/// Passages longer than this are truncated before being handed to the model.
const CHUNK_LIMIT: usize = 300;
const DEFAULT_TOP_K: i64 = 3;
const VECTOR_FIELD: &str = "text_vector";
const API_VERSION: &str = "2024-07-01";

pub fn factory(config: &ConciergeConfig) -> Result<Arc<dyn Tool>> {
    let search = config.search.clone().ok_or_else(|| {
        ConciergeError::Configuration("search endpoint, api key and index are required".into())
    })?;
    Ok(Arc::new(DocSearchTool::new(search)))
}

/// Vector search over the configured document index. Each returned passage
/// contributes one citation.
#[derive(Debug)]
pub struct DocSearchTool {
    config: SearchConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    chunk: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    metadata_storage_path: Option<String>,
    #[serde(default, rename = "@search.score")]
    score: Option<f64>,
}

impl DocSearchTool {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    async fn search(&self, query: &str, top_k: i64) -> Result<Vec<SearchHit>> {
        let url = format!(
            "{}/indexes/{}/docs/search?api-version={API_VERSION}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.index,
        );
        let body = serde_json::json!({
            "vectorQueries": [{
                "kind": "text",
                "text": query,
                "fields": VECTOR_FIELD,
                "k": top_k,
            }],
            "top": top_k,
            "select": "chunk,title,metadata_storage_path",
        });

        debug!(query, top_k, "running document search");
        let resp = shared_client()
            .post(&url)
            .header("api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body));
        }
        let data: SearchResponse = resp.json().await?;
        Ok(data.value)
    }
}

#[async_trait]
impl Tool for DocSearchTool {
    fn name(&self) -> &str {
        NAME
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            NAME,
            "Retrieves passages from the document index to ground the answer.",
            ToolParameters::object()
                .string(
                    "query",
                    "The user's exact request, used as the retrieval query.",
                    true,
                )
                .boolean(
                    "search_needed",
                    "Whether the user's request needs document retrieval at all.",
                    true,
                )
                .number("top_k", "Number of passages to retrieve.", false)
                .build(),
        )
    }

    async fn invoke(&self, args: &ToolArguments, _ctx: &ToolContext) -> Result<ToolInvocation> {
        let query = args.get_str("query")?;
        let search_needed = args.get_bool_opt("search_needed").unwrap_or(true);
        let top_k = args.get_i64_opt("top_k").unwrap_or(DEFAULT_TOP_K).max(1);

        if !search_needed {
            return Ok(ToolInvocation::output(serde_json::Value::Null));
        }

        let hits = self.search(query, top_k).await?;

        let mut passages = Vec::with_capacity(hits.len());
        let mut citations = Vec::with_capacity(hits.len());
        for (i, hit) in hits.into_iter().enumerate() {
            let title = hit.title.unwrap_or_else(|| "untitled".to_string());
            let source = hit
                .metadata_storage_path
                .unwrap_or_else(|| "unknown".to_string());
            let chunk: String = hit
                .chunk
                .unwrap_or_default()
                .chars()
                .take(CHUNK_LIMIT)
                .collect();

            passages.push(serde_json::json!({
                "chunk": chunk,
                "title": title,
                "source": source,
                "score": hit.score,
            }));
            let mut citation = Citation::new(i as u32 + 1, title, source);
            if let Some(score) = hit.score {
                citation = citation.with_score(score);
            }
            citations.push(citation);
        }

        Ok(ToolInvocation::with_citations(
            serde_json::Value::Array(passages),
            citations,
        ))
    }
}
