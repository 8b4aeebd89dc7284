//! Answer assembly: text-block concatenation and citation merging.
//!
//! Pure data transformation, no I/O.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::client::{ContentBlock, Role, ThreadMessage};

/// A reference to a source document contributing to an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: u32,
    pub filename: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Citation {
    pub fn new(id: u32, filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            filename: filename.into(),
            url: url.into(),
            score: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

/// Concatenate a message's text-bearing content blocks, in order.
pub fn concat_text_blocks(message: &ThreadMessage) -> String {
    let mut answer = String::new();
    for block in &message.content {
        if let ContentBlock::Text { text } = block {
            answer.push_str(&text.value);
        }
    }
    answer
}

/// Extract the most recent assistant-authored message's text from a
/// newest-first message list. Empty when no assistant message exists.
pub fn newest_assistant_text(messages: &[ThreadMessage]) -> String {
    messages
        .iter()
        .find(|m| m.role == Role::Assistant)
        .map(concat_text_blocks)
        .unwrap_or_default()
}

/// Run-scoped citation accumulator.
///
/// Merges per-call citation lists in first-seen order, renumbering ids
/// 1..N gap-free and deduplicating by source locator.
#[derive(Debug, Default)]
pub struct CitationCollector {
    citations: Vec<Citation>,
    seen: HashSet<String>,
}

impl CitationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one call's citations into the running list.
    pub fn absorb(&mut self, incoming: impl IntoIterator<Item = Citation>) {
        for mut citation in incoming {
            if !self.seen.insert(citation.url.clone()) {
                continue;
            }
            citation.id = self.citations.len() as u32 + 1;
            self.citations.push(citation);
        }
    }

    pub fn len(&self) -> usize {
        self.citations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }

    pub fn into_citations(self) -> Vec<Citation> {
        self.citations
    }
}
