//! Core trait definitions for persistence and text generation.
//!
//! `UsedItemsStore` is implemented in [`crate::store`]; `TextGenerator` is
//! implemented by the `acuquiz-providers` crate.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Used-items persistence
// ---------------------------------------------------------------------------

/// Bank key → names already drawn from that bank.
pub type UsedItems = BTreeMap<String, BTreeSet<String>>;

/// Durable record of which entries each bank has already served.
pub trait UsedItemsStore: Send + Sync {
    /// Load the full mapping. Missing or unreadable state yields an empty map.
    fn load(&self) -> UsedItems;

    /// Replace the persisted mapping.
    fn save(&self, items: &UsedItems) -> Result<(), StoreError>;

    /// Empty one bank's record and persist immediately.
    fn clear(&self, bank_key: &str) -> Result<(), StoreError> {
        let mut items = self.load();
        if let Some(names) = items.get_mut(bank_key) {
            names.clear();
        }
        self.save(&items)
    }
}

// ---------------------------------------------------------------------------
// Text generation
// ---------------------------------------------------------------------------

/// Backend able to answer a chat-style prompt, e.g. an OpenAI-compatible API.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Human-readable backend name (e.g. "openai-compatible").
    fn name(&self) -> &str;

    /// Send one request and return the assistant's text.
    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse>;
}

/// A single system + user exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier (e.g. "deepseek-chat").
    pub model: String,
    pub system_prompt: String,
    /// The user message, usually a JSON document.
    pub user_content: String,
    pub temperature: f64,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Ask the backend for a JSON object response.
    #[serde(default)]
    pub json_response: bool,
}

/// Response from a text-generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The raw assistant content.
    pub content: String,
    /// Model that actually produced the response.
    pub model: String,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

// ---------------------------------------------------------------------------
// JSON extraction
// ---------------------------------------------------------------------------

/// Pull a JSON object out of a model response.
///
/// Handles:
/// - a bare JSON object
/// - an object inside a ```json (or generic) fenced block
/// - an object surrounded by prose (first `{` to last `}`)
pub fn extract_json_object(response: &str) -> Option<&str> {
    let mut body = response.trim();

    if let Some(fence_start) = body.find("```") {
        let after_fence = &body[fence_start + 3..];
        // Skip the info string (e.g. "json") up to the end of the fence line.
        let content_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let content = &after_fence[content_start..];
        body = match content.find("```") {
            Some(end) => &content[..end],
            // Truncated block, take what arrived
            None => content,
        };
    }

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}
