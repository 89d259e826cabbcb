//! Wire types for the upstream chat-completion provider.
//!
//! The request half is what we send after translation, with all sampling
//! parameters already concrete (defaulting happens in
//! [`crate::translate::request`], not here). The response half is
//! deserialized tolerantly: providers differ in which optional fields they
//! emit, so token counts zero-fill and `finish_reason` may be absent.

use serde::{Deserialize, Serialize};

use super::api_types::ChatMessage;

// ---------------------------------------------------------------------------
// Request (what we send TO the provider)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub stream: bool,
}

// ---------------------------------------------------------------------------
// Buffered response (what the provider sends back in JSON mode)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamResponse {
    #[serde(default)]
    pub choices: Vec<UpstreamChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UpstreamUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamChoice {
    #[serde(default)]
    pub index: u64,
    /// The assistant message as raw JSON; relayed to callers verbatim.
    pub message: serde_json::Value,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

// ---------------------------------------------------------------------------
// Streamed events (one per `data:` line in SSE mode)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamChunk {
    #[serde(default)]
    pub choices: Vec<UpstreamChunkChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamChunkChoice {
    #[serde(default)]
    pub index: u64,
    /// Incremental delta as raw JSON; relayed to callers verbatim.
    #[serde(default)]
    pub delta: serde_json::Value,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Error body (what the provider sends on a non-success status)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamErrorBody {
    pub error: UpstreamError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamError {
    pub message: String,
    #[serde(rename = "type")]
    #[serde(default)]
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
