use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request types (what callers send TO us)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// A single conversation turn. `content` is carried as raw JSON (a plain
/// string, a content-part array, or whatever else the caller sent) and is
/// forwarded upstream without validation. Any other fields on the inbound
/// message object are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Response types (what we send BACK to callers)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String, // "chat.completion"
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: ChatUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    pub index: u64,
    /// The upstream's assistant message, copied verbatim.
    pub message: serde_json::Value,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

// ---------------------------------------------------------------------------
// Streaming chunk types (one per relayed upstream event)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub id: String,
    pub object: String, // "chat.completion.chunk"
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u64,
    /// The upstream event's delta, passed through unmodified.
    pub delta: serde_json::Value,
    pub finish_reason: Option<String>,
}

impl StreamChunk {
    /// Envelope for one relayed upstream event: fresh id and timestamps per
    /// chunk, `model` echoing what the caller originally asked for.
    pub fn envelope(model: &str, delta: serde_json::Value, finish_reason: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: synthesize_id(now),
            object: "chat.completion.chunk".to_string(),
            created: now.timestamp() as u64,
            model: model.to_string(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }
}

/// Response identifiers are minted locally, never taken from the upstream.
pub(crate) fn synthesize_id(now: DateTime<Utc>) -> String {
    format!("chatcmpl-{}", now.timestamp_millis())
}

// ---------------------------------------------------------------------------
// Error envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error_type: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                error_type: error_type.to_string(),
                code: None,
            },
        }
    }

    pub fn with_code(error_type: &str, message: impl Into<String>, code: &str) -> Self {
        let mut envelope = Self::new(error_type, message);
        envelope.error.code = Some(code.to_string());
        envelope
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new("invalid_request_error", msg)
    }

    pub fn api_error(msg: impl Into<String>) -> Self {
        Self::new("api_error", msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new("internal_error", msg)
    }
}
