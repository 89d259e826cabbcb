use chrono::Utc;

use super::api_types::{synthesize_id, ChatChoice, ChatCompletionResponse, ChatUsage};
use super::upstream_types::UpstreamResponse;
use crate::error::{BridgeError, Result};

/// Translate a buffered upstream response into the inbound response envelope.
///
/// The id and `created` timestamp are minted here from the current clock;
/// whatever identifier the upstream issued is discarded. `original_model` is
/// the model string the caller asked for; the upstream's self-reported model
/// is never echoed back.
///
/// # Errors
/// Returns `BridgeError::Translation` when the upstream response carries no
/// choices at all.
pub fn upstream_to_chat(
    resp: &UpstreamResponse,
    original_model: &str,
) -> Result<ChatCompletionResponse> {
    let choice = resp.choices.first().ok_or_else(|| {
        BridgeError::translation("upstream response contained no choices")
    })?;

    let finish_reason = choice
        .finish_reason
        .clone()
        .unwrap_or_else(|| "stop".to_string());

    let usage = resp.usage.as_ref().map_or_else(ChatUsage::default, |u| ChatUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    let now = Utc::now();

    Ok(ChatCompletionResponse {
        id: synthesize_id(now),
        object: "chat.completion".to_string(),
        created: now.timestamp() as u64,
        model: original_model.to_string(),
        choices: vec![ChatChoice {
            index: 0,
            message: choice.message.clone(),
            finish_reason,
        }],
        usage,
    })
}
