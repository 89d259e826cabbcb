//! Outbound calls to the configured upstream.
//!
//! Both entry points translate the inbound request, forward it with the
//! bearer credential, and hand the upstream's answer to the translators.
//! Upstream-reported failures come back as [`BridgeError::Upstream`] so the
//! endpoint layer mirrors the upstream's status code; everything that fails
//! on our side of the wire maps to a 500-class error.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::logging::SharedLogger;
use crate::translate::api_types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::translate::request::chat_to_upstream;
use crate::translate::response::upstream_to_chat;
use crate::translate::streaming::StreamRelay;
use crate::translate::upstream_types::{UpstreamErrorBody, UpstreamResponse};

use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use std::pin::Pin;
use std::time::Duration;

/// Outgoing frames of a relayed stream, ready to write to the response body.
pub type FrameStream =
    Pin<Box<dyn Stream<Item = std::result::Result<String, std::io::Error>> + Send>>;

/// Shared outbound client. Only connection establishment is bounded here; an
/// overall client timeout would cut long-lived streams short, so the
/// non-streaming path applies its own per-request bound instead.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .build()
}

/// Forward a non-streaming request through the configured upstream.
pub async fn proxy_non_streaming(
    req: &ChatCompletionRequest,
    config: &BridgeConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<ChatCompletionResponse> {
    let api_key = config.require_api_key()?;
    let base_url = config.effective_base_url()?;
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

    let upstream_req = chat_to_upstream(req, &config.models, &config.default_model);

    logger.info("proxy", format!("POST {} model={}", url, upstream_req.model));

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .header("Accept", "application/json")
        .timeout(config.request_timeout())
        .json(&upstream_req)
        .send()
        .await
        .map_err(|e| BridgeError::connection(format!("Request failed: {}", e)))?;

    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| BridgeError::connection(format!("Failed to read response body: {}", e)))?;

    logger.debug(
        "proxy",
        format!("Response status={} body_len={}", status, body.len()),
    );

    if status >= 400 {
        logger.warn(
            "proxy",
            format!("Upstream error status={}: {}", status, truncate(&body, 300)),
        );
        return Err(upstream_failure(status, &body));
    }

    let upstream_resp: UpstreamResponse = serde_json::from_str(&body).map_err(|e| {
        BridgeError::translation(format!(
            "Failed to parse upstream response: {}. Body: {}",
            e,
            truncate(&body, 300)
        ))
    })?;

    let chat_resp = upstream_to_chat(&upstream_resp, &req.model)?;

    logger.info(
        "proxy",
        format!(
            "Completed: in={} out={} tokens",
            chat_resp.usage.prompt_tokens, chat_resp.usage.completion_tokens
        ),
    );

    Ok(chat_resp)
}

/// Open the upstream event stream and return the relayed outgoing frames.
///
/// Failure to open the stream at all (connect failure, or the upstream
/// refusing the request with an error status) returns `Err`, so the caller
/// receives one non-streamed error response instead of an event stream.
/// Once the stream is open, a mid-stream upstream failure ends the body
/// abruptly with no structured error payload.
pub async fn proxy_streaming(
    req: &ChatCompletionRequest,
    config: &BridgeConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<FrameStream> {
    let api_key = config.require_api_key()?;
    let base_url = config.effective_base_url()?;
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

    let upstream_req = chat_to_upstream(req, &config.models, &config.default_model);

    logger.info(
        "proxy",
        format!("POST {} model={} (streaming)", url, upstream_req.model),
    );

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .header("Accept", "text/event-stream")
        .json(&upstream_req)
        .send()
        .await
        .map_err(|e| BridgeError::connection(format!("Streaming request failed: {}", e)))?;

    let status = response.status().as_u16();

    if status >= 400 {
        let body = response.text().await.unwrap_or_default();
        logger.warn(
            "proxy",
            format!("Streaming error status={}: {}", status, truncate(&body, 300)),
        );
        return Err(upstream_failure(status, &body));
    }

    let relay = StreamRelay::new(&req.model, logger.clone());
    let byte_stream = response.bytes_stream();

    Ok(Box::pin(relay_byte_stream(
        byte_stream,
        relay,
        logger.clone(),
    )))
}

/// Drive a [`StreamRelay`] over the upstream byte stream.
///
/// The returned stream is dropped when the caller disconnects; dropping it
/// drops `byte_stream` and with it the upstream connection, so no relay work
/// continues for a caller that went away.
fn relay_byte_stream<E>(
    byte_stream: impl Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    mut relay: StreamRelay,
    logger: SharedLogger,
) -> impl Stream<Item = std::result::Result<String, std::io::Error>> + Send + 'static
where
    E: std::fmt::Display + Send + 'static,
{
    async_stream::stream! {
        tokio::pin!(byte_stream);

        let mut upstream_failed = false;

        while let Some(chunk_result) = byte_stream.next().await {
            match chunk_result {
                Ok(chunk) => {
                    for frame in relay.process(&chunk) {
                        yield Ok(frame);
                    }
                    if relay.is_done() {
                        break;
                    }
                }
                Err(e) => {
                    logger.error("relay", format!("Upstream byte stream error: {}", e));
                    upstream_failed = true;
                    break;
                }
            }
        }

        // A broken upstream closes the body abruptly, no terminator. A
        // stream that merely ended without its sentinel still terminates
        // cleanly.
        if !upstream_failed {
            if let Some(frame) = relay.finish() {
                yield Ok(frame);
            }
        }

        let stats = relay.stats();
        logger.info(
            "relay",
            format!(
                "Stream completed: forwarded={} skipped={}",
                stats.forwarded(),
                stats.skipped()
            ),
        );
    }
}

/// Map an upstream non-success body to the error that mirrors it back.
fn upstream_failure(status: u16, body: &str) -> BridgeError {
    match serde_json::from_str::<UpstreamErrorBody>(body) {
        Ok(err) => {
            let error_type = if err.error.error_type.is_empty() {
                None
            } else {
                Some(err.error.error_type.clone())
            };
            BridgeError::upstream(status, err.error.message, error_type, err.error.code)
        }
        Err(_) => BridgeError::upstream(
            status,
            format!(
                "Upstream returned status {}: {}",
                status,
                truncate(body, 500)
            ),
            None,
            None,
        ),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
