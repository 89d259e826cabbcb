//! Relay of upstream server-sent events into inbound-format stream chunks.
//!
//! The [`StreamRelay`] consumes raw network chunks from the upstream SSE
//! byte stream and emits outgoing `data: <json>\n\n` frames, one per
//! parseable upstream event, terminated by a single `data: [DONE]\n\n`.
//! Framing is the delicate part: the transport is free to split one SSE
//! line across two network chunks, so a [`LineBuffer`] carries the trailing
//! partial line (as raw bytes, so split UTF-8 sequences survive) until the
//! rest arrives. Malformed events are logged and skipped rather than
//! aborting the stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::BytesMut;

use super::api_types::StreamChunk;
use super::upstream_types::UpstreamChunk;
use crate::error::{BridgeError, Result};
use crate::logging::SharedLogger;

/// Payload marking the end of an upstream SSE stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// The terminator frame we forward to callers, exactly once per stream.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Accumulates raw bytes and yields complete newline-terminated lines,
/// carrying any trailing partial line into the next push. Buffering is
/// byte-wise: a multi-byte UTF-8 sequence split across network chunks is
/// reassembled before decoding.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete line without its terminator (CR trimmed), or `None`
    /// while only a partial line remains buffered.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let line = self.buf.split_to(pos + 1);
        let mut bytes = &line[..pos];
        if bytes.ends_with(b"\r") {
            bytes = &bytes[..bytes.len() - 1];
        }
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Bytes still waiting for their newline.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Cloneable handle over the relay's event counters. Skipping is silent on
/// the wire, so tests (and log lines at stream end) observe it here instead
/// of scraping console output.
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    forwarded: Arc<AtomicU64>,
    skipped: Arc<AtomicU64>,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Re-frame one parsed upstream event as an inbound stream chunk: fresh id
/// and timestamp, `model` echoing the caller's original request, delta and
/// finish_reason copied from the event's first choice unmodified.
///
/// # Errors
/// Returns `BridgeError::Translation` when the event carries no choices.
pub fn upstream_event_to_chunk(event: &UpstreamChunk, model: &str) -> Result<StreamChunk> {
    let choice = event.choices.first().ok_or_else(|| {
        BridgeError::translation("upstream stream event contained no choices")
    })?;

    Ok(StreamChunk::envelope(
        model,
        choice.delta.clone(),
        choice.finish_reason.clone(),
    ))
}

/// State machine relaying one upstream SSE stream to one caller.
///
/// Usage:
///   let mut relay = StreamRelay::new("gpt-4", logger);
///   for chunk in upstream_chunks {
///       for frame in relay.process(&chunk) { /* write frame */ }
///       if relay.is_done() { break; }
///   }
///   if let Some(frame) = relay.finish() { /* write terminator */ }
///
/// Once the `[DONE]` sentinel has been seen the relay is terminal: the rest
/// of that network chunk and anything after it is ignored, and `finish`
/// will not emit a second terminator.
#[derive(Debug)]
pub struct StreamRelay {
    model: String,
    lines: LineBuffer,
    done: bool,
    stats: RelayStats,
    logger: SharedLogger,
}

impl StreamRelay {
    pub fn new(model: &str, logger: SharedLogger) -> Self {
        Self {
            model: model.to_string(),
            lines: LineBuffer::new(),
            done: false,
            stats: RelayStats::new(),
            logger,
        }
    }

    /// Counter handle, cheap to clone, live for the whole stream.
    pub fn stats(&self) -> RelayStats {
        self.stats.clone()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Process one network chunk of upstream bytes, returning zero or more
    /// complete outgoing frames.
    pub fn process(&mut self, chunk: &[u8]) -> Vec<String> {
        if self.done {
            return Vec::new();
        }

        self.lines.push(chunk);

        let mut frames = Vec::new();

        while let Some(raw) = self.lines.next_line() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            // SSE data lines; comments, event names and separators pass by.
            let data = if let Some(stripped) = line.strip_prefix("data: ") {
                stripped.trim()
            } else if let Some(stripped) = line.strip_prefix("data:") {
                stripped.trim()
            } else {
                continue;
            };

            if data == DONE_SENTINEL {
                frames.push(DONE_FRAME.to_string());
                self.done = true;
                // Early exit: nothing after the sentinel is processed.
                break;
            }

            let event: UpstreamChunk = match serde_json::from_str(data) {
                Ok(e) => e,
                Err(e) => {
                    self.logger
                        .debug("relay", format!("skipping unparseable event: {}", e));
                    self.stats.record_skipped();
                    continue;
                }
            };

            match upstream_event_to_chunk(&event, &self.model) {
                Ok(chunk) => {
                    if let Ok(json) = serde_json::to_string(&chunk) {
                        frames.push(format!("data: {}\n\n", json));
                        self.stats.record_forwarded();
                    }
                }
                Err(e) => {
                    self.logger.debug("relay", format!("skipping event: {}", e));
                    self.stats.record_skipped();
                }
            }
        }

        frames
    }

    /// Terminator for natural upstream completion. `None` when the sentinel
    /// already went out.
    pub fn finish(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        self.done = true;
        Some(DONE_FRAME.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event_json(content: &str) -> String {
        json!({
            "id": "up-1",
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
        })
        .to_string()
    }

    fn relay() -> StreamRelay {
        StreamRelay::new("gpt-4", SharedLogger::in_memory())
    }

    fn parse_frame(frame: &str) -> serde_json::Value {
        let payload = frame
            .strip_prefix("data: ")
            .and_then(|s| s.strip_suffix("\n\n"))
            .expect("frame shape");
        serde_json::from_str(payload).expect("frame json")
    }

    #[test]
    fn test_line_buffer_yields_complete_lines() {
        let mut buf = LineBuffer::new();
        buf.push(b"one\ntwo\nthr");

        assert_eq!(buf.next_line().as_deref(), Some("one"));
        assert_eq!(buf.next_line().as_deref(), Some("two"));
        assert_eq!(buf.next_line(), None);
        assert_eq!(buf.pending(), 3);

        buf.push(b"ee\n");
        assert_eq!(buf.next_line().as_deref(), Some("three"));
        assert_eq!(buf.pending(), 0);
    }

    #[test]
    fn test_line_buffer_trims_crlf() {
        let mut buf = LineBuffer::new();
        buf.push(b"data: x\r\n");
        assert_eq!(buf.next_line().as_deref(), Some("data: x"));
    }

    #[test]
    fn test_line_buffer_survives_split_utf8() {
        // "é" is 0xC3 0xA9; split between the two bytes.
        let mut buf = LineBuffer::new();
        buf.push(&[b'c', b'a', b'f', 0xC3]);
        assert_eq!(buf.next_line(), None);
        buf.push(&[0xA9, b'\n']);
        assert_eq!(buf.next_line().as_deref(), Some("café"));
    }

    #[test]
    fn test_relay_forwards_events_in_order_with_one_terminator() {
        let mut relay = relay();
        let input = format!(
            "data: {}\n\ndata: {}\n\ndata: [DONE]\n\n",
            event_json("Hello"),
            event_json(" world")
        );

        let frames = relay.process(input.as_bytes());

        assert_eq!(frames.len(), 3);
        assert_eq!(parse_frame(&frames[0])["choices"][0]["delta"]["content"], "Hello");
        assert_eq!(parse_frame(&frames[1])["choices"][0]["delta"]["content"], " world");
        assert_eq!(frames[2], DONE_FRAME);
        assert!(relay.is_done());
        assert_eq!(relay.stats().forwarded(), 2);
        assert_eq!(relay.stats().skipped(), 0);
        assert_eq!(relay.finish(), None);
    }

    #[test]
    fn test_relay_chunk_envelope_shape() {
        let mut relay = relay();
        let frames = relay.process(format!("data: {}\n\n", event_json("hi")).as_bytes());

        let chunk = parse_frame(&frames[0]);
        assert_eq!(chunk["object"], "chat.completion.chunk");
        assert_eq!(chunk["model"], "gpt-4");
        assert!(chunk["id"].as_str().unwrap().starts_with("chatcmpl-"));
        assert!(chunk["created"].as_u64().unwrap() > 0);
        assert_eq!(chunk["choices"][0]["index"], 0);
        assert_eq!(chunk["choices"][0]["finish_reason"], serde_json::Value::Null);
    }

    #[test]
    fn test_relay_skips_malformed_event_and_continues() {
        let logger = SharedLogger::in_memory();
        let mut relay = StreamRelay::new("gpt-4", logger.clone());
        let input = format!(
            "data: {}\n\ndata: {{not json\n\ndata: {}\n\n",
            event_json("a"),
            event_json("b")
        );

        let frames = relay.process(input.as_bytes());

        assert_eq!(frames.len(), 2);
        assert_eq!(parse_frame(&frames[0])["choices"][0]["delta"]["content"], "a");
        assert_eq!(parse_frame(&frames[1])["choices"][0]["delta"]["content"], "b");
        assert_eq!(relay.stats().skipped(), 1);
        assert_eq!(relay.stats().forwarded(), 2);

        // The skip leaves a trail in the injected logger.
        let trail = logger.recent(10);
        assert!(trail.iter().any(|e| e.message.contains("unparseable")));
    }

    #[test]
    fn test_relay_skips_zero_choice_event() {
        let mut relay = relay();
        let frames = relay.process(b"data: {\"choices\": []}\n\n");

        assert!(frames.is_empty());
        assert_eq!(relay.stats().skipped(), 1);
    }

    #[test]
    fn test_done_mid_chunk_stops_processing() {
        let mut relay = relay();
        let input = format!(
            "data: {}\n\ndata: [DONE]\n\ndata: {}\n\n",
            event_json("before"),
            event_json("after")
        );

        let frames = relay.process(input.as_bytes());

        assert_eq!(frames.len(), 2);
        assert_eq!(parse_frame(&frames[0])["choices"][0]["delta"]["content"], "before");
        assert_eq!(frames[1], DONE_FRAME);
        assert_eq!(relay.stats().forwarded(), 1);

        // Terminal: later network chunks are ignored too.
        let more = relay.process(format!("data: {}\n\n", event_json("late")).as_bytes());
        assert!(more.is_empty());
        assert_eq!(relay.stats().forwarded(), 1);
    }

    #[test]
    fn test_event_split_across_network_chunks() {
        let mut relay = relay();
        let full = format!("data: {}\n\n", event_json("Héllo"));
        // Split inside the JSON payload, within the two-byte "é".
        let bytes = full.as_bytes();
        let cut = full.find('é').unwrap() + 1;

        let first = relay.process(&bytes[..cut]);
        assert!(first.is_empty());

        let second = relay.process(&bytes[cut..]);
        assert_eq!(second.len(), 1);
        assert_eq!(
            parse_frame(&second[0])["choices"][0]["delta"]["content"],
            "Héllo"
        );
        assert_eq!(relay.stats().forwarded(), 1);
        assert_eq!(relay.stats().skipped(), 0);
    }

    #[test]
    fn test_non_data_lines_ignored() {
        let mut relay = relay();
        let input = format!(
            ": keep-alive\nevent: message\ndata: {}\n\n",
            event_json("x")
        );

        let frames = relay.process(input.as_bytes());
        assert_eq!(frames.len(), 1);
        assert_eq!(relay.stats().skipped(), 0);
    }

    #[test]
    fn test_finish_emits_terminator_once_on_natural_end() {
        let mut relay = relay();
        let _ = relay.process(format!("data: {}\n\n", event_json("x")).as_bytes());

        assert_eq!(relay.finish().as_deref(), Some(DONE_FRAME));
        assert_eq!(relay.finish(), None);
    }

    #[test]
    fn test_delta_passed_through_unmodified() {
        let mut relay = relay();
        let event = json!({
            "choices": [{
                "index": 0,
                "delta": {"role": "assistant", "content": "x", "reasoning_content": "thinking"},
                "finish_reason": "stop"
            }]
        });

        let frames = relay.process(format!("data: {}\n\n", event).as_bytes());
        let chunk = parse_frame(&frames[0]);
        assert_eq!(chunk["choices"][0]["delta"]["reasoning_content"], "thinking");
        assert_eq!(chunk["choices"][0]["finish_reason"], "stop");
    }
}
