//! Translation between the inbound chat-completion dialect and the
//! upstream provider's dialect.
//!
//! Both sides are OpenAI-shaped, so translation is about normalization
//! rather than restructuring: model names are rewritten through the alias
//! table, optional sampling parameters are pinned to concrete defaults,
//! and responses are re-framed with synthesized identifiers while echoing
//! the caller's original model name back. Request and response translation
//! are pure (no I/O); the stream relay does no I/O either, it is driven by
//! whoever owns the network connection.

pub mod api_types;
pub mod request;
pub mod response;
pub mod streaming;
pub mod upstream_types;

pub use api_types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ErrorEnvelope, StreamChunk,
};
pub use request::chat_to_upstream;
pub use response::upstream_to_chat;
pub use streaming::{LineBuffer, RelayStats, StreamRelay};
pub use upstream_types::{UpstreamErrorBody, UpstreamRequest, UpstreamResponse};
