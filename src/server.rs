use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::logging::SharedLogger;
use crate::proxy;
use crate::translate::api_types::{ChatCompletionRequest, ErrorEnvelope};

use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Fixed `created` value for the model catalog; the listing must be stable
/// across calls.
const CATALOG_CREATED: u64 = 1_677_610_602;

#[derive(Clone)]
pub struct AppState {
    pub config: BridgeConfig,
    pub client: reqwest::Client,
    pub logger: SharedLogger,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/v1/chat/completions", post(handle_chat_completions))
        .route("/health", get(handle_health))
        .route("/v1/models", get(handle_models))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

async fn handle_chat_completions(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            state
                .logger
                .error("server", format!("Failed to parse request: {}", e));
            let envelope = ErrorEnvelope::invalid_request(format!("Invalid request body: {}", e));
            return (StatusCode::BAD_REQUEST, Json(envelope)).into_response();
        }
    };

    let is_streaming = req.stream.unwrap_or(false);

    state.logger.info(
        "server",
        format!(
            "Completion request: model={} stream={} messages={}",
            req.model,
            is_streaming,
            req.messages.len()
        ),
    );

    if is_streaming {
        handle_streaming(state, &req).await
    } else {
        handle_non_streaming(state, &req).await
    }
}

async fn handle_non_streaming(state: Arc<AppState>, req: &ChatCompletionRequest) -> Response {
    match proxy::proxy_non_streaming(req, &state.config, &state.client, &state.logger).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => {
            state
                .logger
                .error("server", format!("Completion failed: {}", e));
            error_response(&e)
        }
    }
}

async fn handle_streaming(state: Arc<AppState>, req: &ChatCompletionRequest) -> Response {
    let frame_stream =
        match proxy::proxy_streaming(req, &state.config, &state.client, &state.logger).await {
            Ok(s) => s,
            Err(e) => {
                state
                    .logger
                    .error("server", format!("Streaming setup failed: {}", e));
                // The stream never opened; answer with a plain error body.
                return error_response(&e);
            }
        };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Cache-Control", "no-cache")
        .header("Connection", "keep-alive")
        .body(Body::from_stream(frame_stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn handle_models(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mut ids: Vec<&String> = state.config.models.keys().collect();
    ids.sort();

    let models: Vec<serde_json::Value> = ids
        .into_iter()
        .map(|id| {
            serde_json::json!({
                "id": id,
                "object": "model",
                "created": CATALOG_CREATED,
                "owned_by": state.config.upstream.name,
                "permission": [],
                "root": id,
                "parent": null,
            })
        })
        .collect();

    Json(serde_json::json!({ "object": "list", "data": models }))
}

fn error_response(err: &BridgeError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err.envelope())).into_response()
}

/// Last-resort fault barrier: a panicking handler still answers with the
/// standard error envelope instead of tearing down the connection.
fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(%detail, "request handler panicked");

    let body = serde_json::to_string(&ErrorEnvelope::internal("Internal server error"))
        .unwrap_or_else(|_| {
            r#"{"error":{"message":"Internal server error","type":"internal_error"}}"#.to_string()
        });

    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
