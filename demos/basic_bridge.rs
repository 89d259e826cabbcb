//! Start a chat-bridge server programmatically.
//!
//! Usage:
//!   export DEEPSEEK_API_KEY=sk-your-key
//!   cargo run --example basic_bridge

use chat_bridge::{build_router, proxy, AppState, BridgeConfig, SharedLogger};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = BridgeConfig::find_and_load(None)
        .unwrap_or_else(|_| BridgeConfig::for_upstream("deepseek"));
    let base_url = config.effective_base_url()?;

    println!("Upstream: {} ({})", config.upstream.name, base_url);
    println!("Models mapped: {}", config.models.len());

    let logger = SharedLogger::new("bridge-demo.log")?;
    let client = proxy::build_http_client()?;

    let port = config.port;
    let state = Arc::new(AppState {
        config,
        client,
        logger,
    });

    let app = build_router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("Listening on http://{}", addr);
    println!();
    println!("  OPENAI_BASE_URL=http://localhost:{}/v1", port);

    axum::serve(listener, app).await?;
    Ok(())
}
