use chat_bridge::config::discover_config_file;
use chat_bridge::providers::UpstreamPreset;
use chat_bridge::{build_router, proxy, AppState, BridgeConfig, SharedLogger};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "chat-bridge",
    about = "Chat-completion bridge — serve the OpenAI wire format against any compatible upstream",
    version
)]
struct Cli {
    /// Config file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Upstream preset name (overrides the config file)
    #[arg(long)]
    upstream: Option<String>,

    /// JSONL request-log path
    #[arg(long, default_value = "chat-bridge.log")]
    log_file: PathBuf,

    /// List the config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_bridge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        println!("  1. chat-bridge.toml (current directory)");
        if cfg!(target_os = "macos") {
            println!("  2. ~/Library/Application Support/chat-bridge/config.toml");
        } else {
            println!("  2. $XDG_CONFIG_HOME/chat-bridge/config.toml");
            println!("     ~/.config/chat-bridge/config.toml");
        }
        println!("  3. ~/.chat-bridge.toml");
        return Ok(());
    }

    let mut config = startup_config(cli.config.as_deref(), cli.upstream.as_deref())?;

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(ref name) = cli.upstream {
        config.upstream.name = name.clone();
        config.upstream.base_url = None;
        if let Some(preset) = UpstreamPreset::from_name(name) {
            config.upstream.api_key_env = preset.default_api_key_env.to_string();
        }
        // The previous upstream's credential does not carry over.
        config.upstream.api_key = None;
        config.resolve();
    }

    let logger = SharedLogger::new(&cli.log_file)?;

    let base_url = config.effective_base_url()?;
    if let Err(e) = config.require_api_key() {
        warn!("{}", e);
        warn!("Completion requests will fail until a credential is provided");
    }

    info!("╔═══════════════════════════════════════════╗");
    info!("║          chat-bridge v{}              ║", env!("CARGO_PKG_VERSION"));
    info!("╚═══════════════════════════════════════════╝");
    info!("  Upstream:       {}", config.upstream.name);
    info!("  Base URL:       {}", base_url);
    info!("  Port:           {}", config.port);
    info!("  Models:         {} mapped", config.models.len());
    info!("  Default model:  {}", config.default_model);
    info!("  Log file:       {}", cli.log_file.display());

    logger.info(
        "startup",
        format!(
            "Starting chat-bridge upstream={} base_url={} port={}",
            config.upstream.name, base_url, config.port
        ),
    );

    let client = proxy::build_http_client()?;

    let state = Arc::new(AppState {
        config: config.clone(),
        client,
        logger: logger.clone(),
    });

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);
    info!("");
    info!("  Point an OpenAI-style client at:");
    info!("    OPENAI_BASE_URL=http://localhost:{}/v1", config.port);
    info!("");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Config for this run. An explicit `--config` path must load and a
/// discovered file must parse; only when the search finds nothing at all
/// does a named `--upstream` start from its preset defaults.
fn startup_config(
    explicit: Option<&Path>,
    upstream: Option<&str>,
) -> chat_bridge::Result<BridgeConfig> {
    if explicit.is_none() && discover_config_file().is_none() {
        if let Some(name) = upstream {
            info!("No config file found, starting from the '{}' preset", name);
            return Ok(BridgeConfig::for_upstream(name));
        }
    }
    BridgeConfig::find_and_load(explicit)
}
