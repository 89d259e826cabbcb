use crate::error::{BridgeError, Result};
use crate::providers::UpstreamPreset;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    pub upstream: UpstreamConfig,
    /// Inbound model id → upstream model id.
    #[serde(default = "default_models")]
    pub models: HashMap<String, String>,
    /// Upstream model used when the inbound id matches no alias.
    #[serde(default = "default_model")]
    pub default_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Bearer credential. Usually absent from the file and filled from
    /// `api_key_env` when the config is loaded; request handlers only ever
    /// see this field, never the process environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_port() -> u16 {
    8787
}

fn default_api_key_env() -> String {
    "UPSTREAM_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_models() -> HashMap<String, String> {
    [
        ("gpt-3.5-turbo", "deepseek-chat"),
        ("gpt-4", "deepseek-reasoner"),
        ("gpt-4o", "deepseek-chat"),
        ("gpt-4-turbo", "deepseek-reasoner"),
    ]
    .into_iter()
    .map(|(inbound, upstream)| (inbound.to_string(), upstream.to_string()))
    .collect()
}

impl BridgeConfig {
    /// Load config from a TOML file and resolve load-time values.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut config: Self = toml::from_str(&content)?;
        config.resolve();
        Ok(config)
    }

    /// Load from an explicit path, or search the standard locations
    /// (working directory, then platform config dir, then home).
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        match discover_config_file() {
            Some(found) => {
                tracing::info!(path = %found.display(), "Loading config");
                Self::load(&found)
            }
            None => {
                let searched: Vec<String> = config_search_paths()
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                Err(BridgeError::config(format!(
                    "No config file found. Searched: {}. Create one from config.example.toml",
                    searched.join(", ")
                )))
            }
        }
    }

    /// Minimal config for a named upstream with everything else defaulted,
    /// used when no config file exists but `--upstream` names a preset.
    pub fn for_upstream(name: &str) -> Self {
        let api_key_env = UpstreamPreset::from_name(name)
            .map(|p| p.default_api_key_env.to_string())
            .unwrap_or_else(default_api_key_env);

        let mut config = Self {
            port: default_port(),
            upstream: UpstreamConfig {
                name: name.to_string(),
                base_url: None,
                api_key_env,
                api_key: None,
                request_timeout_secs: default_request_timeout_secs(),
            },
            models: default_models(),
            default_model: default_model(),
        };
        config.resolve();
        config
    }

    /// Fill in everything resolved once at load time: the bearer credential
    /// (explicit config value wins, else the named environment variable) and
    /// the alias table (an explicitly empty `[models]` section falls back to
    /// the built-in table, so the model catalog is never empty).
    pub fn resolve(&mut self) {
        if self.upstream.api_key.is_none() {
            self.upstream.api_key = std::env::var(&self.upstream.api_key_env).ok();
        }
        if self.models.is_empty() {
            self.models = default_models();
        }
    }

    /// Resolve the effective base URL (config override or upstream preset default)
    pub fn effective_base_url(&self) -> Result<String> {
        if let Some(ref url) = self.upstream.base_url {
            return Ok(url.clone());
        }

        let preset = UpstreamPreset::from_name(&self.upstream.name).ok_or_else(|| {
            BridgeError::config(format!(
                "Unknown upstream '{}' and no base_url configured. \
                 Known upstreams: deepseek, openai, openrouter, fireworks, together, groq, grok",
                self.upstream.name
            ))
        })?;

        Ok(preset.base_url.to_string())
    }

    /// The bearer credential, or the missing-credential error the completions
    /// endpoint reports before any network call.
    pub fn require_api_key(&self) -> Result<&str> {
        self.upstream.api_key.as_deref().ok_or_else(|| {
            BridgeError::missing_api_key(&self.upstream.name, &self.upstream.api_key_env)
        })
    }

    /// Bound on the outbound non-streaming call.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.request_timeout_secs)
    }
}

/// First existing file among the search locations, or `None` when no
/// config file exists anywhere. Lets callers distinguish "nothing to
/// load" from "a file exists but will not load".
pub fn discover_config_file() -> Option<PathBuf> {
    config_search_paths().into_iter().find(|p| p.exists())
}

/// Candidate config locations, highest priority first: working directory,
/// platform config dir, home-directory dotfile.
fn config_search_paths() -> Vec<PathBuf> {
    let home = home_dir();
    let mut paths = vec![PathBuf::from("chat-bridge.toml")];

    if cfg!(target_os = "macos") {
        if let Some(ref home) = home {
            paths.push(home.join("Library/Application Support/chat-bridge/config.toml"));
        }
    } else {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("chat-bridge/config.toml"));
        }
        if let Some(ref home) = home {
            paths.push(home.join(".config/chat-bridge/config.toml"));
        }
    }

    if let Some(home) = home {
        paths.push(home.join(".chat-bridge.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
