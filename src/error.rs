//! Error types for the bridge.
//!
//! Every failure path surfaces to the caller as the same JSON envelope
//! (`{"error": {"message", "type", "code"?}}`); [`BridgeError::envelope`]
//! and [`BridgeError::http_status`] define that mapping in one place so
//! handlers never assemble error bodies by hand.

use thiserror::Error;

use crate::translate::api_types::ErrorEnvelope;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    /// No upstream credential configured. Detected before any network call;
    /// the request never leaves the process.
    #[error("No API key configured for upstream '{upstream}': set it in the config file or the {env_var} environment variable")]
    MissingApiKey { upstream: String, env_var: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The upstream answered with a non-success status. Status and message
    /// are mirrored back to the caller.
    #[error("Upstream returned {status}: {message}")]
    Upstream {
        status: u16,
        message: String,
        error_type: Option<String>,
        code: Option<String>,
    },

    #[error("Could not reach upstream: {message}")]
    Connection { message: String },

    /// The upstream answered 2xx but the body did not translate, e.g. an
    /// empty choice list or a non-JSON payload.
    #[error("Translation error: {message}")]
    Translation { message: String },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl BridgeError {
    pub fn missing_api_key(upstream: impl Into<String>, env_var: impl Into<String>) -> Self {
        Self::MissingApiKey {
            upstream: upstream.into(),
            env_var: env_var.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn upstream(
        status: u16,
        message: impl Into<String>,
        error_type: Option<String>,
        code: Option<String>,
    ) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
            error_type,
            code,
        }
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection {
            message: msg.into(),
        }
    }

    pub fn translation(msg: impl Into<String>) -> Self {
        Self::Translation {
            message: msg.into(),
        }
    }

    /// Status to answer with: the upstream's own status when we have one,
    /// 500 for everything that failed on our side of the wire.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Upstream { status, .. } => *status,
            _ => 500,
        }
    }

    /// The JSON body paired with [`http_status`](Self::http_status).
    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            Self::MissingApiKey { .. } => {
                ErrorEnvelope::with_code("config_error", self.to_string(), "missing_api_key")
            }
            Self::Config { message } => ErrorEnvelope::new("config_error", message.clone()),
            Self::Upstream {
                message,
                error_type,
                code,
                ..
            } => {
                let kind = error_type.as_deref().unwrap_or("api_error");
                match code {
                    Some(code) => ErrorEnvelope::with_code(kind, message.clone(), code),
                    None => ErrorEnvelope::new(kind, message.clone()),
                }
            }
            Self::Connection { message } => {
                ErrorEnvelope::new("connection_error", message.clone())
            }
            Self::Translation { message } => {
                ErrorEnvelope::new("translation_error", message.clone())
            }
            Self::Toml(_) => ErrorEnvelope::new("internal_error", self.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_envelope_carries_code() {
        let err = BridgeError::missing_api_key("deepseek", "DEEPSEEK_API_KEY");
        assert_eq!(err.http_status(), 500);

        let env = err.envelope();
        assert_eq!(env.error.error_type, "config_error");
        assert_eq!(env.error.code.as_deref(), Some("missing_api_key"));
        assert!(env.error.message.contains("DEEPSEEK_API_KEY"));
    }

    #[test]
    fn test_upstream_error_mirrors_status_and_type() {
        let err = BridgeError::upstream(
            429,
            "rate limited",
            Some("rate_limit_error".to_string()),
            Some("429".to_string()),
        );
        assert_eq!(err.http_status(), 429);

        let env = err.envelope();
        assert_eq!(env.error.message, "rate limited");
        assert_eq!(env.error.error_type, "rate_limit_error");
        assert_eq!(env.error.code.as_deref(), Some("429"));
    }

    #[test]
    fn test_upstream_error_without_type_defaults_to_api_error() {
        let err = BridgeError::upstream(502, "bad gateway", None, None);
        let env = err.envelope();
        assert_eq!(env.error.error_type, "api_error");
        assert_eq!(env.error.code, None);
    }

    #[test]
    fn test_connection_and_translation_are_distinct_categories() {
        let conn = BridgeError::connection("dns failure").envelope();
        let trans = BridgeError::translation("no choices").envelope();
        assert_eq!(conn.error.error_type, "connection_error");
        assert_eq!(trans.error.error_type, "translation_error");
    }

    #[test]
    fn test_config_parse_failure_maps_to_internal_error() {
        let parse_err = toml::from_str::<toml::Value>("[unclosed").unwrap_err();
        let err = BridgeError::from(parse_err);
        assert_eq!(err.http_status(), 500);
        assert_eq!(err.envelope().error.error_type, "internal_error");
    }
}
