//! Built-in presets for common OpenAI-compatible upstreams.
//!
//! Each preset defines the base URL and the default environment variable for
//! the API key, so a config only needs to name the upstream.

#[derive(Debug, Clone)]
pub struct UpstreamPreset {
    pub name: &'static str,
    pub base_url: &'static str,
    pub default_api_key_env: &'static str,
}

const PRESETS: &[UpstreamPreset] = &[
    UpstreamPreset {
        name: "deepseek",
        base_url: "https://api.deepseek.com/v1",
        default_api_key_env: "DEEPSEEK_API_KEY",
    },
    UpstreamPreset {
        name: "openai",
        base_url: "https://api.openai.com/v1",
        default_api_key_env: "OPENAI_API_KEY",
    },
    UpstreamPreset {
        name: "openrouter",
        base_url: "https://openrouter.ai/api/v1",
        default_api_key_env: "OPENROUTER_API_KEY",
    },
    UpstreamPreset {
        name: "fireworks",
        base_url: "https://api.fireworks.ai/inference/v1",
        default_api_key_env: "FIREWORKS_API_KEY",
    },
    UpstreamPreset {
        name: "grok",
        base_url: "https://api.x.ai/v1",
        default_api_key_env: "XAI_API_KEY",
    },
    UpstreamPreset {
        name: "together",
        base_url: "https://api.together.xyz/v1",
        default_api_key_env: "TOGETHER_API_KEY",
    },
    UpstreamPreset {
        name: "groq",
        base_url: "https://api.groq.com/openai/v1",
        default_api_key_env: "GROQ_API_KEY",
    },
];

impl UpstreamPreset {
    #[must_use]
    pub fn from_name(name: &str) -> Option<&'static UpstreamPreset> {
        PRESETS.iter().find(|p| p.name == name.to_lowercase())
    }

    #[must_use]
    pub fn all() -> &'static [UpstreamPreset] {
        PRESETS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_upstreams() {
        assert!(UpstreamPreset::from_name("deepseek").is_some());
        assert!(UpstreamPreset::from_name("fireworks").is_some());
        assert!(UpstreamPreset::from_name("OpenRouter").is_some()); // case-insensitive
        assert!(UpstreamPreset::from_name("unknown_upstream").is_none());
    }

    #[test]
    fn test_presets_carry_versioned_base_urls() {
        for preset in UpstreamPreset::all() {
            assert!(
                preset.base_url.starts_with("https://"),
                "Upstream {} should have an https base URL",
                preset.name
            );
            assert!(!preset.default_api_key_env.is_empty());
        }
    }
}
