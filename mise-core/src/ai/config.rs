//! AI backend configuration from environment variables.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const OPENROUTER_DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unknown AI provider: {0}")]
    UnknownProvider(String),
}

/// Which structured-output backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    /// Google Gemini. Can watch public videos directly.
    Gemini,
    /// Any OpenAI-compatible chat model via OpenRouter. Text only.
    OpenRouter,
    /// Canned responses, no network.
    Fake,
}

impl AiProvider {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(AiProvider::Gemini),
            "openrouter" => Ok(AiProvider::OpenRouter),
            "fake" => Ok(AiProvider::Fake),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::Gemini => "gemini",
            AiProvider::OpenRouter => "openrouter",
            AiProvider::Fake => "fake",
        }
    }
}

/// AI backend configuration.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub provider: AiProvider,
    /// Empty for the fake provider.
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Send video URLs straight to the model instead of transcripts.
    /// Only honored by backends that can watch video.
    pub native_video: bool,
    /// Directory for caching responses. `None` disables the cache.
    pub cache_dir: Option<PathBuf>,
    /// If true, only use cache, error if not cached.
    pub offline: bool,
}

impl AiConfig {
    /// Load configuration from environment variables.
    ///
    /// - `MISE_AI_PROVIDER`: "gemini" | "openrouter" | "fake" (default: "gemini")
    /// - `GEMINI_API_KEY` / `OPENROUTER_API_KEY`: required for that provider
    /// - `MISE_AI_MODEL`: model name (provider default otherwise)
    /// - `MISE_AI_BASE_URL`: API base URL (provider default otherwise)
    /// - `MISE_AI_NATIVE_VIDEO`: "false" to force the transcript path (default: true)
    /// - `MISE_AI_CACHE_DIR`: cache directory, "none" disables (default: "~/.mise/ai-cache")
    /// - `MISE_AI_OFFLINE`: use cache only (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = AiProvider::parse(
            &env::var("MISE_AI_PROVIDER").unwrap_or_else(|_| "gemini".to_string()),
        )?;

        let (key_var, default_model, default_base_url) = match provider {
            AiProvider::Gemini => ("GEMINI_API_KEY", GEMINI_DEFAULT_MODEL, GEMINI_BASE_URL),
            AiProvider::OpenRouter => (
                "OPENROUTER_API_KEY",
                OPENROUTER_DEFAULT_MODEL,
                OPENROUTER_BASE_URL,
            ),
            AiProvider::Fake => ("", "fake-model", ""),
        };

        let api_key = if key_var.is_empty() {
            String::new()
        } else {
            env::var(key_var).map_err(|_| ConfigError::MissingEnvVar(key_var.to_string()))?
        };

        let model = env::var("MISE_AI_MODEL").unwrap_or_else(|_| default_model.to_string());
        let base_url =
            env::var("MISE_AI_BASE_URL").unwrap_or_else(|_| default_base_url.to_string());

        let native_video = env::var("MISE_AI_NATIVE_VIDEO")
            .map(|v| !matches!(v.as_str(), "false" | "0"))
            .unwrap_or(true);

        let cache_dir = match env::var("MISE_AI_CACHE_DIR") {
            Ok(v) if v == "none" || v.is_empty() => None,
            Ok(v) => Some(PathBuf::from(v)),
            Err(_) => Some(Self::default_cache_dir()),
        };

        let offline = env::var("MISE_AI_OFFLINE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            provider,
            api_key,
            model,
            base_url,
            native_video,
            cache_dir,
            offline,
        })
    }

    /// Get the default cache directory: ~/.mise/ai-cache
    pub fn default_cache_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".mise").join("ai-cache"))
            .unwrap_or_else(|| PathBuf::from("data/ai-cache"))
    }
}
