//! Structured-output AI backends.
//!
//! This module provides:
//! - `ExtractionBackend` trait: one schema-constrained call, text or video in
//! - `GeminiBackend` (text and native video) and `OpenRouterBackend` (text)
//! - `CachingBackend` with disk-based caching, and `FakeBackend` for tests
//! - Prompt templates and the recipe response schema
//!
//! # Configuration
//!
//! See `AiConfig::from_env` for the environment variables.

mod cache;
mod config;
mod fake;
mod gemini;
mod openrouter;
pub mod prompts;
mod types;

pub use cache::{AiCache, CacheKey, CacheStats, CachedAiResponse, CachingBackend};
pub use config::{AiConfig, AiProvider, ConfigError};
pub use fake::{FakeBackend, SAMPLE_RECIPE_JSON};
pub use gemini::GeminiBackend;
pub use openrouter::OpenRouterBackend;
pub use types::{BackendResponse, ExtractionInput, StructuredRequest, Usage};

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Unsupported input: {0}")]
    Unsupported(String),

    #[error("Response not in cache and offline mode is enabled")]
    OfflineNotCached,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// A generative backend that returns JSON constrained to a schema.
///
/// Implementations make exactly one call per `generate` and never retry.
#[async_trait]
pub trait ExtractionBackend: Send + Sync + fmt::Debug {
    /// Run one structured-output request. `prompt_name` labels logs and cache entries.
    async fn generate(
        &self,
        prompt_name: &str,
        request: &StructuredRequest,
    ) -> Result<BackendResponse, AiError>;

    /// Whether `ExtractionInput::NativeVideo` is accepted.
    fn supports_native_video(&self) -> bool {
        false
    }

    /// Get the provider name (e.g., "gemini", "openrouter", "fake").
    fn provider_name(&self) -> &'static str;

    fn model_name(&self) -> &str;
}

/// Build the configured backend, wrapped in the response cache unless disabled.
///
/// With `native_video` turned off, a video-capable backend is still used but
/// the pipeline sees it as text-only.
pub fn create_backend(config: &AiConfig) -> Box<dyn ExtractionBackend> {
    let inner: Box<dyn ExtractionBackend> = match config.provider {
        AiProvider::Gemini => Box::new(GeminiBackend::new(
            config.api_key.clone(),
            config.model.clone(),
            config.base_url.clone(),
        )),
        AiProvider::OpenRouter => Box::new(OpenRouterBackend::new(
            &config.api_key,
            config.model.clone(),
            &config.base_url,
        )),
        AiProvider::Fake => Box::new(FakeBackend::with_sample_recipe()),
    };

    let inner: Box<dyn ExtractionBackend> = if config.native_video {
        inner
    } else {
        Box::new(TextOnly(inner))
    };

    match &config.cache_dir {
        Some(dir) => {
            tracing::debug!(cache_dir = %dir.display(), "AI response cache enabled");
            Box::new(CachingBackend::new(inner, dir.clone()).offline(config.offline))
        }
        None => inner,
    }
}

/// Build the backend described by the environment.
pub fn create_backend_from_env() -> Result<Box<dyn ExtractionBackend>, AiError> {
    let config = AiConfig::from_env()?;
    tracing::info!(
        provider = config.provider.as_str(),
        model = %config.model,
        native_video = config.native_video,
        "AI backend configured"
    );
    Ok(create_backend(&config))
}

/// Hides native video support so the transcript path is always taken.
#[derive(Debug)]
struct TextOnly(Box<dyn ExtractionBackend>);

#[async_trait]
impl ExtractionBackend for TextOnly {
    async fn generate(
        &self,
        prompt_name: &str,
        request: &StructuredRequest,
    ) -> Result<BackendResponse, AiError> {
        self.0.generate(prompt_name, request).await
    }

    fn provider_name(&self) -> &'static str {
        self.0.provider_name()
    }

    fn model_name(&self) -> &str {
        self.0.model_name()
    }
}
