//! Disk-based response cache, and a backend wrapper that uses it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;

use super::types::{BackendResponse, StructuredRequest, Usage};
use super::{AiError, ExtractionBackend};
use crate::extract::is_usable_response;

/// Disk-based AI response cache.
#[derive(Debug)]
pub struct AiCache {
    cache_dir: PathBuf,
}

/// A cached response with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedAiResponse {
    pub content: String,
    pub usage: Usage,
    pub cached_at: DateTime<Utc>,
    pub model: String,
}

impl From<CachedAiResponse> for BackendResponse {
    fn from(cached: CachedAiResponse) -> Self {
        Self {
            content: cached.content,
            usage: cached.usage,
            cached: true,
        }
    }
}

/// Cache key components.
#[derive(Debug, Clone)]
pub struct CacheKey {
    pub prompt_name: String,
    pub provider: String,
    pub model: String,
    pub input_hash: String,
}

impl CacheKey {
    /// Key on everything that reaches the model: instructions, input and schema.
    pub fn new(prompt_name: &str, provider: &str, model: &str, request: &StructuredRequest) -> Self {
        let input_json = serde_json::to_string(request).unwrap_or_default();
        let input_hash = sha256_hex(&input_json);

        Self {
            prompt_name: prompt_name.to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            input_hash,
        }
    }

    /// Convert to a filesystem path relative to the cache directory.
    ///
    /// Format: {prompt_name}/{provider}/{model_safe}/{hash[0:2]}/{hash}.json
    pub fn to_path(&self) -> PathBuf {
        // "openai/gpt-4o-mini" -> "openai--gpt-4o-mini"
        let model_safe = self.model.replace('/', "--").replace(':', "_");

        PathBuf::new()
            .join(&self.prompt_name)
            .join(&self.provider)
            .join(&model_safe)
            .join(&self.input_hash[..2])
            .join(format!("{}.json", &self.input_hash))
    }
}

impl AiCache {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Get a cached response if it exists.
    pub fn get(&self, key: &CacheKey) -> Option<CachedAiResponse> {
        let path = self.cache_dir.join(key.to_path());

        if path.exists() {
            let content = fs::read_to_string(&path).ok()?;
            serde_json::from_str(&content).ok()
        } else {
            None
        }
    }

    /// Store a response in the cache.
    pub fn put(&self, key: &CacheKey, response: &BackendResponse) -> std::io::Result<()> {
        let path = self.cache_dir.join(key.to_path());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let cached = CachedAiResponse {
            content: response.content.clone(),
            usage: response.usage.clone(),
            cached_at: Utc::now(),
            model: key.model.clone(),
        };

        let json = serde_json::to_string_pretty(&cached)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(&path, json)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();

        if !self.cache_dir.exists() {
            return stats;
        }

        fn count_json_files(dir: &std::path::Path, count: &mut usize) {
            if let Ok(entries) = fs::read_dir(dir) {
                for entry in entries.filter_map(|e| e.ok()) {
                    let path = entry.path();
                    if path.is_dir() {
                        count_json_files(&path, count);
                    } else if path.extension().is_some_and(|ext| ext == "json") {
                        *count += 1;
                    }
                }
            }
        }

        count_json_files(&self.cache_dir, &mut stats.cached_responses);
        stats
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub cached_responses: usize,
}

/// Compute SHA256 hash and return as hex string.
fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Serves repeated requests from disk.
///
/// Only responses that parse into a recipe are written, so a bad reply is
/// asked for again on the next call instead of being replayed.
#[derive(Debug)]
pub struct CachingBackend {
    inner: Box<dyn ExtractionBackend>,
    cache: AiCache,
    offline: bool,
}

impl CachingBackend {
    pub fn new(inner: Box<dyn ExtractionBackend>, cache_dir: PathBuf) -> Self {
        Self {
            inner,
            cache: AiCache::new(cache_dir),
            offline: false,
        }
    }

    /// Never call the inner backend; a cache miss is an error.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[async_trait]
impl ExtractionBackend for CachingBackend {
    async fn generate(
        &self,
        prompt_name: &str,
        request: &StructuredRequest,
    ) -> Result<BackendResponse, AiError> {
        let key = CacheKey::new(
            prompt_name,
            self.inner.provider_name(),
            self.inner.model_name(),
            request,
        );

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(prompt_name, hash = %key.input_hash, "AI response found in cache");
            return Ok(cached.into());
        }

        if self.offline {
            return Err(AiError::OfflineNotCached);
        }

        tracing::debug!(prompt_name, hash = %key.input_hash, "AI cache miss, calling backend");
        let response = self.inner.generate(prompt_name, request).await?;

        if !is_usable_response(&response.content) {
            tracing::warn!(prompt_name, hash = %key.input_hash, "AI response unusable, not caching");
        } else if let Err(e) = self.cache.put(&key, &response) {
            tracing::warn!(error = %e, "Failed to cache AI response");
        }

        Ok(response)
    }

    fn supports_native_video(&self) -> bool {
        self.inner.supports_native_video()
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
