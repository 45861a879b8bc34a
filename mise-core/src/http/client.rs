//! HTTP client trait and implementations.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::FetchError;

use super::rate_limiter::RateLimiter;

/// Browser-like agent; the watch page only embeds the player response for browsers.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Descriptive agent for blog origins.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; MiseRecipeBot/1.0; +https://mise.recipes/bot)";

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml";

/// How a request should present itself to the remote server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestProfile {
    /// Browser User-Agent, English content. Used for the video watch page and caption tracks.
    Browser,
    /// Descriptive User-Agent with an HTML `Accept` header. Used for blog pages.
    Page,
    /// JSON API endpoint.
    Api,
}

/// Trait for HTTP clients, enabling mockability in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET a URL and return the body as text. Non-2xx responses are errors.
    async fn get_text(&self, url: &str, profile: RequestProfile) -> Result<String, FetchError>;
}

/// Configuration for `WebClient`.
#[derive(Clone)]
pub struct WebClientBuilder {
    rate_limit_ms: u64,
    timeout: Duration,
    user_agent: String,
}

impl Default for WebClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WebClientBuilder {
    /// Create a new builder with default settings.
    ///
    /// Environment variables:
    /// - `MISE_HTTP_RATE_LIMIT_MS`: delay between requests to the same host (default 200, 0 disables)
    /// - `MISE_HTTP_TIMEOUT_SECS`: request timeout (default 30)
    pub fn new() -> Self {
        let rate_limit_ms = std::env::var("MISE_HTTP_RATE_LIMIT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(200);

        let timeout_secs = std::env::var("MISE_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Self {
            rate_limit_ms,
            timeout: Duration::from_secs(timeout_secs),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Set the rate limit delay in milliseconds. 0 disables rate limiting.
    pub fn rate_limit_ms(mut self, ms: u64) -> Self {
        self.rate_limit_ms = ms;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the descriptive user agent sent to blog origins.
    pub fn user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn build(self) -> Result<WebClient, reqwest::Error> {
        let inner = reqwest::Client::builder().timeout(self.timeout).build()?;

        Ok(WebClient {
            inner: Arc::new(inner),
            rate_limiter: RateLimiter::new(Duration::from_millis(self.rate_limit_ms)),
            user_agent: self.user_agent,
        })
    }
}

/// Production HTTP client with per-host rate limiting.
pub struct WebClient {
    /// Shared reqwest client for connection pooling.
    inner: Arc<reqwest::Client>,
    rate_limiter: RateLimiter,
    user_agent: String,
}

impl WebClient {
    pub fn builder() -> WebClientBuilder {
        WebClientBuilder::new()
    }
}

#[async_trait]
impl HttpClient for WebClient {
    async fn get_text(&self, url: &str, profile: RequestProfile) -> Result<String, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        if let Some(host) = super::host_of(url) {
            self.rate_limiter.wait(&host).await;
        }

        let request = match profile {
            RequestProfile::Browser => self
                .inner
                .get(parsed)
                .header(USER_AGENT, BROWSER_USER_AGENT)
                .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9"),
            RequestProfile::Page => self
                .inner
                .get(parsed)
                .header(USER_AGENT, &self.user_agent)
                .header(ACCEPT, HTML_ACCEPT),
            RequestProfile::Api => self
                .inner
                .get(parsed)
                .header(USER_AGENT, &self.user_agent)
                .header(ACCEPT, "application/json"),
        };

        tracing::debug!(url, ?profile, "network: fetching");
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url, status = %status, "network: request failed");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        tracing::debug!(url, status = %status, "network: fetched successfully");
        Ok(response.text().await?)
    }
}

/// Mock response for testing.
#[derive(Clone)]
pub enum MockResponse {
    Text(String),
    Status(u16),
    Error(String),
}

/// Mock HTTP client for testing. Records every request it serves.
#[derive(Default)]
pub struct MockClient {
    responses: HashMap<String, MockResponse>,
    requests: Mutex<Vec<(String, RequestProfile)>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: &str, response: MockResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    pub fn with_text(self, url: &str, body: &str) -> Self {
        self.with_response(url, MockResponse::Text(body.to_string()))
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.with_response(url, MockResponse::Status(status))
    }

    pub fn with_error(self, url: &str, error: &str) -> Self {
        self.with_response(url, MockResponse::Error(error.to_string()))
    }

    /// URLs requested so far, with the profile each was requested under.
    pub fn requests(&self) -> Vec<(String, RequestProfile)> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn get_text(&self, url: &str, profile: RequestProfile) -> Result<String, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((url.to_string(), profile));

        match self.responses.get(url) {
            Some(MockResponse::Text(body)) => Ok(body.clone()),
            Some(MockResponse::Status(status)) => Err(FetchError::Status {
                status: *status,
                url: url.to_string(),
            }),
            Some(MockResponse::Error(e)) => Err(FetchError::Mock(e.clone())),
            None => Err(FetchError::Mock(format!("No mock response for URL: {}", url))),
        }
    }
}
