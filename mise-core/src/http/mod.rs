//! Outbound HTTP for the content sources.
//!
//! Every request the pipeline makes to the video platform or a blog origin
//! goes through the `HttpClient` trait so sources can be tested against
//! canned responses.

mod client;
mod rate_limiter;

pub use client::{HttpClient, MockClient, MockResponse, RequestProfile, WebClient, WebClientBuilder};
pub use rate_limiter::RateLimiter;

/// Host portion of a URL, used to key the rate limiter.
pub(crate) fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}
