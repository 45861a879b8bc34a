//! Structured-output request and response types.

use serde::{Deserialize, Serialize};

/// What the backend is asked to look at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionInput {
    /// Prompt text: transcript lines or a blog content block.
    Text { content: String },
    /// A public video URL the backend fetches and watches itself.
    NativeVideo { video_url: String },
}

/// One structured-output call: instructions, input and the JSON Schema the
/// response must satisfy.
#[derive(Debug, Clone, Serialize)]
pub struct StructuredRequest {
    pub instructions: String,
    pub input: ExtractionInput,
    /// JSON Schema; nullable fields use `"type": [T, "null"]`.
    pub schema: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Raw backend output. `content` should be JSON matching the request schema,
/// but nothing has checked that yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendResponse {
    pub content: String,
    pub usage: Usage,
    /// Whether this response came from cache.
    #[serde(default)]
    pub cached: bool,
}
