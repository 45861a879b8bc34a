//! Fake extraction backend for testing.
//!
//! Responses are matched by substring against the request's input, so tests
//! can run without network access or API costs.

use async_trait::async_trait;
use std::sync::RwLock;

use super::types::{BackendResponse, ExtractionInput, StructuredRequest, Usage};
use super::{AiError, ExtractionBackend};

/// Response served by `FakeBackend::with_sample_recipe`.
pub const SAMPLE_RECIPE_JSON: &str = r#"{
    "title": "Garlic Butter Pasta",
    "description": "Quick weeknight pasta.",
    "servings": 2,
    "prepTimeMinutes": 5,
    "cookTimeMinutes": 15,
    "ingredients": [
        {"name": "spaghetti", "quantity": "200", "unit": "g"},
        {"name": "butter", "quantity": "3", "unit": "tablespoons"},
        {"name": "garlic", "quantity": "4", "unit": "cloves", "notes": "minced"}
    ],
    "steps": [
        {"stepNumber": 1, "instruction": "Boil the spaghetti in salted water."},
        {"stepNumber": 2, "instruction": "Melt butter and cook garlic until fragrant."},
        {"stepNumber": 3, "instruction": "Toss pasta with garlic butter."}
    ]
}"#;

/// A fake structured-output backend.
#[derive(Debug, Default)]
pub struct FakeBackend {
    /// (input substring, response), checked in insertion order.
    responses: Vec<(String, Result<String, String>)>,
    /// Default response if no match found
    default_response: Option<String>,
    native_video: bool,
    requests: RwLock<Vec<(String, StructuredRequest)>>,
}

impl FakeBackend {
    /// Create a new FakeBackend with no registered responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that answers every request with `SAMPLE_RECIPE_JSON`.
    pub fn with_sample_recipe() -> Self {
        Self::new().with_default_response(SAMPLE_RECIPE_JSON)
    }

    /// Respond with `response` when the input contains `input_contains`.
    pub fn with_response(mut self, input_contains: &str, response: &str) -> Self {
        self.responses
            .push((input_contains.to_string(), Ok(response.to_string())));
        self
    }

    /// Fail with a request error when the input contains `input_contains`.
    pub fn with_failure(mut self, input_contains: &str, message: &str) -> Self {
        self.responses
            .push((input_contains.to_string(), Err(message.to_string())));
        self
    }

    /// Set the default response when no pattern matches.
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Claim the ability to watch videos directly.
    pub fn with_native_video(mut self) -> Self {
        self.native_video = true;
        self
    }

    /// Every request served so far, with its prompt name.
    pub fn requests(&self) -> Vec<(String, StructuredRequest)> {
        self.requests
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ExtractionBackend for FakeBackend {
    async fn generate(
        &self,
        prompt_name: &str,
        request: &StructuredRequest,
    ) -> Result<BackendResponse, AiError> {
        self.requests
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((prompt_name.to_string(), request.clone()));

        let haystack = match &request.input {
            ExtractionInput::Text { content } => content,
            ExtractionInput::NativeVideo { video_url } => video_url,
        }
        .to_lowercase();

        let matched = self
            .responses
            .iter()
            .find(|(pattern, _)| haystack.contains(&pattern.to_lowercase()))
            .map(|(_, response)| response.clone());

        let content = match (matched, &self.default_response) {
            (Some(Ok(response)), _) => response,
            (Some(Err(message)), _) => return Err(AiError::RequestFailed(message)),
            (None, Some(response)) => response.clone(),
            (None, None) => {
                return Err(AiError::RequestFailed(format!(
                    "FakeBackend: No response configured for input (first 100 chars): {}",
                    haystack.chars().take(100).collect::<String>()
                )))
            }
        };

        Ok(BackendResponse {
            content,
            usage: Usage::default(),
            cached: false,
        })
    }

    fn supports_native_video(&self) -> bool {
        self.native_video
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
