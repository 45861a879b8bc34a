//! OpenRouter backend (OpenAI-compatible API) with JSON-schema response format.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
        ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;

use super::types::{BackendResponse, ExtractionInput, StructuredRequest, Usage};
use super::{AiError, ExtractionBackend};

/// Text-only structured-output backend.
pub struct OpenRouterBackend {
    client: Client<OpenAIConfig>,
    model: String,
}

impl std::fmt::Debug for OpenRouterBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterBackend")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenRouterBackend {
    pub fn new(api_key: &str, model: String, base_url: &str) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);

        Self {
            client: Client::with_config(openai_config),
            model,
        }
    }

    fn build_messages(
        request: &StructuredRequest,
    ) -> Result<Vec<ChatCompletionRequestMessage>, AiError> {
        let ExtractionInput::Text { content } = &request.input else {
            return Err(AiError::Unsupported(
                "native video input requires a video-capable backend".to_string(),
            ));
        };

        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(request.instructions.clone())
            .build()
            .map(Into::into)
            .map_err(|e| AiError::RequestFailed(format!("Failed to build system message: {}", e)))?;

        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(content.clone())
            .build()
            .map(Into::into)
            .map_err(|e| AiError::RequestFailed(format!("Failed to build user message: {}", e)))?;

        Ok(vec![system, user])
    }
}

#[async_trait]
impl ExtractionBackend for OpenRouterBackend {
    async fn generate(
        &self,
        prompt_name: &str,
        request: &StructuredRequest,
    ) -> Result<BackendResponse, AiError> {
        let messages = Self::build_messages(request)?;

        let mut req_builder = CreateChatCompletionRequestArgs::default();
        req_builder
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    name: prompt_name.to_string(),
                    description: None,
                    schema: Some(request.schema.clone()),
                    strict: Some(false),
                },
            });

        if let Some(temperature) = request.temperature {
            req_builder.temperature(temperature);
        }

        let openai_request = req_builder
            .build()
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        tracing::debug!(prompt_name, model = %self.model, "Calling OpenRouter API");

        let response = self
            .client
            .chat()
            .create(openai_request)
            .await
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(AiError::ParseError("Empty response content".to_string()));
        }

        let usage = response
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(BackendResponse {
            content,
            usage,
            cached: false,
        })
    }

    fn provider_name(&self) -> &'static str {
        "openrouter"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
