//! Google Gemini structured-output backend.
//!
//! Talks to `models/{model}:generateContent` directly. Gemini accepts a
//! public video URL as `fileData`, which is what makes the native video path
//! possible.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::types::{BackendResponse, ExtractionInput, StructuredRequest, Usage};
use super::{AiError, ExtractionBackend};

/// Gemini API backend.
#[derive(Debug)]
pub struct GeminiBackend {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part {
    #[serde(rename = "text")]
    Text(String),
    FileData(FileData),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    file_uri: String,
    mime_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiApiError,
}

#[derive(Debug, Deserialize)]
struct GeminiApiError {
    message: String,
}

/// Convert a JSON Schema into Gemini's OpenAPI-subset schema: `["T", "null"]`
/// becomes `T` plus `nullable: true`, and keywords Gemini rejects are dropped.
pub(crate) fn to_gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(obj) => {
            let mut out = Map::new();
            for (key, value) in obj {
                match key.as_str() {
                    "additionalProperties" | "$schema" => {}
                    "type" => match value {
                        Value::Array(types) => {
                            if let Some(t) = types.iter().find(|t| *t != "null") {
                                out.insert("type".to_string(), t.clone());
                            }
                            if types.iter().any(|t| t == "null") {
                                out.insert("nullable".to_string(), Value::Bool(true));
                            }
                        }
                        other => {
                            out.insert("type".to_string(), other.clone());
                        }
                    },
                    "properties" => {
                        let props = value
                            .as_object()
                            .map(|props| {
                                props
                                    .iter()
                                    .map(|(name, prop)| (name.clone(), to_gemini_schema(prop)))
                                    .collect::<Map<_, _>>()
                            })
                            .unwrap_or_default();
                        out.insert(key.clone(), Value::Object(props));
                    }
                    "items" => {
                        out.insert(key.clone(), to_gemini_schema(value));
                    }
                    _ => {
                        out.insert(key.clone(), value.clone());
                    }
                }
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn build_request(request: &StructuredRequest) -> GenerateRequest {
    let parts = match &request.input {
        ExtractionInput::Text { content } => vec![Part::Text(content.clone())],
        ExtractionInput::NativeVideo { video_url } => vec![
            Part::FileData(FileData {
                file_uri: video_url.clone(),
                mime_type: "video/*",
            }),
            Part::Text("Extract the recipe from this video.".to_string()),
        ],
    };

    GenerateRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part::Text(request.instructions.clone())],
        },
        contents: vec![Content {
            role: Some("user"),
            parts,
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: to_gemini_schema(&request.schema),
            temperature: request.temperature,
        },
    }
}

#[async_trait]
impl ExtractionBackend for GeminiBackend {
    async fn generate(
        &self,
        prompt_name: &str,
        request: &StructuredRequest,
    ) -> Result<BackendResponse, AiError> {
        let body = build_request(request);

        tracing::debug!(prompt_name, model = %self.model, "Calling Gemini API");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(AiError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        if status != 200 {
            if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(&text) {
                return Err(AiError::ApiError {
                    status,
                    message: error_response.error.message,
                });
            }
            return Err(AiError::ApiError {
                status,
                message: text,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| AiError::ParseError(e.to_string()))?;
        response_content(parsed)
    }

    fn supports_native_video(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn response_content(parsed: GenerateResponse) -> Result<BackendResponse, AiError> {
    let usage = parsed
        .usage_metadata
        .map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        })
        .unwrap_or_default();

    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AiError::ParseError("No candidates in response".to_string()))?;

    let content: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(AiError::ParseError(format!(
            "Empty response (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(BackendResponse {
        content,
        usage,
        cached: false,
    })
}
