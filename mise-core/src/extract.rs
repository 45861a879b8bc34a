//! Structured extraction engine.
//!
//! Both call shapes (text content, native video) go through the same backend
//! trait and the same `normalize`, so callers always see a null-safe
//! `ExtractedRecipe` with steps numbered 1..=n.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::ai::prompts::{
    recipe_schema, render_text_instructions, render_video_instructions, TEXT_PROMPT_NAME,
    VIDEO_PROMPT_NAME,
};
use crate::ai::{AiError, ExtractionBackend, ExtractionInput, StructuredRequest};
use crate::types::{ExtractedIngredient, ExtractedRecipe, ExtractedStep, SourceType};

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Extraction backend failed: {0}")]
    Backend(#[from] AiError),

    #[error("Backend returned invalid JSON: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error("Backend response missing required field: {0}")]
    MissingField(String),
}

/// What to extract from.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionSource {
    /// Rendered prompt input (transcript lines or a blog content block).
    Text {
        source_type: SourceType,
        content: String,
    },
    /// A public video URL for a backend that can watch it.
    NativeVideo { video_url: String },
}

/// Run one extraction. Never retries; the first failure is returned.
///
/// `video_duration` bounds step timestamps when known.
pub async fn extract(
    backend: &dyn ExtractionBackend,
    source: &ExtractionSource,
    video_duration: Option<u32>,
) -> Result<ExtractedRecipe, ExtractionError> {
    let (prompt_name, instructions, input, source_type) = match source {
        ExtractionSource::Text {
            source_type,
            content,
        } => (
            TEXT_PROMPT_NAME,
            render_text_instructions(*source_type),
            ExtractionInput::Text {
                content: content.clone(),
            },
            *source_type,
        ),
        ExtractionSource::NativeVideo { video_url } => (
            VIDEO_PROMPT_NAME,
            render_video_instructions(video_duration),
            ExtractionInput::NativeVideo {
                video_url: video_url.clone(),
            },
            SourceType::Youtube,
        ),
    };

    let request = StructuredRequest {
        instructions,
        input,
        schema: recipe_schema(),
        temperature: Some(0.2),
    };

    tracing::info!(
        prompt_name,
        provider = backend.provider_name(),
        model = backend.model_name(),
        "extract: calling backend"
    );

    let response = backend.generate(prompt_name, &request).await?;
    let recipe = parse_response(&response.content, source_type, video_duration)?;

    tracing::info!(
        title = %recipe.title,
        ingredients = recipe.ingredients.len(),
        steps = recipe.steps.len(),
        cached = response.cached,
        "extract: recipe extracted"
    );
    Ok(recipe)
}

/// Parse and normalize the text of one backend response.
pub fn parse_response(
    content: &str,
    source_type: SourceType,
    video_duration: Option<u32>,
) -> Result<ExtractedRecipe, ExtractionError> {
    let raw: RawExtraction = serde_json::from_str(strip_code_fence(content))?;
    normalize(raw, source_type, video_duration)
}

/// Whether a response would survive `parse_response`. Source type and
/// duration only filter optional fields, so they don't matter here.
pub fn is_usable_response(content: &str) -> bool {
    parse_response(content, SourceType::Blog, None).is_ok()
}

/// Backend output before normalization. Everything is optional and numbers
/// are taken as loosely typed values, since models sometimes quote them.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExtraction {
    pub title: Option<String>,
    pub description: Option<String>,
    pub servings: Option<Value>,
    pub prep_time_minutes: Option<Value>,
    pub cook_time_minutes: Option<Value>,
    pub calories: Option<Value>,
    pub protein: Option<Value>,
    pub carbs: Option<Value>,
    pub fat: Option<Value>,
    pub fiber: Option<Value>,
    pub ingredients: Option<Vec<RawIngredient>>,
    pub steps: Option<Vec<RawStep>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawIngredient {
    pub name: Option<String>,
    pub quantity: Option<Value>,
    pub unit: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStep {
    pub step_number: Option<Value>,
    pub instruction: Option<String>,
    pub timestamp_seconds: Option<Value>,
    pub duration_seconds: Option<Value>,
}

/// Models occasionally wrap JSON in a markdown fence despite the response format.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn number(value: &Option<Value>) -> Option<f64> {
    let n = match value.as_ref()? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn non_negative_f64(value: &Option<Value>) -> Option<f64> {
    number(value).filter(|n| *n >= 0.0)
}

fn non_negative_i32(value: &Option<Value>) -> Option<i32> {
    non_negative_f64(value)
        .map(f64::round)
        .filter(|n| *n <= i32::MAX as f64)
        .map(|n| n as i32)
}

fn text_value(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => non_empty(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The one place backend output is made safe for the rest of the pipeline.
///
/// - optional scalars become `None` when absent, blank, negative or unparsable
/// - ingredients without a name and steps without an instruction are dropped
/// - steps are stably ordered by the model's numbering and renumbered 1..=n
/// - timestamps are dropped for blog sources, and outside `[0, duration]` for video
pub fn normalize(
    raw: RawExtraction,
    source_type: SourceType,
    video_duration: Option<u32>,
) -> Result<ExtractedRecipe, ExtractionError> {
    let title = non_empty(raw.title).ok_or_else(|| ExtractionError::MissingField("title".to_string()))?;

    let ingredients = raw
        .ingredients
        .unwrap_or_default()
        .into_iter()
        .filter_map(|i| {
            Some(ExtractedIngredient {
                name: non_empty(i.name)?,
                quantity: text_value(i.quantity),
                unit: non_empty(i.unit),
                notes: non_empty(i.notes),
            })
        })
        .collect();

    let timestamp = |value: &Option<Value>| -> Option<i32> {
        if source_type == SourceType::Blog {
            return None;
        }
        non_negative_i32(value).filter(|ts| match video_duration {
            Some(duration) => i64::from(*ts) <= i64::from(duration),
            None => true,
        })
    };

    let mut steps: Vec<(f64, ExtractedStep)> = raw
        .steps
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(index, s)| {
            let order = number(&s.step_number).unwrap_or((index + 1) as f64);
            let instruction = non_empty(s.instruction)?;
            Some((
                order,
                ExtractedStep {
                    step_number: 0,
                    instruction,
                    timestamp_seconds: timestamp(&s.timestamp_seconds),
                    duration_seconds: if source_type == SourceType::Blog {
                        None
                    } else {
                        non_negative_i32(&s.duration_seconds)
                    },
                },
            ))
        })
        .collect();

    // sort_by is stable, so equal numbers keep response order
    steps.sort_by(|a, b| a.0.total_cmp(&b.0));

    let steps = steps
        .into_iter()
        .enumerate()
        .map(|(i, (_, mut step))| {
            step.step_number = i as i32 + 1;
            step
        })
        .collect();

    Ok(ExtractedRecipe {
        title,
        description: non_empty(raw.description),
        servings: non_negative_i32(&raw.servings),
        prep_time_minutes: non_negative_i32(&raw.prep_time_minutes),
        cook_time_minutes: non_negative_i32(&raw.cook_time_minutes),
        calories: non_negative_f64(&raw.calories),
        protein: non_negative_f64(&raw.protein),
        carbs: non_negative_f64(&raw.carbs),
        fat: non_negative_f64(&raw.fat),
        fiber: non_negative_f64(&raw.fiber),
        ingredients,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::FakeBackend;
    use proptest::prelude::*;

    fn raw(json: &str) -> RawExtraction {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_minimal_response_normalizes_to_nulls() {
        let recipe = normalize(
            raw(r#"{"title":"Soup","ingredients":[{"name":"salt"}],"steps":[{"stepNumber":1,"instruction":"Boil"}]}"#),
            SourceType::Youtube,
            None,
        )
        .unwrap();

        assert_eq!(recipe.title, "Soup");
        assert_eq!(recipe.description, None);
        assert_eq!(recipe.servings, None);
        assert_eq!(recipe.prep_time_minutes, None);
        assert_eq!(recipe.cook_time_minutes, None);
        assert_eq!(recipe.calories, None);
        assert_eq!(recipe.protein, None);
        assert_eq!(recipe.carbs, None);
        assert_eq!(recipe.fat, None);
        assert_eq!(recipe.fiber, None);
        assert_eq!(
            recipe.ingredients,
            vec![ExtractedIngredient {
                name: "salt".to_string(),
                quantity: None,
                unit: None,
                notes: None,
            }]
        );
        assert_eq!(
            recipe.steps,
            vec![ExtractedStep {
                step_number: 1,
                instruction: "Boil".to_string(),
                timestamp_seconds: None,
                duration_seconds: None,
            }]
        );

        // Serialized form carries explicit nulls, never missing keys.
        let json = serde_json::to_value(&recipe).unwrap();
        assert!(json["description"].is_null());
        assert!(json.as_object().unwrap().contains_key("servings"));
        assert!(json["steps"][0].as_object().unwrap().contains_key("timestampSeconds"));
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let recipe = normalize(raw(r#"{"title":"Toast"}"#), SourceType::Blog, None).unwrap();
        assert!(recipe.ingredients.is_empty());
        assert!(recipe.steps.is_empty());
    }

    #[test]
    fn test_missing_title_is_error() {
        let err = normalize(raw(r#"{"title":"  ","ingredients":[]}"#), SourceType::Blog, None)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::MissingField(f) if f == "title"));
    }

    #[test]
    fn test_loose_numbers() {
        let recipe = normalize(
            raw(r#"{"title":"Stew","servings":"4","calories":350.5,"protein":-3,"fat":"lots","prepTimeMinutes":9.6,
                   "ingredients":[{"name":" beef ","quantity":2,"unit":" lb "},{"name":"  "}]}"#),
            SourceType::Blog,
            None,
        )
        .unwrap();
        assert_eq!(recipe.servings, Some(4));
        assert_eq!(recipe.calories, Some(350.5));
        assert_eq!(recipe.protein, None);
        assert_eq!(recipe.fat, None);
        assert_eq!(recipe.prep_time_minutes, Some(10));
        assert_eq!(recipe.ingredients.len(), 1);
        assert_eq!(recipe.ingredients[0].name, "beef");
        assert_eq!(recipe.ingredients[0].quantity.as_deref(), Some("2"));
        assert_eq!(recipe.ingredients[0].unit.as_deref(), Some("lb"));
    }

    #[test]
    fn test_steps_sorted_renumbered_and_bounded() {
        let recipe = normalize(
            raw(r#"{"title":"Curry","steps":[
                {"stepNumber":3,"instruction":"Simmer","timestampSeconds":400},
                {"stepNumber":1,"instruction":"Chop","timestampSeconds":12},
                {"stepNumber":2,"instruction":"   "},
                {"stepNumber":5,"instruction":"Serve","timestampSeconds":9000,"durationSeconds":-4}
            ]}"#),
            SourceType::Youtube,
            Some(600),
        )
        .unwrap();

        let summary: Vec<(i32, &str, Option<i32>)> = recipe
            .steps
            .iter()
            .map(|s| (s.step_number, s.instruction.as_str(), s.timestamp_seconds))
            .collect();
        assert_eq!(
            summary,
            vec![(1, "Chop", Some(12)), (2, "Simmer", Some(400)), (3, "Serve", None)]
        );
        assert_eq!(recipe.steps[2].duration_seconds, None);
    }

    #[test]
    fn test_blog_steps_have_no_timestamps() {
        let recipe = normalize(
            raw(r#"{"title":"Salad","steps":[{"stepNumber":1,"instruction":"Toss","timestampSeconds":5,"durationSeconds":3}]}"#),
            SourceType::Blog,
            None,
        )
        .unwrap();
        assert_eq!(recipe.steps[0].timestamp_seconds, None);
        assert_eq!(recipe.steps[0].duration_seconds, None);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_usable_response() {
        assert!(is_usable_response(r#"{"title":"Soup"}"#));
        assert!(is_usable_response("```json\n{\"title\":\"Soup\"}\n```"));
        assert!(!is_usable_response("not json"));
        assert!(!is_usable_response(r#"{"title":"  ","steps":[]}"#));
        assert!(!is_usable_response(r#"{"description":"no title"}"#));
    }

    #[tokio::test]
    async fn test_extract_text_path() {
        let backend = FakeBackend::new().with_response(
            "pancakes",
            r#"{"title":"Pancakes","ingredients":[{"name":"flour","quantity":"1","unit":"cup"}],"steps":[{"stepNumber":1,"instruction":"Mix"}]}"#,
        );
        let source = ExtractionSource::Text {
            source_type: SourceType::Blog,
            content: "Page title: Pancakes".to_string(),
        };

        let recipe = extract(&backend, &source, None).await.unwrap();
        assert_eq!(recipe.title, "Pancakes");

        let requests = backend.requests();
        assert_eq!(requests[0].0, TEXT_PROMPT_NAME);
        assert_eq!(requests[0].1.schema["required"][0], "title");
    }

    #[tokio::test]
    async fn test_extract_native_video_path() {
        let backend = FakeBackend::new().with_native_video().with_response(
            "watch?v=abc",
            r#"{"title":"Curry","ingredients":[],"steps":[{"stepNumber":1,"instruction":"Fry","timestampSeconds":30}]}"#,
        );
        let source = ExtractionSource::NativeVideo {
            video_url: "https://youtube.com/watch?v=abc".to_string(),
        };

        let recipe = extract(&backend, &source, Some(20)).await.unwrap();
        // 30s is past the end of a 20s video
        assert_eq!(recipe.steps[0].timestamp_seconds, None);

        let requests = backend.requests();
        assert_eq!(requests[0].0, VIDEO_PROMPT_NAME);
        assert!(requests[0].1.instructions.contains("between 0 and 20"));
    }

    #[tokio::test]
    async fn test_backend_and_parse_failures() {
        let backend = FakeBackend::new()
            .with_failure("down", "503")
            .with_response("garbage", "not json at all");

        let err = extract(
            &backend,
            &ExtractionSource::Text {
                source_type: SourceType::Blog,
                content: "down".to_string(),
            },
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExtractionError::Backend(_)));

        let err = extract(
            &backend,
            &ExtractionSource::Text {
                source_type: SourceType::Blog,
                content: "garbage".to_string(),
            },
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidResponse(_)));
    }

    proptest! {
        #[test]
        fn steps_always_numbered_contiguously(
            numbers in proptest::collection::vec(proptest::option::of(-5i64..50), 0..20),
            blanks in proptest::collection::vec(any::<bool>(), 20),
        ) {
            let steps: Vec<Value> = numbers
                .iter()
                .enumerate()
                .map(|(i, n)| serde_json::json!({
                    "stepNumber": n,
                    "instruction": if blanks[i] { " ".to_string() } else { format!("step {}", i) },
                }))
                .collect();
            let raw: RawExtraction =
                serde_json::from_value(serde_json::json!({"title": "t", "steps": steps})).unwrap();

            let recipe = normalize(raw, SourceType::Youtube, None).unwrap();
            let expected: Vec<i32> = (1..=recipe.steps.len() as i32).collect();
            let actual: Vec<i32> = recipe.steps.iter().map(|s| s.step_number).collect();
            prop_assert_eq!(actual, expected);
            prop_assert!(recipe.steps.iter().all(|s| !s.instruction.trim().is_empty()));
        }
    }
}
