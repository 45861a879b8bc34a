use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a recipe came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Youtube,
    Blog,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Youtube => "youtube",
            SourceType::Blog => "blog",
        }
    }
}

/// One caption cue, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub offset_ms: u64,
    pub duration_ms: u64,
}

/// Metadata from the video platform's public metadata endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub author: String,
    pub thumbnail_url: String,
    /// Video length from the player response, when the watch page exposed it.
    pub duration_seconds: Option<u32>,
}

/// Everything the video source knows about one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoContent {
    pub video_id: String,
    pub metadata: VideoMetadata,
    /// Empty when the video has no captions. Not an error.
    pub transcript_segments: Vec<TranscriptSegment>,
}

/// Text extracted from a blog page, ready to hand to the extraction engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogContent {
    pub title: String,
    pub content: String,
    pub thumbnail_url: Option<String>,
    pub author: Option<String>,
    pub method: BlogExtractionMethod,
}

/// Which blog strategy produced the content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlogExtractionMethod {
    JsonLd,
    Readability,
}

/// Normalized output of the extraction engine.
///
/// Optional scalars are `None` rather than absent; `ingredients` and `steps`
/// are always present, and step numbers run 1..=n without gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRecipe {
    pub title: String,
    pub description: Option<String>,
    pub servings: Option<i32>,
    pub prep_time_minutes: Option<i32>,
    pub cook_time_minutes: Option<i32>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub ingredients: Vec<ExtractedIngredient>,
    pub steps: Vec<ExtractedStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedIngredient {
    /// Canonical singular/common name, e.g. "chicken breast".
    pub name: String,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedStep {
    pub step_number: i32,
    pub instruction: String,
    pub timestamp_seconds: Option<i32>,
    pub duration_seconds: Option<i32>,
}

/// Source details carried alongside an extraction into persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMeta {
    pub source_url: String,
    pub source_type: SourceType,
    pub youtube_video_id: Option<String>,
    pub thumbnail_url: Option<String>,
    pub author: Option<String>,
}

/// A recipe the user already saved from the same normalized URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingRecipeSummary {
    pub id: Uuid,
    pub title: String,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
}

/// A fresh extraction plus the source details needed to save it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFromUrl {
    pub recipe: ExtractedRecipe,
    pub source: SourceMeta,
}

/// Result of `RecipePipeline::extract_from_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Extracted(ExtractedFromUrl),
    Existing(ExistingRecipeSummary),
}
