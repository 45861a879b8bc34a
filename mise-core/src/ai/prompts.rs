//! Recipe extraction prompts and the response schema.

use serde_json::{json, Value};

use crate::types::SourceType;

/// Prompt name for cache keys: transcript or blog text in, recipe out.
pub const TEXT_PROMPT_NAME: &str = "extract_recipe_text";

/// Prompt name for cache keys: video URL in, recipe out.
pub const VIDEO_PROMPT_NAME: &str = "extract_recipe_video";

const TASK: &str = r#"You are a recipe extraction assistant. Extract the single recipe described in the source into the provided JSON schema.

Rules:
- "title" is the dish name, not the page or video title verbatim when those differ.
- Ingredient "name" must be the canonical singular or common name of the ingredient only, e.g. "chicken breast", not "2 lbs boneless skinless chicken breasts". Put the amount in "quantity", the unit in "unit", and preparation details ("diced", "room temperature") in "notes".
- "quantity" and "unit" keep the source's wording ("1/2", "tablespoons").
- Steps are imperative instructions in the order they are performed. Number them from 1.
- Times are whole minutes. Macros (calories, protein, carbs, fat, fiber) are per serving; protein, carbs, fat and fiber are grams.
- Use null for anything the source does not state or clearly imply. Never invent values."#;

const TIMESTAMP_RULES: &str = r#"Timestamps:
- "timestampSeconds" is the second in the video where the step begins. It must correspond to an actual moment in the source: for transcripts, use the time of the transcript line where the step is described; never interpolate or invent a time.
- Steps must be in chronological order, so timestampSeconds never decreases as stepNumber increases.
- "durationSeconds" is how long the step is shown, if evident; otherwise null.
- If you cannot tie a step to a moment in the video, use null for its timestamp."#;

/// System instructions for the text path.
pub fn render_text_instructions(source_type: SourceType) -> String {
    match source_type {
        SourceType::Youtube => format!(
            "{TASK}\n\nThe source is a cooking video transcript. Each line starts with a [M:SS] timestamp.\n\n{TIMESTAMP_RULES}"
        ),
        SourceType::Blog => format!(
            "{TASK}\n\nThe source is text extracted from a recipe web page. There are no video timestamps: \"timestampSeconds\" and \"durationSeconds\" must be null."
        ),
    }
}

/// System instructions for the native video path.
pub fn render_video_instructions(duration_seconds: Option<u32>) -> String {
    let length = duration_seconds
        .map(|d| format!(" The video is {} seconds long; every timestamp must be between 0 and {}.", d, d))
        .unwrap_or_default();
    format!(
        "{TASK}\n\nThe source is the attached cooking video. Watch and listen to the whole video.{length}\n\n{TIMESTAMP_RULES}"
    )
}

/// User content for the text path.
pub fn render_text_input(source_type: SourceType, title: &str, author: Option<&str>, body: &str) -> String {
    let mut header = match source_type {
        SourceType::Youtube => format!("Video title: {}", title),
        SourceType::Blog => format!("Page title: {}", title),
    };
    if let Some(author) = author.filter(|a| !a.is_empty()) {
        header.push_str(&format!("\nBy: {}", author));
    }
    let label = match source_type {
        SourceType::Youtube => "Transcript",
        SourceType::Blog => "Content",
    };
    format!("{}\n\n{}:\n{}", header, label, body)
}

fn nullable(kind: &str) -> Value {
    json!({ "type": [kind, "null"] })
}

/// JSON Schema of the extraction response. `title`, `ingredients` and `steps`
/// are required; every other field may be absent or null.
pub fn recipe_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "description": nullable("string"),
            "servings": nullable("integer"),
            "prepTimeMinutes": nullable("integer"),
            "cookTimeMinutes": nullable("integer"),
            "calories": nullable("number"),
            "protein": nullable("number"),
            "carbs": nullable("number"),
            "fat": nullable("number"),
            "fiber": nullable("number"),
            "ingredients": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "quantity": nullable("string"),
                        "unit": nullable("string"),
                        "notes": nullable("string")
                    },
                    "required": ["name"]
                }
            },
            "steps": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "stepNumber": { "type": "integer" },
                        "instruction": { "type": "string" },
                        "timestampSeconds": nullable("integer"),
                        "durationSeconds": nullable("integer")
                    },
                    "required": ["stepNumber", "instruction"]
                }
            }
        },
        "required": ["title", "ingredients", "steps"]
    })
}
