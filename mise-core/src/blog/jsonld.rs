//! Schema.org `Recipe` markup embedded as JSON-LD.
//!
//! The structured fields are flattened into a plain-text block for the
//! extraction engine. This is prompt input, not a parsed recipe.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Regex to find JSON-LD script tags (case-insensitive for type attribute)
static JSONLD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("Invalid JSON-LD regex")
});

static HTML_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("Invalid HTML tag regex"));

/// A Recipe found in JSON-LD, rendered as text.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonLdRecipe {
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub author: Option<String>,
}

/// First Recipe in document order, if any script block carries one.
pub fn find_recipe(html: &str) -> Option<JsonLdRecipe> {
    for cap in JSONLD_REGEX.captures_iter(html) {
        let Some(json_text) = cap.get(1) else {
            continue;
        };

        let sanitized = sanitize_json(json_text.as_str());
        let json: Value = match serde_json::from_str(&sanitized) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "blog: skipping unparsable JSON-LD block");
                continue;
            }
        };

        if let Some(recipe) = recipe_node(&json) {
            return Some(render(recipe));
        }
    }
    None
}

/// Sanitize JSON-LD content to handle common malformed patterns.
/// Some sites include literal newlines/tabs inside JSON strings instead of escaped versions.
fn sanitize_json(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in json.chars() {
        if in_string {
            if escaped {
                escaped = false;
                result.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    result.push(c);
                }
                '"' => {
                    in_string = false;
                    result.push(c);
                }
                '\n' => result.push_str("\\n"),
                '\r' => result.push_str("\\r"),
                '\t' => result.push_str("\\t"),
                c if c.is_control() => {}
                _ => result.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            result.push(c);
        }
    }

    result
}

fn is_recipe(node: &Value) -> bool {
    match node.get("@type") {
        Some(Value::String(s)) => s == "Recipe",
        Some(Value::Array(types)) => types.iter().any(|t| t == "Recipe"),
        _ => false,
    }
}

/// Three shapes are recognized: the block itself is a Recipe, a `@graph`
/// array holds one, or the block is a top-level array holding one.
fn recipe_node(json: &Value) -> Option<&Value> {
    match json {
        Value::Object(obj) => {
            if is_recipe(json) {
                return Some(json);
            }
            obj.get("@graph")
                .and_then(|g| g.as_array())
                .and_then(|items| items.iter().find(|item| is_recipe(item)))
        }
        Value::Array(items) => items.iter().find(|item| is_recipe(item)),
        _ => None,
    }
}

fn render(recipe: &Value) -> JsonLdRecipe {
    let title = text_field(recipe, "name").unwrap_or_default();
    let mut sections: Vec<String> = Vec::new();

    if !title.is_empty() {
        sections.push(format!("Recipe: {}", title));
    }
    if let Some(description) = text_field(recipe, "description") {
        sections.push(format!("Description: {}", description));
    }
    if let Some(yields) = recipe.get("recipeYield").and_then(recipe_yield) {
        sections.push(format!("Servings: {}", yields));
    }
    for (key, label) in [
        ("prepTime", "Prep time"),
        ("cookTime", "Cook time"),
        ("totalTime", "Total time"),
    ] {
        if let Some(value) = text_field(recipe, key) {
            sections.push(format!("{}: {}", label, value));
        }
    }

    if let Some(nutrition) = recipe.get("nutrition").and_then(|n| n.as_object()) {
        let lines: Vec<String> = nutrition
            .iter()
            .filter(|(k, _)| !k.starts_with('@'))
            .filter_map(|(k, v)| scalar_text(v).map(|v| format!("- {}: {}", k, v)))
            .collect();
        if !lines.is_empty() {
            sections.push(format!("Nutrition:\n{}", lines.join("\n")));
        }
    }

    let ingredients = ingredient_lines(recipe);
    if !ingredients.is_empty() {
        sections.push(format!(
            "Ingredients:\n{}",
            ingredients
                .iter()
                .map(|i| format!("- {}", i))
                .collect::<Vec<_>>()
                .join("\n")
        ));
    }

    let mut lines = Vec::new();
    if let Some(instructions) = recipe.get("recipeInstructions") {
        collect_instructions(instructions, &mut lines);
    }
    if lines.iter().any(|l| matches!(l, InstructionLine::Step(_))) {
        sections.push(format!("Instructions:\n{}", number_steps(&lines)));
    }

    JsonLdRecipe {
        title,
        content: sections.join("\n\n"),
        image: recipe.get("image").and_then(image_url),
        author: recipe.get("author").and_then(author_name),
    }
}

fn text_field(node: &Value, key: &str) -> Option<String> {
    node.get(key).and_then(scalar_text)
}

/// Strings are cleaned of markup and entities; numbers are printed as-is.
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => clean_text(s),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let stripped = HTML_TAG_REGEX.replace_all(&decoded, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn recipe_yield(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
            (!parts.is_empty()).then(|| parts.join(" / "))
        }
        other => scalar_text(other),
    }
}

fn ingredient_lines(recipe: &Value) -> Vec<String> {
    // Older markup uses `ingredients`.
    let raw = recipe
        .get("recipeIngredient")
        .or_else(|| recipe.get("ingredients"));

    match raw {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(other) => scalar_text(other).into_iter().collect(),
        None => Vec::new(),
    }
}

enum InstructionLine {
    /// A `HowToSection` name.
    Heading(String),
    Step(String),
}

/// Steps are numbered 1..=n across sections; headings are not counted.
fn number_steps(lines: &[InstructionLine]) -> String {
    let mut n = 0;
    lines
        .iter()
        .map(|line| match line {
            InstructionLine::Heading(name) => format!("{}:", name),
            InstructionLine::Step(text) => {
                n += 1;
                format!("{}. {}", n, text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Flatten strings, `HowToStep`s and `HowToSection`s into lines, in order.
fn collect_instructions(value: &Value, out: &mut Vec<InstructionLine>) {
    match value {
        Value::String(s) => {
            // A single string may hold several paragraphs.
            out.extend(
                s.split('\n')
                    .map(clean_text)
                    .filter(|line| !line.is_empty())
                    .map(InstructionLine::Step),
            );
        }
        Value::Array(items) => {
            for item in items {
                collect_instructions(item, out);
            }
        }
        Value::Object(obj) => {
            if let Some(items) = obj.get("itemListElement") {
                if let Some(name) = obj.get("name").and_then(scalar_text) {
                    out.push(InstructionLine::Heading(name));
                }
                collect_instructions(items, out);
            } else if let Some(text) = obj
                .get("text")
                .or_else(|| obj.get("name"))
                .and_then(scalar_text)
            {
                out.push(InstructionLine::Step(text));
            }
        }
        _ => {}
    }
}

fn image_url(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(image_url),
        Value::Object(obj) => obj.get("url").and_then(image_url),
        _ => None,
    }
}

fn author_name(value: &Value) -> Option<String> {
    match value {
        Value::String(_) => scalar_text(value),
        Value::Array(items) => items.iter().find_map(author_name),
        Value::Object(obj) => obj.get("name").and_then(scalar_text),
        _ => None,
    }
}
