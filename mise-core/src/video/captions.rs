//! Caption track XML parsing.
//!
//! Tracks look like `<transcript><text start="1.2" dur="3.4">words</text>...`.
//! Anything that doesn't match is skipped rather than treated as an error.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::TranscriptSegment;

static TEXT_ELEMENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<text\b([^>]*)>(.*?)</text>"#).expect("Invalid caption text regex")
});

static START_ATTR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bstart\s*=\s*["']([0-9]*\.?[0-9]+)["']"#).expect("Invalid start attr regex")
});

static DUR_ATTR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bdur\s*=\s*["']([0-9]*\.?[0-9]+)["']"#).expect("Invalid dur attr regex")
});

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));

/// Parse caption XML into segments, in document order.
pub fn parse_caption_xml(xml: &str) -> Vec<TranscriptSegment> {
    TEXT_ELEMENT_REGEX
        .captures_iter(xml)
        .filter_map(|cap| {
            let attrs = cap.get(1)?.as_str();
            let start = START_ATTR_REGEX
                .captures(attrs)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok())?;
            let dur = DUR_ATTR_REGEX
                .captures(attrs)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or(0.0);

            let text = clean_caption_text(cap.get(2)?.as_str());
            if text.is_empty() {
                return None;
            }

            Some(TranscriptSegment {
                text,
                offset_ms: seconds_to_ms(start),
                duration_ms: seconds_to_ms(dur),
            })
        })
        .collect()
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds * 1000.0).round().max(0.0) as u64
}

/// Decode entities, drop inline markup and collapse whitespace.
fn clean_caption_text(raw: &str) -> String {
    // Caption bodies are often entity-encoded twice (`&amp;#39;`).
    let mut text = html_escape::decode_html_entities(raw).into_owned();
    if text.contains('&') {
        text = html_escape::decode_html_entities(&text).into_owned();
    }
    let text = TAG_REGEX.replace_all(&text, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
