//! Rendering transcripts as `[M:SS] text` lines for the extraction prompt.

use crate::types::TranscriptSegment;

/// Total minutes and zero-padded seconds: `0:05`, `12:34`, `99:59`.
///
/// Minutes are never folded into hours, so long videos give `125:30`.
pub fn format_timestamp(total_seconds: u64) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Inverse of `format_timestamp`. Also accepts `H:MM:SS`.
pub fn parse_timestamp(s: &str) -> Option<u64> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    let nums = parts
        .iter()
        .map(|p| {
            if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                None
            } else {
                p.parse::<u64>().ok()
            }
        })
        .collect::<Option<Vec<u64>>>()?;

    match nums.as_slice() {
        [m, s] if *s < 60 => Some(m * 60 + s),
        [h, m, s] if *m < 60 && *s < 60 => Some(h * 3600 + m * 60 + s),
        _ => None,
    }
}

/// One line per segment, offset truncated to whole seconds.
pub fn format_transcript(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|seg| format!("[{}] {}", format_timestamp(seg.offset_ms / 1000), seg.text))
        .collect::<Vec<_>>()
        .join("\n")
}
