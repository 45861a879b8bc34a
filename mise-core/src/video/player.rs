//! Player-response scraping from the video watch page.
//!
//! The watch page embeds a large JSON object assigned to
//! `ytInitialPlayerResponse`. It isn't delimited by anything we can split on,
//! so the object is cut out by counting braces outside of string literals.

use serde_json::Value;

const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse";

/// A caption track advertised by the player response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `Some("asr")` for auto-generated tracks.
    pub kind: Option<String>,
}

/// The parts of the player response the pipeline cares about.
#[derive(Debug, Clone, Default)]
pub struct PlayerInfo {
    pub caption_tracks: Vec<CaptionTrack>,
    pub length_seconds: Option<u32>,
}

/// Find and parse the embedded player response. `None` if the marker is
/// missing, the object never closes, or it isn't valid JSON.
pub fn parse_player_response(html: &str) -> Option<PlayerInfo> {
    let raw = extract_player_json(html)?;
    let json: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "player response is not valid JSON");
            return None;
        }
    };

    Some(PlayerInfo {
        caption_tracks: caption_tracks(&json),
        length_seconds: json
            .pointer("/videoDetails/lengthSeconds")
            .and_then(|v| match v {
                Value::String(s) => s.parse().ok(),
                Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
                _ => None,
            }),
    })
}

/// Slice the JSON object that follows the marker.
pub(crate) fn extract_player_json(html: &str) -> Option<&str> {
    html.match_indices(PLAYER_RESPONSE_MARKER)
        .find_map(|(pos, _)| object_after(&html[pos + PLAYER_RESPONSE_MARKER.len()..]))
}

/// The balanced object assigned right after a marker occurrence, if any.
fn object_after(after_marker: &str) -> Option<&str> {
    let open = after_marker.find('{')?;

    // Covers `var x = {`, `window["x"] = {` and nothing else.
    if !after_marker[..open]
        .chars()
        .all(|c| c.is_whitespace() || matches!(c, '=' | '"' | '\'' | ']'))
    {
        return None;
    }

    let object = &after_marker[open..];
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in object.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&object[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

fn caption_tracks(json: &Value) -> Vec<CaptionTrack> {
    json.pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")
        .and_then(|v| v.as_array())
        .map(|tracks| {
            tracks
                .iter()
                .filter_map(|t| {
                    Some(CaptionTrack {
                        base_url: t.get("baseUrl")?.as_str()?.to_string(),
                        language_code: t
                            .get("languageCode")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        kind: t.get("kind").and_then(|v| v.as_str()).map(str::to_string),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Prefer an English track (human-made over auto-generated), else the first track.
pub fn choose_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    let is_english = |t: &&CaptionTrack| {
        t.language_code == "en" || t.language_code.starts_with("en-")
    };

    tracks
        .iter()
        .filter(is_english)
        .find(|t| t.kind.as_deref() != Some("asr"))
        .or_else(|| tracks.iter().find(is_english))
        .or_else(|| tracks.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(lang: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://captions.example/{}", lang),
            language_code: lang.to_string(),
            kind: kind.map(str::to_string),
        }
    }

    #[test]
    fn extracts_nested_object_with_braces_in_strings() {
        let html = r#"<script>var ytInitialPlayerResponse = {"a":{"b":"}{"},"c":"say \"}\""};var next = {};</script>"#;
        assert_eq!(
            extract_player_json(html),
            Some(r#"{"a":{"b":"}{"},"c":"say \"}\""}"#)
        );
    }

    #[test]
    fn missing_marker_or_unclosed_object_is_none() {
        assert_eq!(extract_player_json("<html>nothing here</html>"), None);
        assert_eq!(
            extract_player_json(r#"var ytInitialPlayerResponse = {"a":"b""#),
            None
        );
        // Marker mentioned in prose, not assigned.
        assert_eq!(
            extract_player_json(r#"ytInitialPlayerResponse is loaded later; var x = {"a":1}"#),
            None
        );
    }

    #[test]
    fn parses_tracks_and_length() {
        let html = r#"var ytInitialPlayerResponse = {"videoDetails":{"lengthSeconds":"754"},"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://yt.example/tt?lang=es","languageCode":"es"},{"baseUrl":"https://yt.example/tt?lang=en","languageCode":"en","kind":"asr"}]}}};"#;
        let info = parse_player_response(html).unwrap();
        assert_eq!(info.length_seconds, Some(754));
        assert_eq!(info.caption_tracks.len(), 2);
        assert_eq!(
            choose_track(&info.caption_tracks).unwrap().base_url,
            "https://yt.example/tt?lang=en"
        );
    }

    #[test]
    fn no_captions_key_means_no_tracks() {
        let html = r#"var ytInitialPlayerResponse = {"videoDetails":{"lengthSeconds":"60"}};"#;
        let info = parse_player_response(html).unwrap();
        assert!(info.caption_tracks.is_empty());
    }

    #[test]
    fn track_preference() {
        let tracks = vec![
            track("de", None),
            track("en-GB", Some("asr")),
            track("en", None),
        ];
        assert_eq!(choose_track(&tracks).unwrap().language_code, "en");

        let tracks = vec![track("de", None), track("en-GB", Some("asr"))];
        assert_eq!(choose_track(&tracks).unwrap().language_code, "en-GB");

        let tracks = vec![track("de", None), track("fr", None)];
        assert_eq!(choose_track(&tracks).unwrap().language_code, "de");

        assert!(choose_track(&[]).is_none());
    }
}
