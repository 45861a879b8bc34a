//! URL classification and normalization.
//!
//! Both functions are pure: no I/O, same input always yields the same output.

use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("Invalid URL: {0}")]
    Invalid(String),
}

/// What kind of content a URL points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlKind {
    Video { video_id: String },
    Blog,
}

/// Hosts (after stripping `www.`/`m.`) that belong to the video platform.
const VIDEO_HOSTS: &[&str] = &["youtube.com", "youtu.be", "youtube-nocookie.com"];

/// Path prefixes whose next segment is the video ID.
const VIDEO_PATH_PREFIXES: &[&str] = &["embed", "v", "shorts", "live"];

/// Query parameters that never change which page is served.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "mc_cid", "mc_eid", "ref", "si", "feature", "igshid",
];

/// Classify a URL as a video link or a generic web page.
///
/// Parse failures, non-http(s) schemes and video-platform URLs that don't carry
/// a video ID are errors; anything else that isn't on the video platform is a blog.
pub fn classify(url: &str) -> Result<UrlKind, UrlError> {
    let parsed = parse_web_url(url)?;
    let host = bare_host(&parsed);

    if !VIDEO_HOSTS.contains(&host.as_str()) {
        return Ok(UrlKind::Blog);
    }

    match video_id_from(&parsed, &host) {
        Some(video_id) => Ok(UrlKind::Video { video_id }),
        None => Err(UrlError::Invalid(format!(
            "no video ID in video platform URL: {}",
            url
        ))),
    }
}

/// Canonical form of a source URL, used as the dedup key.
///
/// Video links collapse to `https://youtube.com/watch?v=<id>`. Other URLs lose
/// their scheme distinction, `www.`/`m.` prefix, fragment, trailing slash and
/// tracking parameters; remaining query parameters are sorted. Applying it
/// twice gives the same result as applying it once.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    let parsed = match parse_web_url(trimmed) {
        Ok(p) => p,
        Err(_) => {
            return match Url::parse(trimmed) {
                Ok(other) => other.to_string(),
                Err(_) => trimmed.to_string(),
            }
        }
    };

    let host = bare_host(&parsed);
    if VIDEO_HOSTS.contains(&host.as_str()) {
        if let Some(video_id) = video_id_from(&parsed, &host) {
            return canonical_video_url(&video_id);
        }
    }

    let path = parsed.path().trim_end_matches('/');

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();

    // Schemes collapse to https, so both default ports mean "no port".
    let port = match parsed.port() {
        Some(p) if p != 80 && p != 443 => format!(":{}", p),
        _ => String::new(),
    };

    let mut normalized = format!("https://{}{}{}", host, port, path);
    if !params.is_empty() {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter())
            .finish();
        normalized.push('?');
        normalized.push_str(&query);
    }
    normalized
}

/// Watch-page URL for a video ID.
pub fn canonical_video_url(video_id: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("v", video_id)
        .finish();
    format!("https://youtube.com/watch?{}", query)
}

fn parse_web_url(url: &str) -> Result<Url, UrlError> {
    let parsed = Url::parse(url.trim()).map_err(|e| UrlError::Invalid(format!("{}: {}", url, e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(UrlError::Invalid(format!(
            "unsupported scheme '{}': {}",
            parsed.scheme(),
            url
        )));
    }
    match parsed.host_str() {
        Some(h) if !h.is_empty() => Ok(parsed),
        _ => Err(UrlError::Invalid(format!("no host: {}", url))),
    }
}

/// Lowercased host with leading `www.`/`m.` labels removed, as long as what
/// remains still has a dot (`m.com` is a domain, not a mobile subdomain).
fn bare_host(url: &Url) -> String {
    let mut host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    loop {
        let rest = host
            .strip_prefix("www.")
            .or_else(|| host.strip_prefix("m."))
            .filter(|rest| rest.contains('.'))
            .map(str::to_string);
        match rest {
            Some(rest) => host = rest,
            None => return host,
        }
    }
}

fn video_id_from(url: &Url, host: &str) -> Option<String> {
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    if host == "youtu.be" {
        return segments.next().map(str::to_string);
    }

    let first = segments.next()?;
    if first == "watch" {
        return url
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty());
    }

    if VIDEO_PATH_PREFIXES.contains(&first) {
        return segments.next().map(str::to_string);
    }

    None
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn video(id: &str) -> Result<UrlKind, UrlError> {
        Ok(UrlKind::Video {
            video_id: id.to_string(),
        })
    }

    #[test]
    fn test_classifies_all_video_path_shapes() {
        assert_eq!(classify("https://www.youtube.com/watch?v=abc123"), video("abc123"));
        assert_eq!(classify("https://youtu.be/abc123"), video("abc123"));
        assert_eq!(classify("https://youtube.com/embed/abc123"), video("abc123"));
        assert_eq!(classify("https://youtube.com/v/abc123"), video("abc123"));
        assert_eq!(classify("https://youtube.com/shorts/abc123"), video("abc123"));
        assert_eq!(classify("https://youtube.com/live/abc123?si=xyz"), video("abc123"));
        assert_eq!(
            classify("https://m.youtube.com/watch?feature=share&v=abc123&t=42"),
            video("abc123")
        );
    }

    #[test]
    fn test_other_hosts_are_blogs() {
        assert_eq!(classify("https://example.com/recipe/1"), Ok(UrlKind::Blog));
        assert_eq!(
            classify("https://notyoutube.com/watch?v=abc123"),
            Ok(UrlKind::Blog)
        );
    }

    #[test]
    fn test_malformed_urls_fail() {
        assert!(classify("not a url").is_err());
        assert!(classify("").is_err());
        assert!(classify("ftp://example.com/recipe").is_err());
        assert!(classify("https://www.youtube.com/channel/UCxyz").is_err());
        assert!(classify("https://www.youtube.com/watch?v=").is_err());
    }

    #[test]
    fn test_normalize_drops_tracking_and_cosmetics() {
        assert_eq!(
            normalize_url("https://blog.example/recipe?utm_source=x"),
            normalize_url("https://blog.example/recipe")
        );
        assert_eq!(
            normalize_url("http://www.Blog.Example/recipe/#comments"),
            "https://blog.example/recipe"
        );
        assert_eq!(
            normalize_url("https://blog.example/r?b=2&a=1&fbclid=zz"),
            "https://blog.example/r?a=1&b=2"
        );
    }

    #[test]
    fn test_normalize_keeps_short_domains_and_ports() {
        assert_eq!(normalize_url("https://m.com/recipe"), "https://m.com/recipe");
        assert_eq!(normalize_url("https://www.m.com/recipe"), "https://m.com/recipe");
        assert_eq!(normalize_url("https://www.com/recipe"), "https://www.com/recipe");
        assert_eq!(normalize_url("https://m.blog.example/r"), "https://blog.example/r");

        assert_eq!(
            normalize_url("https://blog.example:8080/r"),
            "https://blog.example:8080/r"
        );
        assert_ne!(
            normalize_url("https://blog.example:8080/r"),
            normalize_url("https://blog.example:9090/r")
        );
        assert_eq!(normalize_url("http://blog.example:80/r"), "https://blog.example/r");
        assert_eq!(normalize_url("http://blog.example:443/r"), "https://blog.example/r");
    }

    #[test]
    fn test_normalize_collapses_video_variants() {
        let expected = "https://youtube.com/watch?v=abc123";
        assert_eq!(normalize_url("https://youtu.be/abc123?si=share"), expected);
        assert_eq!(normalize_url("https://www.youtube.com/shorts/abc123"), expected);
        assert_eq!(
            normalize_url("https://m.youtube.com/watch?v=abc123&t=10s"),
            expected
        );
    }

    proptest! {
        #[test]
        fn test_classify_is_total(input in ".*") {
            match classify(&input) {
                Ok(UrlKind::Video { video_id }) => prop_assert!(!video_id.is_empty()),
                Ok(UrlKind::Blog) | Err(_) => {}
            }
        }

        #[test]
        fn test_classify_extracts_generated_ids(id in "[A-Za-z0-9_-]{1,16}") {
            let watch = format!("https://www.youtube.com/watch?v={}", id);
            let short = format!("https://youtu.be/{}", id);
            prop_assert_eq!(classify(&watch), video(&id));
            prop_assert_eq!(classify(&short), video(&id));
        }

        #[test]
        fn test_generated_blog_urls_stay_blogs(
            domain in "[a-z]{3,10}",
            tld in "(com|org|net|io)",
            path in "[a-z0-9/]{0,20}",
        ) {
            prop_assume!(!domain.starts_with("youtu"));
            let url = format!("https://{}.{}/{}", domain, tld, path);
            prop_assert_eq!(classify(&url), Ok(UrlKind::Blog));
        }

        #[test]
        fn test_normalize_is_idempotent(
            host in "(www\\.|m\\.){0,2}[a-z]{1,8}\\.(com|org)(:[0-9]{1,5})?",
            path in "(/[a-z0-9]{1,6}){0,3}/?",
            query in "(\\?[a-z]{1,4}=[a-z0-9 ]{0,4}(&utm_[a-z]{1,4}=[a-z]{1,3})?)?",
        ) {
            let url = format!("https://{}{}{}", host, path, query);
            let once = normalize_url(&url);
            prop_assert_eq!(normalize_url(&once), once);
        }

        #[test]
        fn test_normalize_never_panics(input in ".*") {
            let once = normalize_url(&input);
            prop_assert_eq!(normalize_url(&once), once);
        }
    }
}
