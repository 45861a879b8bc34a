//! Readability-style main-content extraction for pages without recipe markup.
//!
//! Paragraph-like elements score their parent (and half that for the
//! grandparent); the best-scoring container, discounted by link density, is
//! taken as the article. Navigation chrome is skipped up front.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Candidates with less text than this fall back to `<body>`.
const MIN_ARTICLE_CHARS: usize = 80;

/// Paragraphs shorter than this don't contribute to a container's score.
const MIN_PARAGRAPH_CHARS: usize = 25;

static UNLIKELY_CANDIDATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)comment|nav|footer|header|sidebar|menu|share|social|related|promo|newsletter|cookie|popup|advert|\bads?\b")
        .expect("Invalid unlikely-candidate regex")
});

static POSITIVE_CANDIDATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)article|body|content|entry|main|post|recipe|text")
        .expect("Invalid positive-candidate regex")
});

const SKIPPED_TAGS: &[&str] = &[
    "nav", "footer", "header", "aside", "form", "script", "style", "noscript", "button",
];

const PARAGRAPH_SELECTOR: &str = "p, li, pre, td, blockquote";
const BLOCK_SELECTOR: &str = "h1, h2, h3, h4, p, li, pre, blockquote";

/// Main content of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadableArticle {
    pub title: Option<String>,
    pub text: String,
    pub image: Option<String>,
    pub author: Option<String>,
}

/// Extract the main content. `None` when the page has no readable text.
pub fn extract_article(html: &str) -> Option<ReadableArticle> {
    let document = Html::parse_document(html);

    let text = best_candidate(&document)
        .map(|el| block_text(&el))
        .filter(|t| t.chars().count() >= MIN_ARTICLE_CHARS)
        .or_else(|| body_text(&document))?;

    Some(ReadableArticle {
        title: page_title(&document),
        text,
        image: meta_image(&document),
        author: first_meta(&document, &["meta[name='author']", "meta[property='article:author']"]),
    })
}

fn is_skipped(el: &ElementRef) -> bool {
    if SKIPPED_TAGS.contains(&el.value().name()) {
        return true;
    }
    let class_and_id = format!(
        "{} {}",
        el.value().attr("class").unwrap_or_default(),
        el.value().id().unwrap_or_default()
    );
    UNLIKELY_CANDIDATE_REGEX.is_match(&class_and_id)
        && !POSITIVE_CANDIDATE_REGEX.is_match(&class_and_id)
}

/// True if this element or any ancestor is chrome rather than content.
fn in_skipped_region(el: &ElementRef) -> bool {
    is_skipped(el)
        || el
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| is_skipped(&a))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: &ElementRef) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

fn link_density(el: &ElementRef) -> f64 {
    let total = element_text(el).chars().count();
    if total == 0 {
        return 0.0;
    }
    let Ok(links) = Selector::parse("a") else {
        return 0.0;
    };
    let linked: usize = el
        .select(&links)
        .map(|a| element_text(&a).chars().count())
        .sum();
    linked as f64 / total as f64
}

fn best_candidate(document: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse(PARAGRAPH_SELECTOR).ok()?;
    let mut scores: HashMap<_, (ElementRef, f64)> = HashMap::new();

    for paragraph in document.select(&selector) {
        if in_skipped_region(&paragraph) {
            continue;
        }
        let text = element_text(&paragraph);
        let len = text.chars().count();
        if len < MIN_PARAGRAPH_CHARS {
            continue;
        }

        let score = 1.0 + text.matches(',').count() as f64 + (len as f64 / 100.0).min(3.0);

        let mut ancestors = paragraph.ancestors().filter_map(ElementRef::wrap);
        if let Some(parent) = ancestors.next() {
            scores.entry(parent.id()).or_insert((parent, 0.0)).1 += score;
            if let Some(grandparent) = ancestors.next() {
                scores.entry(grandparent.id()).or_insert((grandparent, 0.0)).1 += score / 2.0;
            }
        }
    }

    scores
        .into_values()
        .filter(|(el, _)| !matches!(el.value().name(), "html" | "body"))
        .map(|(el, score)| {
            let class_and_id = format!(
                "{} {}",
                el.value().attr("class").unwrap_or_default(),
                el.value().id().unwrap_or_default()
            );
            let bonus = if matches!(el.value().name(), "article" | "main")
                || POSITIVE_CANDIDATE_REGEX.is_match(&class_and_id)
            {
                5.0
            } else {
                0.0
            };
            let effective = (score + bonus) * (1.0 - link_density(&el));
            (el, effective)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(el, _)| el)
}

/// Block-level text, one block per line, without duplicating nested blocks.
fn block_text(container: &ElementRef) -> String {
    let Ok(selector) = Selector::parse(BLOCK_SELECTOR) else {
        return element_text(container);
    };
    let blocks: Vec<String> = container
        .select(&selector)
        .filter(|el| !in_skipped_region_below(el, container))
        .filter(|el| !has_block_ancestor_below(el, container))
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
        .collect();

    if blocks.is_empty() {
        element_text(container)
    } else {
        blocks.join("\n")
    }
}

/// Ancestors of `el` strictly inside `container`.
fn ancestors_below<'a>(
    el: &ElementRef<'a>,
    container: &ElementRef<'a>,
) -> impl Iterator<Item = ElementRef<'a>> {
    let container_id = container.id();
    el.ancestors()
        .take_while(move |n| n.id() != container_id)
        .filter_map(ElementRef::wrap)
}

fn in_skipped_region_below<'a>(el: &ElementRef<'a>, container: &ElementRef<'a>) -> bool {
    is_skipped(el) || ancestors_below(el, container).any(|a| is_skipped(&a))
}

fn has_block_ancestor_below<'a>(el: &ElementRef<'a>, container: &ElementRef<'a>) -> bool {
    ancestors_below(el, container)
        .any(|a| matches!(a.value().name(), "p" | "li" | "pre" | "blockquote"))
}

fn body_text(document: &Html) -> Option<String> {
    let selector = Selector::parse("body").ok()?;
    let body = document.select(&selector).next()?;
    let text = block_text(&body);
    (!text.is_empty()).then_some(text)
}

fn first_meta(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|s| {
        let selector = Selector::parse(s).ok()?;
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(str::trim)
            .find(|c| !c.is_empty())
            .map(str::to_string)
    })
}

/// `og:image`, then `twitter:image`.
pub(crate) fn meta_image(document: &Html) -> Option<String> {
    first_meta(
        document,
        &["meta[property='og:image']", "meta[name='twitter:image']"],
    )
}

/// `og:title`, then `<title>` without a trailing site name, then the first `<h1>`.
fn page_title(document: &Html) -> Option<String> {
    if let Some(title) = first_meta(document, &["meta[property='og:title']"]) {
        return Some(title);
    }

    let title_selector = Selector::parse("title").ok()?;
    if let Some(el) = document.select(&title_selector).next() {
        let text = element_text(&el);
        let stripped = text
            .split(" | ")
            .next()
            .and_then(|t| t.split(" - ").next())
            .unwrap_or(&text)
            .trim();
        if !stripped.is_empty() {
            return Some(stripped.to_string());
        }
    }

    let h1 = Selector::parse("h1").ok()?;
    document
        .select(&h1)
        .map(|el| element_text(&el))
        .find(|t| !t.is_empty())
}
