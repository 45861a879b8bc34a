//! Blog content source.
//!
//! Structured `Recipe` markup is preferred. Pages without it go through the
//! readability extractor. There is no third strategy.

mod jsonld;
mod readability;

pub use jsonld::{find_recipe, JsonLdRecipe};
pub use readability::{extract_article, ReadableArticle};

use std::sync::Arc;

use scraper::Html;
use thiserror::Error;

use crate::error::FetchError;
use crate::http::{HttpClient, RequestProfile};
use crate::types::{BlogContent, BlogExtractionMethod};

#[derive(Error, Debug)]
pub enum BlogError {
    #[error("Failed to fetch {url}: {source}")]
    ContentFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("No recipe content found at {url}")]
    NoContent { url: String },
}

/// Fetches a blog page and reduces it to a content block.
#[derive(Clone)]
pub struct BlogSource {
    client: Arc<dyn HttpClient>,
}

impl BlogSource {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, url: &str) -> Result<BlogContent, BlogError> {
        let html = self
            .client
            .get_text(url, RequestProfile::Page)
            .await
            .map_err(|source| BlogError::ContentFetch {
                url: url.to_string(),
                source,
            })?;

        let content = content_from_html(&html).ok_or_else(|| BlogError::NoContent {
            url: url.to_string(),
        })?;

        tracing::info!(
            url,
            method = ?content.method,
            chars = content.content.len(),
            "blog: content extracted"
        );
        Ok(content)
    }
}

/// Run both strategies over already-fetched HTML.
pub fn content_from_html(html: &str) -> Option<BlogContent> {
    // A Recipe node with nothing printable doesn't count as a match.
    if let Some(recipe) = find_recipe(html).filter(|r| !r.content.trim().is_empty()) {
        let thumbnail_url = recipe
            .image
            .or_else(|| readability::meta_image(&Html::parse_document(html)));
        return Some(BlogContent {
            title: recipe.title,
            content: recipe.content,
            thumbnail_url,
            author: recipe.author,
            method: BlogExtractionMethod::JsonLd,
        });
    }

    tracing::debug!("blog: no usable JSON-LD recipe, falling back to readability");
    let article = extract_article(html)?;
    let title = article.title.unwrap_or_default();
    let content = if title.is_empty() {
        article.text
    } else {
        format!("Title: {}\n\n{}", title, article.text)
    };

    Some(BlogContent {
        title,
        content,
        thumbnail_url: article.image,
        author: article.author,
        method: BlogExtractionMethod::Readability,
    })
}
