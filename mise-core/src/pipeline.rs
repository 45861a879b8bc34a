//! Recipe extraction pipeline.
//!
//! `RecipePipeline` is the entry point for the application layer:
//!
//! 1. classify the URL
//! 2. skip everything if the user already saved it
//! 3. fetch content (video metadata + transcript, or a blog page)
//! 4. run the extraction engine
//!
//! Saving is a separate call so the caller can show the extraction first.
//! It re-checks the dedup gate before writing.

use std::sync::Arc;
use uuid::Uuid;

use crate::ai::prompts::render_text_input;
use crate::ai::ExtractionBackend;
use crate::blog::BlogSource;
use crate::catalog;
use crate::dedup::DedupGate;
use crate::error::PipelineError;
use crate::extract::{extract, ExtractionSource};
use crate::http::HttpClient;
use crate::store::RecipeStore;
use crate::types::{ExistingRecipeSummary, ExtractedFromUrl, ExtractionOutcome, SourceMeta, SourceType};
use crate::urls::{canonical_video_url, classify, UrlKind};
use crate::video::{format_transcript, VideoSource};
use crate::writer::RecipeWriter;

/// Result of `RecipePipeline::save_extracted`.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Created(Uuid),
    Existing(ExistingRecipeSummary),
}

pub struct RecipePipeline<S: RecipeStore> {
    video: VideoSource,
    blog: BlogSource,
    backend: Arc<dyn ExtractionBackend>,
    store: S,
}

impl<S: RecipeStore> RecipePipeline<S> {
    pub fn new(client: Arc<dyn HttpClient>, backend: Arc<dyn ExtractionBackend>, store: S) -> Self {
        Self {
            video: VideoSource::new(client.clone()),
            blog: BlogSource::new(client),
            backend,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Extract a recipe from `url` for `user_id`, or return the recipe the
    /// user already saved from the same normalized URL.
    pub async fn extract_from_url(
        &self,
        url: &str,
        user_id: Uuid,
    ) -> Result<ExtractionOutcome, PipelineError> {
        let kind = classify(url)?;

        if let Some(existing) = DedupGate::new(&self.store).find_existing(user_id, url)? {
            return Ok(ExtractionOutcome::Existing(existing));
        }

        let extracted = self.extract_classified(url, kind).await?;
        Ok(ExtractionOutcome::Extracted(extracted))
    }

    /// Extract without consulting the store.
    pub async fn extract_only(&self, url: &str) -> Result<ExtractedFromUrl, PipelineError> {
        let kind = classify(url)?;
        self.extract_classified(url, kind).await
    }

    /// Persist an extraction unless the user saved the same URL meanwhile.
    pub fn save_extracted(
        &self,
        user_id: Uuid,
        extracted: &ExtractedFromUrl,
    ) -> Result<SaveOutcome, PipelineError> {
        let source_url = &extracted.source.source_url;
        if let Some(existing) = DedupGate::new(&self.store).find_existing(user_id, source_url)? {
            return Ok(SaveOutcome::Existing(existing));
        }

        let recipe_id =
            RecipeWriter::new(&self.store).create(user_id, &extracted.recipe, &extracted.source)?;
        Ok(SaveOutcome::Created(recipe_id))
    }

    /// Extract and save in one go.
    pub async fn extract_and_save(
        &self,
        url: &str,
        user_id: Uuid,
    ) -> Result<SaveOutcome, PipelineError> {
        match self.extract_from_url(url, user_id).await? {
            ExtractionOutcome::Existing(existing) => Ok(SaveOutcome::Existing(existing)),
            ExtractionOutcome::Extracted(extracted) => self.save_extracted(user_id, &extracted),
        }
    }

    pub fn delete_recipe(&self, user_id: Uuid, recipe_id: Uuid) -> Result<(), PipelineError> {
        RecipeWriter::new(&self.store).delete(user_id, recipe_id)?;
        Ok(())
    }

    /// Fold a duplicate catalog ingredient into another. Returns links moved.
    pub fn merge_ingredients(&self, source: Uuid, target: Uuid) -> Result<usize, PipelineError> {
        Ok(catalog::merge(&self.store, source, target)?)
    }

    async fn extract_classified(
        &self,
        url: &str,
        kind: UrlKind,
    ) -> Result<ExtractedFromUrl, PipelineError> {
        match kind {
            UrlKind::Video { video_id } => self.extract_video(url, &video_id).await,
            UrlKind::Blog => self.extract_blog(url).await,
        }
    }

    async fn extract_video(
        &self,
        url: &str,
        video_id: &str,
    ) -> Result<ExtractedFromUrl, PipelineError> {
        let (metadata, recipe) = if self.backend.supports_native_video() {
            tracing::info!(video_id, "pipeline: extracting from video directly");
            let metadata = self.video.fetch_metadata(video_id).await?;
            let source = ExtractionSource::NativeVideo {
                video_url: canonical_video_url(video_id),
            };
            let recipe = extract(self.backend.as_ref(), &source, metadata.duration_seconds).await?;
            (metadata, recipe)
        } else {
            tracing::info!(video_id, "pipeline: extracting from transcript");
            let content = self.video.fetch(video_id).await?;
            if content.transcript_segments.is_empty() {
                return Err(PipelineError::NoCaptions {
                    video_id: video_id.to_string(),
                });
            }
            let source = ExtractionSource::Text {
                source_type: SourceType::Youtube,
                content: render_text_input(
                    SourceType::Youtube,
                    &content.metadata.title,
                    Some(&content.metadata.author),
                    &format_transcript(&content.transcript_segments),
                ),
            };
            let recipe =
                extract(self.backend.as_ref(), &source, content.metadata.duration_seconds).await?;
            (content.metadata, recipe)
        };

        Ok(ExtractedFromUrl {
            recipe,
            source: SourceMeta {
                source_url: url.to_string(),
                source_type: SourceType::Youtube,
                youtube_video_id: Some(video_id.to_string()),
                thumbnail_url: non_empty(metadata.thumbnail_url),
                author: non_empty(metadata.author),
            },
        })
    }

    async fn extract_blog(&self, url: &str) -> Result<ExtractedFromUrl, PipelineError> {
        let content = self.blog.fetch(url).await?;
        let source = ExtractionSource::Text {
            source_type: SourceType::Blog,
            content: render_text_input(
                SourceType::Blog,
                &content.title,
                content.author.as_deref(),
                &content.content,
            ),
        };
        let recipe = extract(self.backend.as_ref(), &source, None).await?;

        Ok(ExtractedFromUrl {
            recipe,
            source: SourceMeta {
                source_url: url.to_string(),
                source_type: SourceType::Blog,
                youtube_video_id: None,
                thumbnail_url: content.thumbnail_url,
                author: content.author,
            },
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
