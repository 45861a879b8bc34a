//! Video content source.
//!
//! Metadata comes from the platform's public oEmbed endpoint. The transcript
//! is best-effort: the watch page's embedded player response advertises the
//! caption tracks, and the chosen track's XML is parsed into segments. A video
//! without captions yields an empty transcript, never an error.

mod captions;
mod player;
mod transcript;

pub use captions::parse_caption_xml;
pub use player::{choose_track, parse_player_response, CaptionTrack, PlayerInfo};
pub use transcript::{format_timestamp, format_transcript, parse_timestamp};

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::error::FetchError;
use crate::http::{HttpClient, RequestProfile};
use crate::types::{TranscriptSegment, VideoContent, VideoMetadata};
use crate::urls::canonical_video_url;

const OEMBED_ENDPOINT: &str = "https://www.youtube.com/oembed";
const WATCH_ENDPOINT: &str = "https://www.youtube.com/watch";

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to fetch metadata for video {video_id}: {source}")]
    MetadataFetch {
        video_id: String,
        #[source]
        source: FetchError,
    },

    #[error("Invalid metadata for video {video_id}: {message}")]
    MetadataInvalid { video_id: String, message: String },

    #[error("Failed to fetch transcript for video {video_id}: {source}")]
    TranscriptFetch {
        video_id: String,
        #[source]
        source: FetchError,
    },
}

#[derive(Deserialize)]
struct OEmbedResponse {
    title: String,
    #[serde(default)]
    author_name: String,
    #[serde(default)]
    thumbnail_url: String,
}

/// Public oEmbed endpoint for a video, e.g.
/// `https://www.youtube.com/oembed?url=https%3A%2F%2Fyoutube.com%2Fwatch%3Fv%3Dabc&format=json`.
pub fn oembed_url(video_id: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("url", &canonical_video_url(video_id))
        .append_pair("format", "json")
        .finish();
    format!("{}?{}", OEMBED_ENDPOINT, query)
}

/// Watch page whose HTML embeds the player response.
pub fn watch_page_url(video_id: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("v", video_id)
        .finish();
    format!("{}?{}", WATCH_ENDPOINT, query)
}

/// Fetches metadata and captions for one video.
#[derive(Clone)]
pub struct VideoSource {
    client: Arc<dyn HttpClient>,
}

impl VideoSource {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    /// Metadata and transcript, fetched concurrently.
    ///
    /// Fails if metadata can't be fetched or a transcript request fails.
    /// A missing player response or a video without caption tracks gives an
    /// empty `transcript_segments`.
    pub async fn fetch(&self, video_id: &str) -> Result<VideoContent, VideoError> {
        tracing::debug!(video_id, "video: fetching metadata and transcript");

        let (metadata, transcript) =
            tokio::join!(self.fetch_oembed(video_id), self.fetch_transcript(video_id));

        let mut metadata = metadata?;
        let (segments, length_seconds) = transcript?;
        metadata.duration_seconds = length_seconds;

        if segments.is_empty() {
            tracing::warn!(video_id, "video: no captions available");
        } else {
            tracing::info!(video_id, segments = segments.len(), "video: transcript fetched");
        }

        Ok(VideoContent {
            video_id: video_id.to_string(),
            metadata,
            transcript_segments: segments,
        })
    }

    /// Metadata plus video length, without downloading the caption track.
    ///
    /// Used when the backend watches the video itself. The watch page is still
    /// read for the length so step timestamps can be range-checked, but a
    /// failure there only costs the length.
    pub async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata, VideoError> {
        let watch_url = watch_page_url(video_id);
        let (metadata, page) = tokio::join!(
            self.fetch_oembed(video_id),
            self.client.get_text(&watch_url, RequestProfile::Browser)
        );

        let mut metadata = metadata?;
        match page {
            Ok(html) => {
                metadata.duration_seconds =
                    parse_player_response(&html).and_then(|info| info.length_seconds);
            }
            Err(e) => {
                tracing::warn!(video_id, error = %e, "video: watch page unavailable, length unknown");
            }
        }
        Ok(metadata)
    }

    async fn fetch_oembed(&self, video_id: &str) -> Result<VideoMetadata, VideoError> {
        let body = self
            .client
            .get_text(&oembed_url(video_id), RequestProfile::Api)
            .await
            .map_err(|source| VideoError::MetadataFetch {
                video_id: video_id.to_string(),
                source,
            })?;

        let oembed: OEmbedResponse =
            serde_json::from_str(&body).map_err(|e| VideoError::MetadataInvalid {
                video_id: video_id.to_string(),
                message: e.to_string(),
            })?;

        Ok(VideoMetadata {
            title: oembed.title,
            author: oembed.author_name,
            thumbnail_url: oembed.thumbnail_url,
            duration_seconds: None,
        })
    }

    async fn fetch_transcript(
        &self,
        video_id: &str,
    ) -> Result<(Vec<TranscriptSegment>, Option<u32>), VideoError> {
        let transcript_err = |source: FetchError| VideoError::TranscriptFetch {
            video_id: video_id.to_string(),
            source,
        };

        let html = self
            .client
            .get_text(&watch_page_url(video_id), RequestProfile::Browser)
            .await
            .map_err(transcript_err)?;

        let Some(info) = parse_player_response(&html) else {
            tracing::warn!(video_id, "video: player response not found in watch page");
            return Ok((Vec::new(), None));
        };

        let Some(track) = choose_track(&info.caption_tracks) else {
            tracing::debug!(video_id, "video: no caption tracks");
            return Ok((Vec::new(), info.length_seconds));
        };

        tracing::debug!(
            video_id,
            language = %track.language_code,
            kind = ?track.kind,
            "video: fetching caption track"
        );

        let xml = self
            .client
            .get_text(&track.base_url, RequestProfile::Browser)
            .await
            .map_err(transcript_err)?;

        Ok((parse_caption_xml(&xml), info.length_seconds))
    }
}
