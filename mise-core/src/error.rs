use thiserror::Error;

use crate::blog::BlogError;
use crate::extract::ExtractionError;
use crate::store::StoreError;
use crate::urls::UrlError;
use crate::video::VideoError;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Mock client: {0}")]
    Mock(String),
}

/// Any failure of the extraction pipeline, as seen by the application layer.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidUrl(#[from] UrlError),

    #[error(transparent)]
    Video(#[from] VideoError),

    #[error(transparent)]
    Blog(#[from] BlogError),

    #[error("No captions available for video {video_id}")]
    NoCaptions { video_id: String },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// The one line shown to an end user. Cause chains go to the log instead.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::InvalidUrl(_) => "That doesn't look like a valid recipe URL",
            PipelineError::Video(_) | PipelineError::Blog(_) => {
                "Failed to extract content from URL"
            }
            PipelineError::NoCaptions { .. } => {
                "This video has no captions available, so a recipe can't be extracted from it"
            }
            PipelineError::Extraction(_) => "Failed to extract recipe",
            PipelineError::Store(StoreError::NotFound(_)) => "Recipe not found",
            PipelineError::Store(StoreError::Validation(_)) => {
                "You don't have permission to change that recipe"
            }
            PipelineError::Store(_) => "Failed to save recipe",
        }
    }
}
