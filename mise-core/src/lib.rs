pub mod ai;
pub mod blog;
pub mod catalog;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod http;
pub mod pipeline;
pub mod store;
pub mod types;
pub mod urls;
pub mod video;
pub mod writer;

pub use ai::{
    create_backend, create_backend_from_env, AiConfig, AiError, ExtractionBackend, FakeBackend,
};
pub use blog::{content_from_html, BlogError, BlogSource};
pub use dedup::DedupGate;
pub use error::{FetchError, PipelineError};
pub use extract::{extract, normalize, ExtractionError, ExtractionSource};
pub use http::{HttpClient, MockClient, MockResponse, RequestProfile, WebClient};
pub use pipeline::{RecipePipeline, SaveOutcome};
pub use store::{create_pool, MemoryStore, PgStore, RecipeStore, StoreError};
pub use types::{
    BlogContent, BlogExtractionMethod, ExistingRecipeSummary, ExtractedFromUrl,
    ExtractedIngredient, ExtractedRecipe, ExtractedStep, ExtractionOutcome, SourceMeta,
    SourceType, TranscriptSegment, VideoContent, VideoMetadata,
};
pub use urls::{classify, normalize_url, UrlError, UrlKind};
pub use video::{VideoError, VideoSource};
pub use writer::RecipeWriter;
