use std::error::Error as _;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use std::time::Duration;
use uuid::Uuid;

use mise_core::catalog;
use mise_core::video::format_transcript;
use mise_core::{
    classify as classify_url, create_backend_from_env, create_pool, normalize_url,
    ExtractionOutcome, HttpClient, MemoryStore, PgStore, PipelineError, RecipePipeline,
    RecipeStore, RecipeWriter, SaveOutcome, UrlKind, VideoSource, WebClient,
};

/// Log the full cause chain and turn the error into its one-line user message.
fn report(err: PipelineError) -> anyhow::Error {
    let mut chain = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    tracing::error!(error = %chain.join(": "), "pipeline failed");
    anyhow!(err.user_message())
}

/// Overrides for the HTTP client. Unset flags keep the environment defaults.
#[derive(Args, Debug, Default)]
pub struct HttpArgs {
    /// User agent sent to blog sites
    #[arg(long, global = true)]
    pub user_agent: Option<String>,
    /// Delay between requests to the same host, in milliseconds (0 disables)
    #[arg(long, global = true)]
    pub rate_limit_ms: Option<u64>,
    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
}

fn http_client(args: &HttpArgs) -> Result<Arc<dyn HttpClient>> {
    let mut builder = WebClient::builder();
    if let Some(user_agent) = &args.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }
    if let Some(ms) = args.rate_limit_ms {
        builder = builder.rate_limit_ms(ms);
    }
    if let Some(secs) = args.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder.build().context("Failed to build HTTP client")?;
    Ok(Arc::new(client))
}

fn pg_store() -> Result<PgStore> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = create_pool(&database_url).context("Failed to connect to database")?;
    Ok(PgStore::new(pool))
}

fn pipeline<S: RecipeStore>(store: S, http: &HttpArgs) -> Result<RecipePipeline<S>> {
    let backend = create_backend_from_env().context("Failed to configure AI backend")?;
    Ok(RecipePipeline::new(http_client(http)?, Arc::from(backend), store))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn classify(url: &str) -> Result<()> {
    let kind = classify_url(url).map_err(|e| report(e.into()))?;
    let output = match kind {
        UrlKind::Video { video_id } => serde_json::json!({
            "kind": "video",
            "videoId": video_id,
            "normalizedUrl": normalize_url(url),
        }),
        UrlKind::Blog => serde_json::json!({
            "kind": "blog",
            "normalizedUrl": normalize_url(url),
        }),
    };
    print_json(&output)
}

pub async fn transcript(url: &str, http: &HttpArgs) -> Result<()> {
    let video_id = match classify_url(url).map_err(|e| report(e.into()))? {
        UrlKind::Video { video_id } => video_id,
        UrlKind::Blog => bail!("Not a video URL: {}", url),
    };

    let content = VideoSource::new(http_client(http)?)
        .fetch(&video_id)
        .await
        .map_err(|e| report(e.into()))?;

    eprintln!(
        "{} by {} ({} segments)",
        content.metadata.title,
        content.metadata.author,
        content.transcript_segments.len()
    );
    if content.transcript_segments.is_empty() {
        eprintln!("No captions available");
    } else {
        println!("{}", format_transcript(&content.transcript_segments));
    }
    Ok(())
}

pub async fn extract(url: &str, save: bool, user: Option<Uuid>, http: &HttpArgs) -> Result<()> {
    if !save {
        let pipeline = pipeline(MemoryStore::new(), http)?;
        let extracted = pipeline.extract_only(url).await.map_err(report)?;
        return print_json(&extracted);
    }

    let user_id = user.context("--user is required with --save")?;
    let pipeline = pipeline(pg_store()?, http)?;

    let extracted = match pipeline.extract_from_url(url, user_id).await.map_err(report)? {
        ExtractionOutcome::Existing(existing) => {
            eprintln!("Already saved as \"{}\"", existing.title);
            return print_json(&existing);
        }
        ExtractionOutcome::Extracted(extracted) => extracted,
    };

    print_json(&extracted)?;
    match pipeline.save_extracted(user_id, &extracted).map_err(report)? {
        SaveOutcome::Created(recipe_id) => eprintln!("Saved recipe {}", recipe_id),
        SaveOutcome::Existing(existing) => {
            eprintln!("Already saved as {} (\"{}\")", existing.id, existing.title)
        }
    }
    Ok(())
}

pub fn delete(user_id: Uuid, recipe_id: Uuid) -> Result<()> {
    let store = pg_store()?;
    RecipeWriter::new(&store)
        .delete(user_id, recipe_id)
        .map_err(|e| report(e.into()))?;
    eprintln!("Deleted recipe {}", recipe_id);
    Ok(())
}

pub fn merge_ingredients(source: Uuid, target: Uuid) -> Result<()> {
    let store = pg_store()?;
    let moved = catalog::merge(&store, source, target).map_err(|e| report(e.into()))?;
    eprintln!("Moved {} recipe links from {} to {}", moved, source, target);
    Ok(())
}
