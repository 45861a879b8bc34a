mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "mise")]
#[command(about = "Extract recipes from cooking videos and blog posts", long_about = None)]
struct Cli {
    #[command(flatten)]
    http: commands::HttpArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how a URL is classified and its dedup key
    Classify {
        url: String,
    },
    /// Print a video's transcript as timestamped lines
    Transcript {
        /// Video URL
        url: String,
    },
    /// Extract a recipe from a URL and print it as JSON
    Extract {
        url: String,
        /// Save the recipe for this user (requires DATABASE_URL)
        #[arg(long)]
        save: bool,
        /// Owner of the saved recipe
        #[arg(long)]
        user: Option<Uuid>,
    },
    /// Delete a saved recipe (requires DATABASE_URL)
    Delete {
        recipe_id: Uuid,
        /// Owner of the recipe
        #[arg(long)]
        user: Uuid,
    },
    /// Fold a duplicate catalog ingredient into another (requires DATABASE_URL)
    MergeIngredients {
        /// Ingredient to remove
        source: Uuid,
        /// Ingredient that takes over its recipe links
        target: Uuid,
    },
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Classify { url } => commands::classify(&url)?,
        Commands::Transcript { url } => commands::transcript(&url, &cli.http).await?,
        Commands::Extract { url, save, user } => {
            commands::extract(&url, save, user, &cli.http).await?
        }
        Commands::Delete { recipe_id, user } => commands::delete(user, recipe_id)?,
        Commands::MergeIngredients { source, target } => {
            commands::merge_ingredients(source, target)?
        }
    }

    Ok(())
}
