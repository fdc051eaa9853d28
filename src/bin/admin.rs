//! CLI administration tool for url-shortener.
//!
//! Operates on the same database as the server, without going through HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Create missing counter shards (SHARDS_NUMBER, default 100)
//! cargo run --bin admin -- shards init
//!
//! # Print the current counter total
//! cargo run --bin admin -- shards total
//!
//! # Shorten a URL / resolve an id
//! cargo run --bin admin -- url create https://example.com
//! cargo run --bin admin -- url get qW
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server; see [`url_shortener::config`]. `STORE_BACKEND=memory`
//! is refused since an in-process store holds nothing between runs.

use url_shortener::application::services::ShortenerService;
use url_shortener::config::{self, Config, StoreBackend, mask_connection_string};
use url_shortener::domain::repositories::{CounterRepository, UrlRepository};
use url_shortener::server::{build_shortener, connect_pool};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use sqlx::PgPool;

/// CLI tool for managing url-shortener.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Manage counter shards
    Shards {
        #[command(subcommand)]
        action: ShardsAction,
    },

    /// Create or resolve short URLs
    Url {
        #[command(subcommand)]
        action: UrlAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum ShardsAction {
    /// Create missing shards; existing counts are kept
    Init,

    /// Show the counter total
    Total,
}

#[derive(Subcommand)]
enum UrlAction {
    /// Shorten a URL (returns the existing id if already shortened)
    Create {
        /// Absolute http(s) URL
        long_url: String,
    },

    /// Resolve a short id
    Get {
        /// Short id, e.g. "qW"
        id: String,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = config::load_from_env().context("Invalid configuration")?;
    if config.store_backend == StoreBackend::Memory {
        anyhow::bail!("admin needs PostgreSQL; unset STORE_BACKEND=memory");
    }
    let pool = connect_pool(&config).await?;

    match cli.command {
        Commands::Shards { action } => {
            handle_shards_action(action, build_shortener(pool, &config)?, &config).await?
        }
        Commands::Url { action } => {
            handle_url_action(action, build_shortener(pool, &config)?).await?
        }
        Commands::Db { action } => handle_db_action(action, &pool, &config).await?,
    }

    Ok(())
}

/// Dispatches shard commands.
async fn handle_shards_action<U, C>(
    action: ShardsAction,
    shortener: ShortenerService<U, C>,
    config: &Config,
) -> Result<()>
where
    U: UrlRepository + 'static,
    C: CounterRepository<Tx = U::Tx> + 'static,
{
    match action {
        ShardsAction::Init => {
            println!(
                "{} {} shards...",
                "🔧 Initializing".bright_blue().bold(),
                config.shards_number.to_string().bright_white()
            );

            shortener
                .initialize()
                .await
                .context("Failed to initialize shards")?;

            println!("{}", "✅ Shards ready".green().bold());
        }
        ShardsAction::Total => {
            let total = shortener
                .total_count()
                .await
                .context("Failed to read counter")?;

            println!("  Counter total: {}", total.to_string().bright_green().bold());
        }
    }

    Ok(())
}

/// Dispatches URL commands.
async fn handle_url_action<U, C>(action: UrlAction, shortener: ShortenerService<U, C>) -> Result<()>
where
    U: UrlRepository + 'static,
    C: CounterRepository<Tx = U::Tx> + 'static,
{
    match action {
        UrlAction::Create { long_url } => {
            let parsed = url::Url::parse(&long_url).context("Not an absolute URL")?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("Only http and https URLs can be shortened");
            }

            let id = shortener
                .create_short_url(&long_url)
                .await
                .context("Failed to create short URL")?;

            println!("  Long URL: {}", long_url.cyan());
            println!("  Id:       {}", id.bright_yellow().bold());
        }
        UrlAction::Get { id } => match shortener.get_by_short_url(&id).await {
            Ok(mapping) => {
                println!("  Id:       {}", mapping.id.bright_yellow());
                println!("  Long URL: {}", mapping.long_url.cyan());
            }
            Err(e) if e.is_not_found() => {
                println!("{} {}", "❌ No URL for id".red(), id.bright_white());
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to resolve {id}")),
        },
    }

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool, config: &Config) -> Result<()> {
    match action {
        DbAction::Check => {
            println!(
                "{} {}",
                "🔍 Checking database connection to".bright_blue(),
                mask_connection_string(&config.database_url).bright_white()
            );

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            println!("{}", "✅ Database connection OK".green().bold());
            println!("  PostgreSQL: {}", version.bright_white());
        }
        DbAction::Migrate => {
            sqlx::migrate!("./migrations")
                .run(pool)
                .await
                .context("Failed to apply migrations")?;

            println!("{}", "✅ Migrations applied".green().bold());
        }
    }

    Ok(())
}
