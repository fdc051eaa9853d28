//! HTTP server initialization and runtime setup.
//!
//! Handles backend selection, the database pool, migrations, counter
//! initialization and the Axum server lifecycle.

use crate::application::services::{Shortener, ShortenerService};
use crate::config::{Config, StoreBackend};
use crate::infrastructure::memory::{MemoryCounterRepository, MemoryStore, MemoryUrlRepository};
use crate::infrastructure::persistence::{PgCounterRepository, PgUrlRepository};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, lookup_host};
use tokio::sync::Notify;

/// Longest time in-flight requests may take to finish after a shutdown signal.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens a PostgreSQL pool using the pool settings from `config`.
///
/// # Errors
///
/// Returns an error if no connection can be established.
pub async fn connect_pool(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    Ok(pool)
}

/// Builds the PostgreSQL-backed shortener described by `config`.
pub fn build_shortener(
    pool: PgPool,
    config: &Config,
) -> Result<ShortenerService<PgUrlRepository, PgCounterRepository>> {
    let pool = Arc::new(pool);
    let urls = Arc::new(PgUrlRepository::new(pool.clone(), config.retry_policy()));
    let counter = Arc::new(PgCounterRepository::new(pool, config.shards()?));

    Ok(ShortenerService::new(urls, counter, config.request_timeout()))
}

/// Builds a shortener over a fresh in-process store.
pub fn build_memory_shortener(
    config: &Config,
) -> Result<ShortenerService<MemoryUrlRepository, MemoryCounterRepository>> {
    let store = MemoryStore::new();
    let urls = Arc::new(MemoryUrlRepository::new(store.clone()));
    let counter = Arc::new(MemoryCounterRepository::new(store, config.shards()?));

    Ok(ShortenerService::new(urls, counter, config.request_timeout()))
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes, in order:
/// - The store selected by `STORE_BACKEND` (for PostgreSQL: pool, then migrations)
/// - Counter shards (`SHARDS_NUMBER`)
/// - Axum HTTP server
///
/// On SIGINT, SIGTERM or SIGQUIT the listener stops accepting connections
/// and in-flight requests get [`SHUTDOWN_TIMEOUT`] to complete.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Shard initialization fails
/// - Signal handlers cannot be installed
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let shortener = match config.store_backend {
        StoreBackend::Postgres => open_postgres(&config).await?,
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; mappings are lost on exit");
            open_memory(&config).await?
        }
    };

    let app = app_router(AppState::new(shortener));

    let mut signals = ShutdownSignal::install().context("Failed to install signal handlers")?;

    let addr: SocketAddr = lookup_host(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to resolve {}", config.listen_addr))?
        .next()
        .with_context(|| format!("{} resolved to no address", config.listen_addr))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{addr}");

    let stop = Arc::new(Notify::new());
    let stopped = stop.clone();
    let server = axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(async move { stopped.notified().await })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result.context("Server error"),
        signal = signals.recv() => {
            tracing::info!(signal, "Shutdown signal received, draining connections");
        }
    }

    stop.notify_one();

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(result) => result.context("Server error")?,
        Err(_) => tracing::warn!(
            timeout = ?SHUTDOWN_TIMEOUT,
            "Connections still open after drain limit, exiting"
        ),
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn open_postgres(config: &Config) -> Result<Arc<dyn Shortener>> {
    let pool = connect_pool(config).await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to apply migrations")?;

    let shortener = build_shortener(pool, config)?;
    shortener
        .initialize()
        .await
        .context("Failed to initialize counter shards")?;

    Ok(Arc::new(shortener))
}

async fn open_memory(config: &Config) -> Result<Arc<dyn Shortener>> {
    let shortener = build_memory_shortener(config)?;
    shortener
        .initialize()
        .await
        .context("Failed to initialize counter shards")?;

    Ok(Arc::new(shortener))
}

/// Process signals that trigger a graceful shutdown.
///
/// Handlers are registered by [`ShutdownSignal::install`], so a signal that
/// arrives before [`ShutdownSignal::recv`] is polled is still observed.
pub struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(unix)]
    quit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignal {
    /// Registers handlers for SIGINT, SIGTERM and SIGQUIT.
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            quit: signal(SignalKind::quit())?,
        })
    }

    /// Waits for the next shutdown signal and returns its name.
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.quit.recv() => "SIGQUIT",
        }
    }
}

#[cfg(not(unix))]
impl ShutdownSignal {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Waits for Ctrl+C.
    pub async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        "Ctrl+C"
    }
}
