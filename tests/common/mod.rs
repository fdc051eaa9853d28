#![allow(dead_code)]

use axum::Router;
use sqlx::PgPool;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use url_shortener::api::routes::routes;
use url_shortener::application::services::ShortenerService;
use url_shortener::infrastructure::memory::{
    MemoryCounterRepository, MemoryStore, MemoryUrlRepository,
};
use url_shortener::infrastructure::persistence::{
    PgCounterRepository, PgUrlRepository, RetryPolicy,
};
use url_shortener::state::AppState;

pub type MemoryShortener = ShortenerService<MemoryUrlRepository, MemoryCounterRepository>;
pub type PgShortener = ShortenerService<PgUrlRepository, PgCounterRepository>;

pub const DEADLINE: Duration = Duration::from_secs(5);

pub fn shards(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap()
}

/// Memory-backed shortener over `store`; shards are not created yet.
pub fn memory_shortener(store: &MemoryStore, n: u32) -> MemoryShortener {
    ShortenerService::new(
        Arc::new(MemoryUrlRepository::new(store.clone())),
        Arc::new(MemoryCounterRepository::new(store.clone(), shards(n))),
        DEADLINE,
    )
}

pub async fn initialized_memory_shortener(store: &MemoryStore, n: u32) -> MemoryShortener {
    let shortener = memory_shortener(store, n);
    shortener.initialize().await.unwrap();
    shortener
}

pub fn pg_shortener(pool: PgPool, n: u32) -> PgShortener {
    let pool = Arc::new(pool);
    ShortenerService::new(
        Arc::new(PgUrlRepository::new(
            pool.clone(),
            RetryPolicy::new(20, Duration::from_millis(5)),
        )),
        Arc::new(PgCounterRepository::new(pool, shards(n))),
        Duration::from_secs(30),
    )
}

pub async fn initialized_pg_shortener(pool: PgPool, n: u32) -> PgShortener {
    let shortener = pg_shortener(pool, n);
    shortener.initialize().await.unwrap();
    shortener
}

/// Router with every public route, backed by an initialized memory store.
pub async fn create_test_app(store: &MemoryStore) -> Router {
    let shortener = initialized_memory_shortener(store, 10).await;
    routes().with_state(AppState::new(Arc::new(shortener)))
}

pub async fn insert_url(pool: &PgPool, id: &str, long_url: &str) {
    sqlx::query("INSERT INTO urls (id, long_url) VALUES ($1, $2)")
        .bind(id)
        .bind(long_url)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn set_shard(pool: &PgPool, id: &str, count: i64) {
    sqlx::query(
        "INSERT INTO shards (id, count) VALUES ($1, $2) ON CONFLICT (id) DO UPDATE SET count = $2",
    )
    .bind(id)
    .bind(count)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn shard_sum(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COALESCE(SUM(count), 0)::BIGINT FROM shards")
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn url_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM urls")
        .fetch_one(pool)
        .await
        .unwrap()
}
