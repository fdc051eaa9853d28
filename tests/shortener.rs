mod common;

use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use url_shortener::infrastructure::memory::MemoryStore;
use url_shortener::infrastructure::memory::store::{SHARDS, URLS};
use url_shortener::utils::base62;

#[tokio::test]
async fn test_create_then_get_round_trip() {
    let store = MemoryStore::new();
    let shortener = common::initialized_memory_shortener(&store, 10).await;

    let id = shortener
        .create_short_url("https://example.com/a/b?c=d")
        .await
        .unwrap();
    let mapping = shortener.get_by_short_url(&id).await.unwrap();

    assert_eq!(mapping.id, id);
    assert_eq!(mapping.long_url, "https://example.com/a/b?c=d");
}

#[tokio::test]
async fn test_create_is_idempotent() {
    let store = MemoryStore::new();
    let shortener = common::initialized_memory_shortener(&store, 10).await;

    let first = shortener.create_short_url("https://example.com").await.unwrap();
    let second = shortener.create_short_url("https://example.com").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(shortener.total_count().await.unwrap(), 1);
    assert_eq!(store.len(URLS).await, 1);
}

#[tokio::test]
async fn test_sequential_creations_use_contiguous_totals() {
    let store = MemoryStore::new();
    let shortener = common::initialized_memory_shortener(&store, 7).await;
    let start = shortener.total_count().await.unwrap();

    let mut ids = Vec::new();
    for i in 0..50 {
        let id = shortener
            .create_short_url(&format!("https://example.com/{i}"))
            .await
            .unwrap();
        ids.push(id);
    }

    let expected: Vec<_> = (start + 1..=start + 50).map(base62::encode).collect();
    assert_eq!(ids, expected);
    assert_eq!(shortener.total_count().await.unwrap(), start + 50);
}

#[tokio::test]
async fn test_get_unknown_id_is_not_found() {
    let store = MemoryStore::new();
    let shortener = common::initialized_memory_shortener(&store, 3).await;
    shortener.create_short_url("https://example.com").await.unwrap();

    for id in ["2", "zzz", "", "0abc", "bad-id"] {
        let err = shortener.get_by_short_url(id).await.unwrap_err();
        assert!(err.is_not_found(), "{id:?} should be missing");
    }
}

#[tokio::test]
async fn test_initialize_twice_keeps_counts() {
    let store = MemoryStore::new();
    let shortener = common::initialized_memory_shortener(&store, 4).await;
    shortener.create_short_url("https://example.com").await.unwrap();

    shortener.initialize().await.unwrap();

    assert_eq!(store.len(SHARDS).await, 4);
    assert_eq!(shortener.total_count().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_urls_get_distinct_ids() {
    let store = MemoryStore::new();
    let shortener = Arc::new(common::initialized_memory_shortener(&store, 5).await);

    let handles: Vec<_> = (0..64)
        .map(|i| {
            let shortener = Arc::clone(&shortener);
            tokio::spawn(async move {
                shortener
                    .create_short_url(&format!("https://example.com/{i}"))
                    .await
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap());
    }

    assert_eq!(ids.len(), 64);
    assert_eq!(shortener.total_count().await.unwrap(), 64);

    let expected: HashSet<_> = (1..=64).map(base62::encode).collect();
    assert_eq!(ids, expected);
}

#[sqlx::test]
async fn test_pg_round_trip_and_idempotence(pool: PgPool) {
    let shortener = common::initialized_pg_shortener(pool.clone(), 10).await;

    let id = shortener.create_short_url("https://example.com").await.unwrap();
    let again = shortener.create_short_url("https://example.com").await.unwrap();

    assert_eq!(id, "1");
    assert_eq!(again, id);
    assert_eq!(
        shortener.get_by_short_url(&id).await.unwrap().long_url,
        "https://example.com"
    );
    assert_eq!(common::shard_sum(&pool).await, 1);
}

#[sqlx::test]
async fn test_pg_continues_from_existing_total(pool: PgPool) {
    let shortener = common::initialized_pg_shortener(pool.clone(), 3).await;
    common::set_shard(&pool, "0", 1000).await;
    common::set_shard(&pool, "2", 2255).await;

    let id = shortener.create_short_url("https://example.com").await.unwrap();

    assert_eq!(id, "qW");
    assert_eq!(shortener.total_count().await.unwrap(), 3256);
}

#[sqlx::test]
async fn test_pg_conflicting_insert_rolls_back_increment(pool: PgPool) {
    let shortener = common::initialized_pg_shortener(pool.clone(), 1).await;
    common::insert_url(&pool, "1", "https://squatter.example").await;

    let err = shortener
        .create_short_url("https://example.com")
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(common::shard_sum(&pool).await, 0);
    assert_eq!(common::url_count(&pool).await, 1);
}

#[sqlx::test]
async fn test_pg_concurrent_creations(pool: PgPool) {
    let shortener = Arc::new(common::initialized_pg_shortener(pool.clone(), 4).await);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let shortener = Arc::clone(&shortener);
            tokio::spawn(async move {
                shortener
                    .create_short_url(&format!("https://example.com/{i}"))
                    .await
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap());
    }

    assert_eq!(ids.len(), 8);
    assert_eq!(common::shard_sum(&pool).await, 8);
    assert_eq!(common::url_count(&pool).await, 8);
}

#[sqlx::test]
async fn test_pg_concurrent_same_url_converges(pool: PgPool) {
    let shortener = Arc::new(common::initialized_pg_shortener(pool.clone(), 4).await);

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let shortener = Arc::clone(&shortener);
            tokio::spawn(async move { shortener.create_short_url("https://same.example").await })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap());
    }

    assert_eq!(ids.len(), 1);
    assert_eq!(common::url_count(&pool).await, 1);
    assert_eq!(common::shard_sum(&pool).await, 1);
}
