//! Short id assignment and resolution service.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::entities::{NewUrl, UrlMapping};
use crate::domain::repositories::{CounterRepository, UrlRepository};
use crate::error::{AppError, StoreError};
use crate::utils::base62;

/// Creation attempts before a persistent conflict is surfaced.
pub const MAX_CREATE_ATTEMPTS: u32 = 3;

/// Operations the HTTP layer needs from the shortener.
///
/// Object-safe so handlers can hold `Arc<dyn Shortener>` regardless of the
/// storage backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Shortener: Send + Sync {
    /// Returns the id for `long_url`, assigning a new one if needed.
    async fn create_short_url(&self, long_url: &str) -> Result<String, AppError>;

    /// Resolves `id` to its mapping.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if `id` was never issued.
    async fn get_by_short_url(&self, id: &str) -> Result<UrlMapping, AppError>;

    /// Current total of the sharded counter.
    async fn total_count(&self) -> Result<u64, AppError>;
}

/// Assigns ids from the sharded counter and persists mappings.
///
/// # Flow
///
/// 1. Look up an existing id for the long URL (no transaction)
/// 2. On a miss, in one transaction: read the shard total, increment one
///    shard, encode `total + 1`, insert the mapping
/// 3. Commit, or roll back everything on the first failure
///
/// The store's isolation guarantees no two committed creations observe the
/// same total. If a concurrent request maps the same long URL first, the
/// insert conflicts and the flow restarts at step 1, returning the winner's id.
///
/// Every public operation runs under `deadline`; when it elapses the
/// in-flight transaction is dropped and rolled back.
pub struct ShortenerService<U, C> {
    urls: Arc<U>,
    counter: Arc<C>,
    deadline: Duration,
}

impl<U, C> ShortenerService<U, C>
where
    U: UrlRepository + 'static,
    C: CounterRepository<Tx = U::Tx> + 'static,
{
    /// Creates a new shortener service.
    pub fn new(urls: Arc<U>, counter: Arc<C>, deadline: Duration) -> Self {
        Self {
            urls,
            counter,
            deadline,
        }
    }

    /// Ensures all counter shards exist. Idempotent.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        self.counter.initialize().await
    }

    /// Returns the id for `long_url`, creating the mapping on first use.
    ///
    /// Repeated calls with the same URL return the same id and consume the
    /// counter only once.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DeadlineExceeded`] if the deadline elapses
    /// - [`StoreError::Conflict`] if every attempt lost an insert race
    /// - Any store error raised while reading, incrementing or inserting
    pub async fn create_short_url(&self, long_url: &str) -> Result<String, StoreError> {
        self.with_deadline(self.lookup_or_assign(long_url)).await
    }

    /// Resolves `id` to its mapping.
    ///
    /// Ids that are not canonical base-62 are reported missing without a
    /// store round trip.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if absent.
    pub async fn get_by_short_url(&self, id: &str) -> Result<UrlMapping, StoreError> {
        if base62::decode(id).is_none() {
            return Err(StoreError::NotFound);
        }

        self.with_deadline(self.urls.get_by_id(id)).await
    }

    /// Reads the counter total in its own transaction.
    pub async fn total_count(&self) -> Result<u64, StoreError> {
        let counter = Arc::clone(&self.counter);

        self.with_deadline(self.urls.run_in_transaction(move |tx| {
            let counter = Arc::clone(&counter);
            Box::pin(async move { counter.read_total(tx).await })
        }))
        .await
    }

    async fn lookup_or_assign(&self, long_url: &str) -> Result<String, StoreError> {
        let mut attempt = 1;

        loop {
            match self.urls.get_id_by_long_url(long_url).await {
                Ok(id) => {
                    tracing::debug!(%id, "Long URL already shortened");
                    return Ok(id);
                }
                Err(StoreError::NotFound) => {}
                Err(e) => return Err(e),
            }

            match self.assign_new_id(long_url).await {
                Err(e) if e.is_conflict() && attempt < MAX_CREATE_ATTEMPTS => {
                    tracing::warn!(attempt, error = %e, "Id assignment conflicted, looking up again");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn assign_new_id(&self, long_url: &str) -> Result<String, StoreError> {
        let urls = Arc::clone(&self.urls);
        let counter = Arc::clone(&self.counter);
        let long_url = long_url.to_owned();

        let (id, total) = self
            .urls
            .run_in_transaction(move |tx| {
                Box::pin(assign_in_transaction(
                    Arc::clone(&urls),
                    Arc::clone(&counter),
                    tx,
                    long_url.clone(),
                ))
            })
            .await?;

        tracing::info!(%id, total, "Assigned new short id");
        Ok(id)
    }

    async fn with_deadline<T>(
        &self,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.deadline, operation).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(deadline = ?self.deadline, "Store deadline exceeded");
                Err(StoreError::DeadlineExceeded)
            }
        }
    }
}

/// Transaction body: read total → increment a shard → encode → insert.
///
/// A total whose encoding is reserved is consumed without a mapping and the
/// counter is incremented again, so the shard sum still equals the last
/// value used.
async fn assign_in_transaction<U, C>(
    urls: Arc<U>,
    counter: Arc<C>,
    tx: &mut U::Tx,
    long_url: String,
) -> Result<(String, u64), StoreError>
where
    U: UrlRepository,
    C: CounterRepository<Tx = U::Tx>,
{
    let mut next = counter.read_total(tx).await?;

    let id = loop {
        let shard = counter.increment_one_shard(tx).await?;
        next = next
            .checked_add(1)
            .ok_or_else(|| StoreError::Corrupted("counter exhausted".into()))?;
        tracing::debug!(shard, total = next, "Shard incremented");

        let id = base62::encode(next);
        if !base62::is_reserved(&id) {
            break id;
        }
        tracing::info!(%id, total = next, "Skipping reserved id");
    };

    urls.insert(tx, &id, &NewUrl::new(long_url)).await?;

    Ok((id, next))
}

#[async_trait]
impl<U, C> Shortener for ShortenerService<U, C>
where
    U: UrlRepository + 'static,
    C: CounterRepository<Tx = U::Tx> + 'static,
{
    async fn create_short_url(&self, long_url: &str) -> Result<String, AppError> {
        Ok(ShortenerService::create_short_url(self, long_url).await?)
    }

    async fn get_by_short_url(&self, id: &str) -> Result<UrlMapping, AppError> {
        ShortenerService::get_by_short_url(self, id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AppError::not_found(
                    "URL does not exist",
                    serde_json::json!({ "short_url": id }),
                ),
                other => other.into(),
            })
    }

    async fn total_count(&self) -> Result<u64, AppError> {
        Ok(ShortenerService::total_count(self).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::store::{SHARDS, URLS};
    use crate::infrastructure::memory::{MemoryCounterRepository, MemoryStore, MemoryUrlRepository};
    use serde_json::json;
    use std::collections::HashSet;
    use std::num::NonZeroU32;

    type MemoryShortener = ShortenerService<MemoryUrlRepository, MemoryCounterRepository>;

    fn service_with(store: &MemoryStore, shards: u32, deadline: Duration) -> MemoryShortener {
        ShortenerService::new(
            Arc::new(MemoryUrlRepository::new(store.clone())),
            Arc::new(MemoryCounterRepository::new(
                store.clone(),
                NonZeroU32::new(shards).unwrap(),
            )),
            deadline,
        )
    }

    async fn initialized(store: &MemoryStore, shards: u32) -> MemoryShortener {
        let service = service_with(store, shards, Duration::from_secs(5));
        service.initialize().await.unwrap();
        service
    }

    #[tokio::test]
    async fn test_first_id_encodes_one() {
        let store = MemoryStore::new();
        let service = initialized(&store, 10).await;

        let id = service.create_short_url("https://example.com").await.unwrap();

        assert_eq!(id, "1");
        assert_eq!(service.total_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_existing_mapping_short_circuits() {
        let store = MemoryStore::new();
        let service = initialized(&store, 10).await;
        store.put(URLS, "short-url", json!({ "long_url": "long-url" })).await;

        let id = service.create_short_url("long-url").await.unwrap();

        assert_eq!(id, "short-url");
        assert_eq!(service.total_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_next_id_continues_from_existing_total() {
        let store = MemoryStore::new();
        let service = initialized(&store, 3).await;
        store.put(SHARDS, "0", json!({ "count": 1000 })).await;
        store.put(SHARDS, "2", json!({ "count": 2255 })).await;

        let id = service.create_short_url("https://example.com").await.unwrap();

        assert_eq!(id, base62::encode(3256));
        assert_eq!(id, "qW");
    }

    #[tokio::test]
    async fn test_reserved_id_is_skipped() {
        let store = MemoryStore::new();
        let service = initialized(&store, 1).await;
        let reserved = base62::decode("health").unwrap();
        store.put(SHARDS, "0", json!({ "count": reserved - 1 })).await;

        let id = service.create_short_url("https://example.com").await.unwrap();

        assert_eq!(id, base62::encode(reserved + 1));
        assert_eq!(service.total_count().await.unwrap(), reserved + 1);
        assert!(store.get(URLS, "health").await.is_none());
    }

    #[tokio::test]
    async fn test_read_total_failure_persists_nothing() {
        let store = MemoryStore::new();
        let service = initialized(&store, 2).await;
        store.put(SHARDS, "1", json!({ "count": -3 })).await;

        let err = service
            .create_short_url("https://example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Deserialization { .. }));
        assert_eq!(store.len(URLS).await, 0);
        assert_eq!(store.get(SHARDS, "0").await, Some(json!({ "count": 0 })));
    }

    #[tokio::test]
    async fn test_increment_failure_persists_nothing() {
        let store = MemoryStore::new();
        // Shards were never initialized, so the chosen shard is missing.
        let service = service_with(&store, 1, Duration::from_secs(5));

        let err = service
            .create_short_url("https://example.com")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(store.len(URLS).await, 0);
        assert_eq!(store.len(SHARDS).await, 0);
    }

    #[tokio::test]
    async fn test_insert_conflict_rolls_back_increment() {
        let store = MemoryStore::new();
        let service = initialized(&store, 1).await;
        store.put(URLS, "1", json!({ "long_url": "https://squatter.example" })).await;

        let err = service
            .create_short_url("https://example.com")
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(service.total_count().await.unwrap(), 0);
        assert_eq!(store.len(URLS).await, 1);
    }

    #[tokio::test]
    async fn test_get_rejects_non_base62_id_without_store() {
        let store = MemoryStore::new();
        let service = initialized(&store, 1).await;
        store.put(URLS, "not-an-id", json!({ "long_url": "https://x.example" })).await;

        let err = service.get_by_short_url("not-an-id").await.unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_deadline_exceeded_while_store_is_held() {
        let store = MemoryStore::new();
        let service = service_with(&store, 1, Duration::from_millis(50));
        service.initialize().await.unwrap();

        let held = store.begin().await;
        let err = service
            .create_short_url("https://slow.example")
            .await
            .unwrap_err();
        drop(held);

        assert!(matches!(err, StoreError::DeadlineExceeded));
        assert_eq!(store.len(URLS).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_url_converges_on_one_id() {
        let store = MemoryStore::new();
        let service = Arc::new(initialized(&store, 4).await);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.create_short_url("https://same.example").await })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap().unwrap());
        }

        assert_eq!(ids.len(), 1);
        assert_eq!(service.total_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_trait_maps_not_found() {
        let store = MemoryStore::new();
        let service: Arc<dyn Shortener> = Arc::new(initialized(&store, 1).await);

        let err = service.get_by_short_url("zz").await.unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
    }
}
