//! In-process implementation of the URL repository.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::entities::{NewUrl, UrlMapping};
use crate::domain::repositories::{TxFuture, UrlRepository};
use crate::error::StoreError;
use crate::infrastructure::memory::store::{MemoryStore, MemoryTx, URLS};

/// URL mappings stored as `{ "long_url": ... }` documents keyed by short id.
///
/// Like the PostgreSQL backend, inserts reject a long URL that is already
/// mapped, so the one-id-per-URL invariant holds here too.
pub struct MemoryUrlRepository {
    store: MemoryStore,
}

impl MemoryUrlRepository {
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }
}

fn parse_url(id: &str, doc: &Value) -> Result<NewUrl, StoreError> {
    NewUrl::deserialize(doc).map_err(|e| StoreError::Deserialization {
        key: format!("{URLS}/{id}"),
        reason: e.to_string(),
    })
}

#[async_trait]
impl UrlRepository for MemoryUrlRepository {
    type Tx = MemoryTx;

    async fn insert(&self, tx: &mut MemoryTx, id: &str, url: &NewUrl) -> Result<(), StoreError> {
        if tx.find_by_field(URLS, "long_url", &url.long_url).is_some() {
            return Err(StoreError::Conflict {
                key: format!("{URLS}.long_url"),
            });
        }

        tx.create(URLS, id, serde_json::json!({ "long_url": url.long_url }))
    }

    async fn get_by_id(&self, id: &str) -> Result<UrlMapping, StoreError> {
        let doc = self.store.get(URLS, id).await.ok_or(StoreError::NotFound)?;
        Ok(parse_url(id, &doc)?.into_mapping(id))
    }

    async fn get_id_by_long_url(&self, long_url: &str) -> Result<String, StoreError> {
        self.store
            .find_by_field(URLS, "long_url", long_url)
            .await
            .map(|(id, _)| id)
            .ok_or(StoreError::NotFound)
    }

    async fn run_in_transaction<T, F>(&self, mut f: F) -> Result<T, StoreError>
    where
        T: Send,
        F: for<'t> FnMut(&'t mut MemoryTx) -> TxFuture<'t, T> + Send,
    {
        let mut tx = self.store.begin().await;
        let value = f(&mut tx).await?;
        tx.commit();
        Ok(value)
    }
}
