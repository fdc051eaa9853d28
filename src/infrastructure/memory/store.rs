//! In-process document store with single-writer transactions.
//!
//! Documents are JSON values grouped into named collections. A transaction
//! holds the store lock for its whole lifetime and stages its writes in a
//! private overlay, which is merged on [`MemoryTx::commit`] and discarded on
//! drop. That makes every transaction trivially serializable.
//!
//! Non-transactional reads also take the lock, so they must never be issued
//! from inside a transaction body.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::StoreError;

/// Collection holding counter shards.
pub const SHARDS: &str = "shards";
/// Collection holding URL mappings.
pub const URLS: &str = "urls";

type Collection = BTreeMap<String, Value>;

#[derive(Debug, Default)]
struct Documents {
    collections: BTreeMap<String, Collection>,
}

impl Documents {
    fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    fn collection_mut(&mut self, name: &str) -> &mut Collection {
        self.collections.entry(name.to_string()).or_default()
    }

    fn create(&mut self, collection: &str, key: &str, doc: Value) -> Result<(), StoreError> {
        let docs = self.collection_mut(collection);
        if docs.contains_key(key) {
            return Err(StoreError::Conflict {
                key: format!("{collection}/{key}"),
            });
        }
        docs.insert(key.to_string(), doc);
        Ok(())
    }

    fn find_by_field(&self, collection: &str, field: &str, value: &str) -> Option<(&String, &Value)> {
        self.collection(collection)?
            .iter()
            .find(|(_, doc)| doc.get(field).and_then(Value::as_str) == Some(value))
    }
}

/// Shared handle to an in-process store. Clones point at the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Documents>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a transaction, waiting for any in-flight one to finish.
    ///
    /// Nothing is copied up front; only documents the transaction writes are
    /// staged.
    pub async fn begin(&self) -> MemoryTx {
        let guard = Arc::clone(&self.inner).lock_owned().await;
        MemoryTx {
            guard,
            writes: BTreeMap::new(),
        }
    }

    /// Reads one document outside any transaction.
    pub async fn get(&self, collection: &str, key: &str) -> Option<Value> {
        let docs = self.inner.lock().await;
        docs.collection(collection)?.get(key).cloned()
    }

    /// Returns the first document whose string `field` equals `value`.
    pub async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Option<(String, Value)> {
        let docs = self.inner.lock().await;
        docs.find_by_field(collection, field, value)
            .map(|(key, doc)| (key.clone(), doc.clone()))
    }

    /// Creates a document outside any transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if `key` already exists.
    pub async fn create(&self, collection: &str, key: &str, doc: Value) -> Result<(), StoreError> {
        self.inner.lock().await.create(collection, key, doc)
    }

    /// Writes a document unconditionally, bypassing every invariant.
    ///
    /// Lets tests plant malformed records.
    pub async fn put(&self, collection: &str, key: &str, doc: Value) {
        self.inner
            .lock()
            .await
            .collection_mut(collection)
            .insert(key.to_string(), doc);
    }

    /// Number of documents in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .await
            .collection(collection)
            .map_or(0, BTreeMap::len)
    }
}

/// Open transaction over a [`MemoryStore`].
///
/// Reads see committed documents with this transaction's writes on top.
pub struct MemoryTx {
    guard: OwnedMutexGuard<Documents>,
    writes: BTreeMap<String, Collection>,
}

impl MemoryTx {
    pub fn get(&self, collection: &str, key: &str) -> Option<&Value> {
        self.writes
            .get(collection)
            .and_then(|staged| staged.get(key))
            .or_else(|| self.guard.collection(collection)?.get(key))
    }

    /// Iterates every document of `collection` as seen by this transaction.
    ///
    /// Committed keys come first in key order, followed by keys created in
    /// this transaction.
    pub fn documents<'a>(
        &'a self,
        collection: &str,
    ) -> impl Iterator<Item = (&'a String, &'a Value)> + use<'a> {
        let committed = self.guard.collection(collection);
        let staged = self.writes.get(collection);

        let existing = committed.into_iter().flatten().map(move |(key, doc)| {
            (key, staged.and_then(|docs| docs.get(key)).unwrap_or(doc))
        });
        let created = staged
            .into_iter()
            .flatten()
            .filter(move |(key, _)| committed.is_none_or(|docs| !docs.contains_key(*key)));

        existing.chain(created)
    }

    pub fn find_by_field(&self, collection: &str, field: &str, value: &str) -> Option<&String> {
        self.documents(collection)
            .find(|(_, doc)| doc.get(field).and_then(Value::as_str) == Some(value))
            .map(|(key, _)| key)
    }

    /// Stages a new document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if `key` already exists.
    pub fn create(&mut self, collection: &str, key: &str, doc: Value) -> Result<(), StoreError> {
        if self.get(collection, key).is_some() {
            return Err(StoreError::Conflict {
                key: format!("{collection}/{key}"),
            });
        }
        self.stage(collection, key, doc);
        Ok(())
    }

    /// Replaces an existing document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `key` does not exist.
    pub fn replace(&mut self, collection: &str, key: &str, doc: Value) -> Result<(), StoreError> {
        if self.get(collection, key).is_none() {
            return Err(StoreError::NotFound);
        }
        self.stage(collection, key, doc);
        Ok(())
    }

    fn stage(&mut self, collection: &str, key: &str, doc: Value) {
        self.writes
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), doc);
    }

    /// Publishes every staged write and releases the store.
    pub fn commit(self) {
        let Self { mut guard, writes } = self;
        for (collection, docs) in writes {
            guard.collection_mut(&collection).extend(docs);
        }
    }
}
