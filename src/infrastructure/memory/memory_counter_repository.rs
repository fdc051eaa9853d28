//! In-process implementation of the sharded counter.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::num::NonZeroU32;

use crate::domain::entities::{Shard, checked_total};
use crate::domain::repositories::{CounterRepository, pick_shard};
use crate::error::StoreError;
use crate::infrastructure::memory::store::{MemoryStore, MemoryTx, SHARDS};

/// Counter whose shards are `{ "count": n }` documents in a [`MemoryStore`].
pub struct MemoryCounterRepository {
    store: MemoryStore,
    shards: NonZeroU32,
}

impl MemoryCounterRepository {
    pub fn new(store: MemoryStore, shards: NonZeroU32) -> Self {
        Self { store, shards }
    }
}

fn parse_shard(key: &str, doc: &Value) -> Result<Shard, StoreError> {
    Shard::deserialize(doc).map_err(|e| StoreError::Deserialization {
        key: format!("{SHARDS}/{key}"),
        reason: e.to_string(),
    })
}

fn to_document(shard: Shard) -> Value {
    serde_json::json!({ "count": shard.count })
}

#[async_trait]
impl CounterRepository for MemoryCounterRepository {
    type Tx = MemoryTx;

    fn shards(&self) -> u32 {
        self.shards.get()
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        let mut created = 0u32;

        for index in 0..self.shards.get() {
            match self
                .store
                .create(SHARDS, &Shard::key(index), to_document(Shard::default()))
                .await
            {
                Ok(()) => created += 1,
                Err(StoreError::Conflict { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        tracing::info!(shards = self.shards.get(), created, "Counter shards initialized");
        Ok(())
    }

    async fn increment_one_shard(&self, tx: &mut MemoryTx) -> Result<u32, StoreError> {
        let index = pick_shard(self.shards.get());
        let key = Shard::key(index);

        let doc = tx.get(SHARDS, &key).ok_or(StoreError::NotFound)?;
        let mut shard = parse_shard(&key, doc)?;
        shard.count = shard
            .count
            .checked_add(1)
            .ok_or_else(|| StoreError::Corrupted(format!("{SHARDS}/{key} overflows u64")))?;

        tx.replace(SHARDS, &key, to_document(shard))?;
        Ok(index)
    }

    async fn read_total(&self, tx: &mut MemoryTx) -> Result<u64, StoreError> {
        let counts = tx
            .documents(SHARDS)
            .map(|(key, doc)| parse_shard(key, doc).map(|shard| shard.count))
            .collect::<Result<Vec<_>, _>>()?;

        checked_total(counts).ok_or_else(|| StoreError::Corrupted("shard total overflows u64".into()))
    }
}
