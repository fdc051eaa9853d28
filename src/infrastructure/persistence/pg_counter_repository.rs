//! PostgreSQL implementation of the sharded counter.

use async_trait::async_trait;
use sqlx::PgPool;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::domain::entities::{Shard, checked_total};
use crate::domain::repositories::{CounterRepository, pick_shard};
use crate::error::StoreError;
use crate::infrastructure::persistence::PgTx;

/// PostgreSQL repository for the `shards` table.
///
/// Each shard is one row keyed by its decimal index. Reads and increments run
/// inside the caller's serializable transaction.
pub struct PgCounterRepository {
    pool: Arc<PgPool>,
    shards: NonZeroU32,
}

impl PgCounterRepository {
    /// Creates a new repository spreading increments over `shards` rows.
    pub fn new(pool: Arc<PgPool>, shards: NonZeroU32) -> Self {
        Self { pool, shards }
    }
}

#[async_trait]
impl CounterRepository for PgCounterRepository {
    type Tx = PgTx;

    fn shards(&self) -> u32 {
        self.shards.get()
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO shards (id, count)
            SELECT g::text, 0
            FROM generate_series(0, $1::bigint - 1) AS g
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(i64::from(self.shards.get()))
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StoreError::from_sqlx("initialize shards", e))?;

        tracing::info!(
            shards = self.shards.get(),
            created = result.rows_affected(),
            "Counter shards initialized"
        );

        Ok(())
    }

    async fn increment_one_shard(&self, tx: &mut PgTx) -> Result<u32, StoreError> {
        let index = pick_shard(self.shards.get());

        let result = sqlx::query("UPDATE shards SET count = count + 1 WHERE id = $1")
            .bind(Shard::key(index))
            .execute(&mut **tx)
            .await
            .map_err(|e| StoreError::from_sqlx("increment shard", e))?;

        if result.rows_affected() == 0 {
            tracing::error!(shard = index, "Shard missing, counter not initialized");
            return Err(StoreError::NotFound);
        }

        Ok(index)
    }

    async fn read_total(&self, tx: &mut PgTx) -> Result<u64, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT id, count FROM shards")
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| StoreError::from_sqlx("read shards", e))?;

        let counts = rows
            .into_iter()
            .map(|(id, count)| {
                u64::try_from(count).map_err(|_| StoreError::Deserialization {
                    key: format!("shards/{id}"),
                    reason: format!("negative count {count}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        checked_total(counts).ok_or_else(|| StoreError::Corrupted("shard total overflows u64".into()))
    }
}
