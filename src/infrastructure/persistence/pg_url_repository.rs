//! PostgreSQL implementation of the URL repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{NewUrl, UrlMapping};
use crate::domain::repositories::{TxFuture, UrlRepository};
use crate::error::StoreError;
use crate::infrastructure::persistence::{PgTx, RetryPolicy};

/// PostgreSQL repository for the `urls` table and the transactions around it.
///
/// Transactions run at `SERIALIZABLE` isolation, so two creations that read
/// the same shard total cannot both commit. The loser fails with a
/// serialization error and is re-run according to the [`RetryPolicy`].
pub struct PgUrlRepository {
    pool: Arc<PgPool>,
    retry: RetryPolicy,
}

impl PgUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    /// One begin → body → commit round. Dropping `tx` on error rolls it back.
    async fn attempt<T, F>(&self, f: &mut F) -> Result<T, StoreError>
    where
        T: Send,
        F: for<'t> FnMut(&'t mut PgTx) -> TxFuture<'t, T> + Send,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::from_sqlx("begin transaction", e))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::from_sqlx("set isolation level", e))?;

        let value = f(&mut tx).await?;

        tx.commit()
            .await
            .map_err(|e| StoreError::from_sqlx("commit transaction", e))?;

        Ok(value)
    }
}

#[async_trait]
impl UrlRepository for PgUrlRepository {
    type Tx = PgTx;

    async fn insert(&self, tx: &mut PgTx, id: &str, url: &NewUrl) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO urls (id, long_url) VALUES ($1, $2)")
            .bind(id)
            .bind(&url.long_url)
            .execute(&mut **tx)
            .await
            .map_err(|e| StoreError::from_sqlx("insert url", e))?;

        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<UrlMapping, StoreError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT id, long_url FROM urls WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await
                .map_err(|e| StoreError::from_sqlx("get url by id", e))?;

        row.map(|(id, long_url)| UrlMapping::new(id, long_url))
            .ok_or(StoreError::NotFound)
    }

    async fn get_id_by_long_url(&self, long_url: &str) -> Result<String, StoreError> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT id
            FROM urls
            WHERE md5(long_url) = md5($1) AND long_url = $1
            LIMIT 1
            "#,
        )
        .bind(long_url)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| StoreError::from_sqlx("get id by long url", e))?
        .ok_or(StoreError::NotFound)
    }

    async fn run_in_transaction<T, F>(&self, mut f: F) -> Result<T, StoreError>
    where
        T: Send,
        F: for<'t> FnMut(&'t mut PgTx) -> TxFuture<'t, T> + Send,
    {
        let mut delays = self.retry.delays();
        let mut attempt = 1u32;

        loop {
            match self.attempt(&mut f).await {
                Err(e) if e.is_retryable() => {
                    let Some(delay) = delays.next() else {
                        tracing::warn!(attempt, error = %e, "Transaction retries exhausted");
                        return Err(e);
                    };

                    tracing::warn!(attempt, ?delay, error = %e, "Retrying transaction");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
