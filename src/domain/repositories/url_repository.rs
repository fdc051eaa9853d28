//! Repository trait for short id → long URL mappings.

use std::future::Future;
use std::pin::Pin;

use crate::domain::entities::{NewUrl, UrlMapping};
use crate::error::StoreError;
use async_trait::async_trait;

/// Future returned by a transaction body; it borrows the transaction handle.
pub type TxFuture<'t, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 't>>;

/// Repository interface for URL mappings and the transactions that create them.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgUrlRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::memory::MemoryUrlRepository`] - In-process implementation
///
/// # Examples
///
/// See integration tests: `tests/repository_url.rs`
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// Transaction handle passed to transaction bodies.
    type Tx: Send;

    /// Creates the mapping keyed by `id` inside `tx`.
    ///
    /// Create-if-absent: an existing record is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if `id` already exists, or if the
    /// backend enforces long URL uniqueness and `url.long_url` is taken.
    async fn insert(&self, tx: &mut Self::Tx, id: &str, url: &NewUrl) -> Result<(), StoreError>;

    /// Fetches the mapping stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if absent, [`StoreError::Deserialization`]
    /// for a malformed record, or a backend error.
    async fn get_by_id(&self, id: &str) -> Result<UrlMapping, StoreError>;

    /// Finds the id already assigned to `long_url`.
    ///
    /// Returns the first match when a backend cannot guarantee uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the URL was never shortened.
    async fn get_id_by_long_url(&self, long_url: &str) -> Result<String, StoreError>;

    /// Runs `f` in a transaction, committing if it returns `Ok`.
    ///
    /// An `Err` from `f` rolls everything back and is returned unchanged.
    /// Backends without built-in contention handling re-run `f` on
    /// [`StoreError::Transient`] failures, so `f` must be safe to repeat.
    async fn run_in_transaction<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send,
        F: for<'t> FnMut(&'t mut Self::Tx) -> TxFuture<'t, T> + Send;
}
