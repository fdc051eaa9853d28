//! Repository trait for the sharded id counter.

use crate::error::StoreError;
use async_trait::async_trait;
use rand::Rng;

/// Repository interface for a counter split across N shard records.
///
/// Writers touch one shard chosen uniformly at random, so concurrent
/// increments rarely collide on the same record. Readers pay for it by
/// summing every shard. Correctness never depends on the shard choice: it
/// comes from the isolation of the transaction `Tx` both operations run in.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgCounterRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::memory::MemoryCounterRepository`] - In-process implementation
///
/// # Examples
///
/// See integration tests: `tests/repository_counter.rs`
#[async_trait]
pub trait CounterRepository: Send + Sync {
    /// Transaction handle shared with the URL repository.
    type Tx: Send;

    /// Number of shards increments are spread across.
    fn shards(&self) -> u32;

    /// Ensures shards `0..shards()` exist, creating missing ones with count 0.
    ///
    /// Safe to call repeatedly: existing shards keep their counts, and losing a
    /// creation race to a concurrent initializer is not an error.
    ///
    /// # Errors
    ///
    /// Any other store failure, which callers treat as fatal to startup.
    async fn initialize(&self) -> Result<(), StoreError>;

    /// Adds 1 to a randomly chosen shard inside `tx` and returns its index.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the chosen shard was never
    /// initialized, or the store error raised by the update.
    async fn increment_one_shard(&self, tx: &mut Self::Tx) -> Result<u32, StoreError>;

    /// Sums the counts of every shard visible in `tx`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Deserialization`] if any shard holds an invalid
    /// count; such shards are never skipped.
    async fn read_total(&self, tx: &mut Self::Tx) -> Result<u64, StoreError>;
}

/// Picks a shard index uniformly from `0..shards`.
///
/// # Panics
///
/// Panics if `shards` is zero.
pub fn pick_shard(shards: u32) -> u32 {
    rand::rng().random_range(0..shards)
}
