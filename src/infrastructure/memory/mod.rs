//! In-process backend for tests and local runs.
//!
//! Implements the same repository traits as [`crate::infrastructure::persistence`]
//! on top of [`MemoryStore`], a JSON document map guarded by one lock. Data is
//! lost when the process exits.

pub mod memory_counter_repository;
pub mod memory_url_repository;
pub mod store;

pub use memory_counter_repository::MemoryCounterRepository;
pub use memory_url_repository::MemoryUrlRepository;
pub use store::{MemoryStore, MemoryTx};
