//! Repository trait definitions for the domain layer.
//!
//! These traits abstract the transactional document store the shortener runs
//! on. Concrete implementations live in `crate::infrastructure`.
//!
//! # Available Repositories
//!
//! - [`CounterRepository`] - Sharded counter that issues totals
//! - [`UrlRepository`] - URL mappings and the transactions spanning both
//!
//! Both traits carry an associated `Tx` type. A service that coordinates them
//! requires `CounterRepository<Tx = U::Tx>` so one transaction covers the
//! counter read, the shard increment and the mapping insert.

pub mod counter_repository;
pub mod url_repository;

pub use counter_repository::{CounterRepository, pick_shard};
pub use url_repository::{TxFuture, UrlRepository};
