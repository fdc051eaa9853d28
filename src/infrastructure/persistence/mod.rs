//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx.
//!
//! # Repositories
//!
//! - [`PgCounterRepository`] - Sharded counter over the `shards` table
//! - [`PgUrlRepository`] - URL mappings and serializable transactions
//!
//! Both use [`PgTx`] as their transaction handle, so a single transaction
//! opened by [`PgUrlRepository`] can be handed to [`PgCounterRepository`].

pub mod pg_counter_repository;
pub mod pg_url_repository;
pub mod retry;

pub use pg_counter_repository::PgCounterRepository;
pub use pg_url_repository::PgUrlRepository;
pub use retry::RetryPolicy;

/// Transaction handle shared by the PostgreSQL repositories.
pub type PgTx = sqlx::Transaction<'static, sqlx::Postgres>;
