//! Core domain entities.
//!
//! - [`Shard`] - One record of the sharded counter
//! - [`UrlMapping`] - A short id bound to its long URL
//! - [`NewUrl`] - The stored body of a mapping, before an id is attached

pub mod shard;
pub mod url_mapping;

pub use shard::{Shard, checked_total};
pub use url_mapping::{NewUrl, UrlMapping};
