//! Domain layer containing business entities and repository contracts.
//!
//! # Architecture
//!
//! - [`entities`] - Shards and URL mappings
//! - [`repositories`] - Data access trait definitions
//!
//! # Design Principles
//!
//! - Domain layer has no dependencies on infrastructure or presentation layers
//! - Repository traits define contracts implemented by infrastructure layer
//! - Id assignment is orchestrated in [`crate::application::services`]
//!
//! # Id Assignment Flow
//!
//! 1. Look the long URL up outside any transaction
//! 2. On a miss, open one transaction
//! 3. Read the shard total, increment one shard
//! 4. Encode `total + 1` with [`crate::utils::base62`]
//! 5. Insert the mapping and commit

pub mod entities;
pub mod repositories;
