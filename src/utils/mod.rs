//! Utility modules.

pub mod base62;
