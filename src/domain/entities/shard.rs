//! Counter shard entity.

use serde::{Deserialize, Serialize};

/// One of the N independently incremented records whose counts sum to the
/// logical total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shard {
    pub count: u64,
}

impl Shard {
    /// Storage key of the shard at `index`.
    pub fn key(index: u32) -> String {
        index.to_string()
    }
}

/// Adds shard counts, failing instead of wrapping on overflow.
pub fn checked_total<I>(counts: I) -> Option<u64>
where
    I: IntoIterator<Item = u64>,
{
    counts
        .into_iter()
        .try_fold(0u64, |acc, count| acc.checked_add(count))
}
