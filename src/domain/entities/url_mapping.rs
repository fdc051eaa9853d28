//! URL mapping entity: a short id bound to the long URL it resolves to.

use serde::{Deserialize, Serialize};

/// A persisted short id → long URL mapping.
///
/// `id` is the storage key. Mappings are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlMapping {
    pub id: String,
    pub long_url: String,
}

impl UrlMapping {
    /// Creates a new UrlMapping instance.
    pub fn new(id: impl Into<String>, long_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            long_url: long_url.into(),
        }
    }
}

/// Stored body of a mapping; the id lives in the key, not the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUrl {
    pub long_url: String,
}

impl NewUrl {
    pub fn new(long_url: impl Into<String>) -> Self {
        Self {
            long_url: long_url.into(),
        }
    }

    /// Attaches the assigned id.
    pub fn into_mapping(self, id: impl Into<String>) -> UrlMapping {
        UrlMapping::new(id, self.long_url)
    }
}
