use std::sync::Arc;

use crate::application::services::Shortener;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub shortener: Arc<dyn Shortener>,
}

impl AppState {
    pub fn new(shortener: Arc<dyn Shortener>) -> Self {
        Self { shortener }
    }
}
