//! API route configuration.

use crate::api::handlers::{health_handler, redirect_handler, shorten_handler};
use crate::state::AppState;
use crate::utils::base62;
use axum::{
    Router,
    routing::{get, post},
};

/// Public routes of the shortener.
///
/// # Endpoints
///
/// - `POST /`             - Shorten the URL in the request body
/// - `GET  /health`       - Store health check
/// - `GET  /{short_url}`  - Redirect to the long URL
///
/// The static `/health` segment takes precedence over the `{short_url}`
/// capture, so `health` is listed in [`base62::RESERVED_IDS`] and never
/// issued. Any new static route must be added there too.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(shorten_handler))
        .route("/health", get(health_handler))
        .route("/{short_url}", get(redirect_handler))
}
