//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short id to its original URL.
///
/// # Endpoint
///
/// `GET /{short_url}`
///
/// # Response Codes
///
/// - **302 Found**: `Location` carries the long URL
/// - **404 Not Found**: the id was never issued
/// - **500 Internal Server Error**: the store failed
pub async fn redirect_handler(
    Path(short_url): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    match state.shortener.get_by_short_url(&short_url).await {
        Ok(mapping) => {
            tracing::debug!(id = %mapping.id, "Redirecting");
            Ok((StatusCode::FOUND, [(header::LOCATION, mapping.long_url)]))
        }
        Err(e @ AppError::NotFound { .. }) => Err(e),
        Err(e) => {
            tracing::error!(error = %e, %short_url, "Failed to resolve short URL");
            Err(AppError::internal("Failed to resolve short URL", json!({})))
        }
    }
}
