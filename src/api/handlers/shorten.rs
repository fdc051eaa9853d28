//! Handler for link shortening endpoint.

use axum::{Json, extract::State};
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

/// Creates (or returns the existing) short id for a long URL.
///
/// # Endpoint
///
/// `POST /`
///
/// # Request Body
///
/// The long URL as plain text, e.g. `https://example.com/some/page`.
/// Surrounding whitespace is ignored.
///
/// # Response
///
/// The id as a JSON string:
///
/// ```json
/// "qW"
/// ```
///
/// # Errors
///
/// - **400 Bad Request**: body is not an absolute `http`/`https` URL
/// - **500 Internal Server Error**: the id could not be assigned
pub async fn shorten_handler(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<String>, AppError> {
    let long_url = validate_long_url(&body)?;

    match state.shortener.create_short_url(long_url).await {
        Ok(id) => Ok(Json(id)),
        Err(e) => {
            tracing::error!(error = %e, long_url, "Failed to create short URL");
            Err(AppError::internal("Failed to create short URL", json!({})))
        }
    }
}

/// Checks that `raw` is an absolute http(s) URL and returns it trimmed.
///
/// The URL is stored exactly as submitted; parsing only validates it. The
/// stored value is sent back as a `Location` header, so control characters
/// are refused before parsing.
fn validate_long_url(raw: &str) -> Result<&str, AppError> {
    let candidate = raw.trim();

    if let Some(position) = candidate.find(char::is_control) {
        return Err(AppError::bad_request(
            "URL must not contain control characters",
            json!({ "position": position }),
        ));
    }

    let parsed = url::Url::parse(candidate).map_err(|e| {
        AppError::bad_request(
            "Body must be an absolute URL",
            json!({ "reason": e.to_string() }),
        )
    })?;

    match parsed.scheme() {
        "http" | "https" if parsed.has_host() => Ok(candidate),
        scheme => Err(AppError::bad_request(
            "Only http and https URLs can be shortened",
            json!({ "scheme": scheme }),
        )),
    }
}
