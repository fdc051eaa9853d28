//! Error types for the store layer and the HTTP edge.
//!
//! [`StoreError`] is the taxonomy every repository speaks; [`AppError`] is what
//! services hand to handlers and what gets rendered as a JSON error body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

/// Failures raised by the counter and URL repositories.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("record not found")]
    NotFound,

    /// A create-if-absent write hit an existing key or unique field.
    #[error("record already exists ({key})")]
    Conflict { key: String },

    /// Contention or connectivity failure; the whole transaction may be retried.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// A stored record could not be converted into its domain type.
    #[error("malformed record {key}: {reason}")]
    Deserialization { key: String, reason: String },

    /// The per-request deadline elapsed before the store answered.
    #[error("store deadline exceeded")]
    DeadlineExceeded,

    /// The stored state violates an invariant (e.g. the counter overflowed).
    #[error("store state corrupted: {0}")]
    Corrupted(String),

    #[error("{context}: {source}")]
    Backend {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    /// Classifies a sqlx error, tagging backend failures with `context`.
    ///
    /// Unique violations become [`StoreError::Conflict`] keyed by the violated
    /// constraint. Serialization failures (`40001`), deadlocks (`40P01`) and
    /// pool/IO failures are [`StoreError::Transient`].
    pub fn from_sqlx(context: &'static str, e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error() {
            if db.is_unique_violation() {
                return Self::Conflict {
                    key: db.constraint().unwrap_or("unique").to_string(),
                };
            }

            if matches!(db.code().as_deref(), Some("40001" | "40P01")) {
                return Self::Transient(format!("{context}: {}", db.message()));
            }
        }

        match e {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::ColumnDecode { index, source } => Self::Deserialization {
                key: format!("{context} (column {index})"),
                reason: source.to_string(),
            },
            sqlx::Error::Decode(source) => Self::Deserialization {
                key: context.to_string(),
                reason: source.to_string(),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                Self::Transient(format!("{context}: {e}"))
            }
            source => Self::Backend { context, source },
        }
    }

    /// Whether re-running the whole transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

/// Error payload rendered inside the `error` field of every failure response.
#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, details: Value },
    #[error("{message}")]
    NotFound { message: String, details: Value },
    #[error("{message}")]
    Conflict { message: String, details: Value },
    #[error("{message}")]
    Unavailable { message: String, details: Value },
    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }
    pub fn unavailable(message: impl Into<String>, details: Value) -> Self {
        Self::Unavailable {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Converts the error into the serializable payload used in responses.
    pub fn to_error_info(&self) -> ErrorInfo {
        let (code, message, details) = match self {
            AppError::Validation { message, details } => ("validation_error", message, details),
            AppError::NotFound { message, details } => ("not_found", message, details),
            AppError::Conflict { message, details } => ("conflict", message, details),
            AppError::Unavailable { message, details } => ("unavailable", message, details),
            AppError::Internal { message, details } => ("internal_error", message, details),
        };

        ErrorInfo {
            code,
            message: message.clone(),
            details: details.clone(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::not_found("Record not found", json!({})),
            StoreError::Conflict { key } => {
                AppError::conflict("Record already exists", json!({ "key": key }))
            }
            StoreError::Transient(reason) => {
                AppError::unavailable("Store is busy, retry later", json!({ "reason": reason }))
            }
            StoreError::DeadlineExceeded => {
                AppError::unavailable("Store deadline exceeded", json!({}))
            }
            other => {
                tracing::error!(error = %other, "store failure");
                AppError::internal("Store error", json!({}))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_error_info(),
        };

        (status, Json(body)).into_response()
    }
}
