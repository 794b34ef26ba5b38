use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad collaborator error category used for user-facing handling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Invalid input rejected by the backend.
    Validation,
    /// Authentication/authorization failure.
    Auth,
    /// The addressed room or message does not exist.
    NotFound,
    /// Transient network or transport failure.
    Network,
    /// Rate-limited by the backend.
    RateLimited,
    /// Response body could not be decoded.
    Serialization,
    /// Internal failure or invariant break.
    Internal,
}

/// Stable error payload returned by every collaborator operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct ApiError {
    /// High-level error category.
    pub category: ApiErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional retry hint in milliseconds.
    pub retry_after_ms: Option<u64>,
}

impl ApiError {
    /// Construct a new collaborator error.
    pub fn new(
        category: ApiErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            retry_after_ms: None,
        }
    }

    /// Attach a retry hint to the error.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after_ms = Some(retry_after.as_millis() as u64);
        self
    }

    /// Whether the addressed entity was missing.
    pub fn is_not_found(&self) -> bool {
        self.category == ApiErrorCategory::NotFound
    }
}

/// Map HTTP status codes to collaborator error categories.
pub fn classify_http_status(status: u16) -> ApiErrorCategory {
    match status {
        401 | 403 => ApiErrorCategory::Auth,
        404 => ApiErrorCategory::NotFound,
        408 | 429 => ApiErrorCategory::RateLimited,
        400..=499 => ApiErrorCategory::Validation,
        500..=599 => ApiErrorCategory::Network,
        _ => ApiErrorCategory::Internal,
    }
}
