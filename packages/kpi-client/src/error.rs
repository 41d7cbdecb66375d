//! Error types for the KPI Drive client.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Result type for KPI Drive client operations.
pub type Result<T> = std::result::Result<T, KpiError>;

/// KPI Drive client errors.
#[derive(Debug, Error)]
pub enum KpiError {
    /// Connection failure or unreadable response body
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response bytes did not match the expected envelope shape
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Login call rejected by the server
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Server reported a non-OK status with a business-level message
    #[error("API error: {0}")]
    Application(String),
}
