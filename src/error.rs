//! Centralized error types for the monitoring gateway

use thiserror::Error;

/// Gateway error types
///
/// These are process-level failures. Per-request failures (routing misses,
/// upstream transport errors, decode fallbacks) are converted into
/// synthesized responses at the gateway boundary and never surface here.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration is missing, unparseable, or inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, GatewayError>;
