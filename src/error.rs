//! # Error Types
//!
//! Custom error types for GPS Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for GPS Bridge
#[derive(Debug, Error)]
pub enum GpsBridgeError {
    /// Coordinate text failed structural parse (too short or non-numeric)
    #[error("malformed coordinate: {0}")]
    MalformedCoordinate(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A telemetry source could not be opened at startup.
    /// This is the only error that terminates the pipeline.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// HTTP client construction failed
    #[error("HTTP client error: {0}")]
    Http(String),
}

/// Per-request forwarding failure. Surfaced to the pipeline as a per-tick
/// error and never fatal; the pipeline decides when to re-attempt.
#[derive(Debug, Error)]
pub enum SendError {
    /// Request exceeded the configured collector timeout
    #[error("collector request timed out")]
    Timeout,

    /// Connection-level failure (refused, reset, DNS)
    #[error("collector connection failed: {0}")]
    Connection(String),

    /// Collector answered with a non-2xx status
    #[error("collector responded with HTTP {0}")]
    Status(u16),
}

/// Result type alias for GPS Bridge
pub type Result<T> = std::result::Result<T, GpsBridgeError>;
