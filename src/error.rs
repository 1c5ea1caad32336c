//! Error types for the tedapi library.

use thiserror::Error;

/// The main error type for tedapi operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The gateway host name is not a valid TLS server name.
    #[error("invalid gateway host: {host}")]
    InvalidHost { host: String },

    /// Gateway answered with a non-200 HTTP status.
    #[error("gateway returned HTTP status {status}")]
    Http { status: u16 },

    /// Transport read exceeded the exchange deadline.
    #[error("exchange timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Connection is not established.
    #[error("not connected")]
    NotConnected,

    /// The gateway rejected the request signature.
    #[error("gateway rejected auth code")]
    AuthRejected,

    /// A built request exceeds the fixed request buffer budget.
    #[error("request too large: {size} bytes exceeds maximum {max}")]
    RequestTooLarge { size: usize, max: usize },

    /// No DIN has been fetched yet; the session cannot address the gateway.
    #[error("no DIN available")]
    NoDin,

    /// Protocol-level error (unexpected or unusable response).
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Extracted payload is not the JSON document we expect.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Varint decoding errors.
///
/// These are internal to the field walker: malformed network input is
/// surfaced to callers as "field not found", never as a hard failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended before the terminating varint byte.
    #[error("truncated varint")]
    Truncated,

    /// More than 5 continuation groups; value would exceed 32 bits.
    #[error("varint overflows 32 bits")]
    Overflow,
}

/// Result type alias for tedapi operations.
pub type Result<T> = std::result::Result<T, Error>;
