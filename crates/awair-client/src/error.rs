//! Error types for awair-client.

use awair_types::BoxError;

/// Result type alias using awair-client's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when fetching readings from the API.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The API answered 429. Terminal for the whole range operation;
    /// never retried automatically.
    #[error("rate limit exceeded (429) for window {from} to {to}")]
    RateLimited {
        /// Requested window start.
        from: String,
        /// Requested window end.
        to: String,
    },

    /// Any other non-success HTTP status. The backfill loop recovers from
    /// these locally by retreating the request window.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        message: String,
    },

    /// Transport-level failure (connection, TLS, body decode).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// A payload row failed normalization (bad timestamp, missing field).
    #[error(transparent)]
    Parse(#[from] awair_types::ParseError),

    /// The sink rejected a batch of rows.
    #[error("sink error: {0}")]
    Sink(#[source] BoxError),

    /// The requested range or page limit is not usable.
    #[error("invalid range: {0}")]
    InvalidRange(String),
}
