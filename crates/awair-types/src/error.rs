//! Error types for payload parsing in awair-types.

use thiserror::Error;

/// Errors that can occur when parsing Awair sensor payloads.
///
/// This error type is transport-agnostic; HTTP-specific errors
/// belong in awair-client.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A timestamp string could not be parsed in any accepted format.
    #[error("invalid timestamp {input:?}: {reason}")]
    InvalidTimestamp {
        /// The offending input string.
        input: String,
        /// Description of the parse failure.
        reason: String,
    },

    /// A fetched reading is missing one of the canonical sensor fields.
    ///
    /// Rows with missing fields are an input-contract violation and are
    /// never silently dropped.
    #[error("reading at {timestamp} is missing sensor component '{field}'")]
    MissingField {
        /// Timestamp of the incomplete reading, as received.
        timestamp: String,
        /// Name of the missing canonical field.
        field: &'static str,
    },
}

/// Result type alias using awair-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
