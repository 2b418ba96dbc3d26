//! Error types for awair-store.

use std::path::PathBuf;

/// Result type for awair-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in awair-store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Two observations disagree for the same timestamp under the `error`
    /// policy. The session should be treated as fatal after this.
    #[error("data conflict at {timestamp}: {details}")]
    Conflict {
        /// Timestamp of the colliding rows.
        timestamp: String,
        /// Per-field description of the disagreement.
        details: String,
    },

    /// Failed to create the data directory.
    #[error("failed to create data directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The backing file is unreadable or unwritable for a reason other than
    /// not existing yet (a missing file is an empty dataset).
    #[error("storage unavailable at {path}: {source}")]
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Parquet encode/decode error.
    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow record-batch error.
    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    /// The backing file does not have the expected column layout.
    #[error("unexpected file schema: {0}")]
    Schema(String),
}
