//! The seam between fetching and storage.

use crate::reading::Reading;

/// Boxed error type used across the sink seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Consumer of normalized reading batches.
///
/// The backfill loop hands every normalized page to a sink and otherwise
/// does not care where the rows go: a store session, a pass-through writer,
/// or a plain `Vec<Reading>` in tests.
pub trait RowSink {
    /// Consume a batch of readings, returning how many were newly accepted.
    ///
    /// # Errors
    ///
    /// Sink-specific failures (storage errors, conflicts under the `error`
    /// policy, broken output pipes) propagate and abort the surrounding
    /// operation.
    fn insert(&mut self, rows: &[Reading]) -> Result<usize, BoxError>;
}

/// Collecting sink: appends every row, reports every row as new.
impl RowSink for Vec<Reading> {
    fn insert(&mut self, rows: &[Reading]) -> Result<usize, BoxError> {
        self.extend_from_slice(rows);
        Ok(rows.len())
    }
}
