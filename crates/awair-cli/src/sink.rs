//! Pass-through sink: JSON Lines on stdout.

use std::io::Write;

use awair_types::{BoxError, Reading, RowSink};

/// Writes every row as one JSON object per line.
///
/// Used when no store path is given, so rows stay machine-parseable on
/// stdout while narration goes to stderr.
pub struct JsonlSink<W: Write> {
    out: W,
}

impl<W: Write> JsonlSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> RowSink for JsonlSink<W> {
    fn insert(&mut self, rows: &[Reading]) -> Result<usize, BoxError> {
        for row in rows {
            serde_json::to_writer(&mut self.out, row)?;
            self.out.write_all(b"\n")?;
        }
        self.out.flush()?;
        Ok(rows.len())
    }
}
