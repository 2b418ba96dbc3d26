//! Store and session implementation.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::{Path, PathBuf};

use time::PrimitiveDateTime;
use tracing::{debug, info, warn};

use awair_types::{BoxError, ConflictPolicy, Reading, RowSink, format_timestamp};

use crate::error::{Error, Result};
use crate::parquet;

/// Summary statistics for a dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Number of records.
    pub count: usize,
    /// Earliest timestamp, if any records exist.
    pub earliest: Option<PrimitiveDateTime>,
    /// Latest timestamp, if any records exist.
    pub latest: Option<PrimitiveDateTime>,
    /// Size of the backing file in bytes (0 if it does not exist yet).
    pub size_bytes: u64,
}

/// Handle to a Parquet-backed readings dataset.
///
/// Opening a store performs no I/O; the backing file may not exist yet. The
/// read-only operations load fresh from the file each time, while
/// [`Store::session`] loads the dataset once into a staging buffer for
/// merging fetch batches.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    policy: ConflictPolicy,
}

impl Store {
    /// Open a store at the given path with the given conflict policy.
    pub fn open<P: AsRef<Path>>(path: P, policy: ConflictPolicy) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            policy,
        }
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configured conflict policy.
    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Begin a session, loading the full dataset into memory.
    ///
    /// # Errors
    ///
    /// Propagates storage failures other than a missing file (an absent
    /// file starts the session empty).
    pub fn session(&self) -> Result<Session> {
        let rows = parquet::read_file(&self.path)?;
        let buffer: BTreeMap<PrimitiveDateTime, Reading> =
            rows.into_iter().map(|r| (r.timestamp, r)).collect();
        debug!(
            "session opened on {} with {} records",
            self.path.display(),
            buffer.len()
        );
        Ok(Session {
            path: self.path.clone(),
            policy: self.policy,
            buffer,
            dirty: false,
        })
    }

    /// All readings, sorted ascending by timestamp.
    pub fn readings(&self) -> Result<Vec<Reading>> {
        let mut rows = parquet::read_file(&self.path)?;
        rows.sort_by_key(|r| r.timestamp);
        Ok(rows)
    }

    /// The latest timestamp in the dataset, or `None` if empty.
    pub fn latest_timestamp(&self) -> Result<Option<PrimitiveDateTime>> {
        let rows = parquet::read_file(&self.path)?;
        Ok(rows.iter().map(|r| r.timestamp).max())
    }

    /// Total number of records in the dataset.
    pub fn record_count(&self) -> Result<usize> {
        Ok(parquet::read_file(&self.path)?.len())
    }

    /// Summary statistics, with the size taken from the backing file.
    pub fn summary(&self) -> Result<Summary> {
        let rows = parquet::read_file(&self.path)?;
        Ok(Summary {
            count: rows.len(),
            earliest: rows.iter().map(|r| r.timestamp).min(),
            latest: rows.iter().map(|r| r.timestamp).max(),
            size_bytes: parquet::file_size(&self.path)?,
        })
    }
}

/// A scoped acquisition of the dataset.
///
/// Holds the full dataset in a timestamp-keyed staging buffer. Inserts merge
/// into the buffer; nothing touches the backing file until
/// [`close`](Session::close), which rewrites it in full iff anything changed.
/// Dropping without closing discards the staged changes.
pub struct Session {
    path: PathBuf,
    policy: ConflictPolicy,
    buffer: BTreeMap<PrimitiveDateTime, Reading>,
    dirty: bool,
}

impl Session {
    /// Merge a batch of rows into the staging buffer.
    ///
    /// Returns the buffer growth (never negative). Exact duplicates collapse
    /// silently under any policy; rows whose values disagree with an
    /// existing row at the same timestamp are resolved per the configured
    /// [`ConflictPolicy`].
    ///
    /// # Errors
    ///
    /// [`Error::Conflict`] under the `error` policy. The batch may have been
    /// partially merged at that point; callers should treat the session as
    /// fatal and drop it (nothing is persisted).
    pub fn insert(&mut self, rows: &[Reading]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let before = self.buffer.len();
        for row in rows {
            match self.buffer.entry(row.timestamp) {
                Entry::Vacant(slot) => {
                    slot.insert(*row);
                }
                Entry::Occupied(mut slot) => {
                    let differing = slot.get().differing_fields(row);
                    if differing.is_empty() {
                        continue;
                    }
                    let details = describe_conflict(slot.get(), row, &differing);
                    match self.policy {
                        ConflictPolicy::Error => {
                            return Err(Error::Conflict {
                                timestamp: format_timestamp(row.timestamp),
                                details,
                            });
                        }
                        ConflictPolicy::Warn => {
                            warn!(
                                "data conflict at {}: {}; keeping existing values",
                                format_timestamp(row.timestamp),
                                details
                            );
                        }
                        ConflictPolicy::Replace => {
                            slot.insert(*row);
                            // No growth, but the overwrite must still reach
                            // disk at close.
                            self.dirty = true;
                        }
                    }
                }
            }
        }

        let inserted = self.buffer.len().saturating_sub(before);
        if inserted > 0 {
            self.dirty = true;
        }
        Ok(inserted)
    }

    /// The latest timestamp in the buffer, or `None` if empty.
    pub fn latest_timestamp(&self) -> Option<PrimitiveDateTime> {
        self.buffer.keys().next_back().copied()
    }

    /// Number of records in the buffer.
    pub fn record_count(&self) -> usize {
        self.buffer.len()
    }

    /// Iterate the buffered readings in ascending timestamp order.
    pub fn readings(&self) -> impl Iterator<Item = &Reading> {
        self.buffer.values()
    }

    /// Whether any insert changed the buffer since the session opened.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Summary statistics: counts and range from the buffer, size from the
    /// backing file.
    pub fn summary(&self) -> Result<Summary> {
        Ok(Summary {
            count: self.buffer.len(),
            earliest: self.buffer.keys().next().copied(),
            latest: self.buffer.keys().next_back().copied(),
            size_bytes: parquet::file_size(&self.path)?,
        })
    }

    /// End the session, rewriting the backing file iff the buffer changed.
    ///
    /// # Errors
    ///
    /// Propagates storage failures; the previous file contents survive a
    /// failed write (the rewrite is staged through a temp file).
    pub fn close(mut self) -> Result<()> {
        if self.dirty {
            let rows: Vec<Reading> = self.buffer.values().copied().collect();
            parquet::write_file(&self.path, &rows)?;
            info!("wrote {} records to {}", rows.len(), self.path.display());
            self.dirty = false;
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.dirty {
            warn!(
                "session on {} dropped without close; discarding staged changes",
                self.path.display()
            );
        }
    }
}

impl RowSink for Session {
    fn insert(&mut self, rows: &[Reading]) -> std::result::Result<usize, BoxError> {
        Session::insert(self, rows).map_err(Into::into)
    }
}

fn describe_conflict(existing: &Reading, incoming: &Reading, fields: &[awair_types::SensorField]) -> String {
    fields
        .iter()
        .map(|&f| format!("{}: {} -> {}", f, existing.field(f), incoming.field(f)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn reading(ts: PrimitiveDateTime, temp: f64) -> Reading {
        Reading {
            timestamp: ts,
            temp,
            co2: 400.0,
            pm10: 5.0,
            pm25: 3.0,
            humid: 40.0,
            voc: 100.0,
        }
    }

    fn temp_store(policy: ConflictPolicy) -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("data.parquet"), policy);
        (dir, store)
    }

    #[test]
    fn test_insert_empty_batch_is_noop() {
        let (_dir, store) = temp_store(ConflictPolicy::Warn);
        let mut session = store.session().unwrap();
        assert_eq!(session.insert(&[]).unwrap(), 0);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_idempotent_insert() {
        let (_dir, store) = temp_store(ConflictPolicy::Warn);
        let mut session = store.session().unwrap();

        let batch = vec![
            reading(datetime!(2025-01-01 00:00:00), 70.0),
            reading(datetime!(2025-01-01 00:01:00), 70.5),
        ];
        assert_eq!(session.insert(&batch).unwrap(), 2);
        assert_eq!(session.insert(&batch).unwrap(), 0);
        assert_eq!(session.record_count(), 2);
    }

    #[test]
    fn test_commutative_without_conflicts() {
        let a = vec![
            reading(datetime!(2025-01-01 00:00:00), 70.0),
            reading(datetime!(2025-01-01 00:02:00), 71.0),
        ];
        let b = vec![
            reading(datetime!(2025-01-01 00:01:00), 70.5),
            // Overlaps with a, but with identical values.
            reading(datetime!(2025-01-01 00:02:00), 71.0),
        ];

        let (_dir1, store1) = temp_store(ConflictPolicy::Warn);
        let mut s1 = store1.session().unwrap();
        s1.insert(&a).unwrap();
        s1.insert(&b).unwrap();
        let ab: Vec<Reading> = s1.readings().copied().collect();

        let (_dir2, store2) = temp_store(ConflictPolicy::Warn);
        let mut s2 = store2.session().unwrap();
        s2.insert(&b).unwrap();
        s2.insert(&a).unwrap();
        let ba: Vec<Reading> = s2.readings().copied().collect();

        assert_eq!(ab, ba);
    }

    #[test]
    fn test_conflict_policy_error_raises() {
        let (_dir, store) = temp_store(ConflictPolicy::Error);
        let mut session = store.session().unwrap();

        session
            .insert(&[reading(datetime!(2025-01-01 00:00:00), 70.0)])
            .unwrap();
        let err = session
            .insert(&[reading(datetime!(2025-01-01 00:00:00), 71.0)])
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        assert!(err.to_string().contains("temp: 70 -> 71"));
    }

    #[test]
    fn test_conflict_policy_error_allows_exact_duplicates() {
        let (_dir, store) = temp_store(ConflictPolicy::Error);
        let mut session = store.session().unwrap();

        let row = reading(datetime!(2025-01-01 00:00:00), 70.0);
        session.insert(&[row]).unwrap();
        assert_eq!(session.insert(&[row]).unwrap(), 0);
        assert_eq!(session.record_count(), 1);
    }

    #[test]
    fn test_conflict_policy_warn_keeps_first_seen() {
        let (_dir, store) = temp_store(ConflictPolicy::Warn);
        let mut session = store.session().unwrap();

        session
            .insert(&[reading(datetime!(2025-01-01 00:00:00), 70.0)])
            .unwrap();
        assert_eq!(
            session
                .insert(&[reading(datetime!(2025-01-01 00:00:00), 71.0)])
                .unwrap(),
            0
        );
        assert_eq!(session.readings().next().unwrap().temp, 70.0);
    }

    #[test]
    fn test_conflict_policy_replace_keeps_last_seen() {
        let (_dir, store) = temp_store(ConflictPolicy::Replace);
        let mut session = store.session().unwrap();

        session
            .insert(&[reading(datetime!(2025-01-01 00:00:00), 70.0)])
            .unwrap();
        assert_eq!(
            session
                .insert(&[reading(datetime!(2025-01-01 00:00:00), 71.0)])
                .unwrap(),
            0
        );
        assert_eq!(session.readings().next().unwrap().temp, 71.0);
    }

    #[test]
    fn test_replace_overwrite_is_persisted() {
        let (_dir, store) = temp_store(ConflictPolicy::Replace);

        let mut session = store.session().unwrap();
        session
            .insert(&[reading(datetime!(2025-01-01 00:00:00), 70.0)])
            .unwrap();
        session.close().unwrap();

        // A session that only overwrites (no growth) must still write back.
        let mut session = store.session().unwrap();
        session
            .insert(&[reading(datetime!(2025-01-01 00:00:00), 71.0)])
            .unwrap();
        assert!(session.is_dirty());
        session.close().unwrap();

        assert_eq!(store.readings().unwrap()[0].temp, 71.0);
    }

    #[test]
    fn test_sorted_unique_after_close() {
        let (_dir, store) = temp_store(ConflictPolicy::Warn);
        let mut session = store.session().unwrap();

        // Out of order, with an overlap.
        session
            .insert(&[
                reading(datetime!(2025-01-01 00:05:00), 75.0),
                reading(datetime!(2025-01-01 00:01:00), 71.0),
            ])
            .unwrap();
        session
            .insert(&[
                reading(datetime!(2025-01-01 00:03:00), 73.0),
                reading(datetime!(2025-01-01 00:01:00), 71.0),
            ])
            .unwrap();
        session.close().unwrap();

        let rows = store.readings().unwrap();
        assert_eq!(rows.len(), 3);
        for pair in rows.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    #[test]
    fn test_dropped_session_discards_changes() {
        let (_dir, store) = temp_store(ConflictPolicy::Warn);

        let mut session = store.session().unwrap();
        session
            .insert(&[reading(datetime!(2025-01-01 00:00:00), 70.0)])
            .unwrap();
        session.close().unwrap();

        let mut session = store.session().unwrap();
        session
            .insert(&[reading(datetime!(2025-01-02 00:00:00), 72.0)])
            .unwrap();
        drop(session);

        // The backing file still holds only the first session's row.
        assert_eq!(store.record_count().unwrap(), 1);
    }

    #[test]
    fn test_clean_session_does_not_rewrite() {
        let (_dir, store) = temp_store(ConflictPolicy::Warn);
        // Closing a session with no inserts against a missing file must not
        // create one.
        let session = store.session().unwrap();
        session.close().unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_read_only_ops_on_missing_file() {
        let (_dir, store) = temp_store(ConflictPolicy::Warn);
        assert_eq!(store.record_count().unwrap(), 0);
        assert!(store.latest_timestamp().unwrap().is_none());

        let summary = store.summary().unwrap();
        assert_eq!(summary.count, 0);
        assert!(summary.earliest.is_none());
        assert_eq!(summary.size_bytes, 0);
    }

    #[test]
    fn test_summary_after_close() {
        let (_dir, store) = temp_store(ConflictPolicy::Warn);
        let mut session = store.session().unwrap();
        session
            .insert(&[
                reading(datetime!(2025-01-01 00:00:00), 70.0),
                reading(datetime!(2025-01-03 00:00:00), 72.0),
            ])
            .unwrap();
        session.close().unwrap();

        let summary = store.summary().unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.earliest, Some(datetime!(2025-01-01 00:00:00)));
        assert_eq!(summary.latest, Some(datetime!(2025-01-03 00:00:00)));
        assert!(summary.size_bytes > 0);
    }

    #[test]
    fn test_latest_timestamp_tracks_buffer() {
        let (_dir, store) = temp_store(ConflictPolicy::Warn);
        let mut session = store.session().unwrap();
        assert!(session.latest_timestamp().is_none());

        session
            .insert(&[reading(datetime!(2025-01-02 08:00:00), 70.0)])
            .unwrap();
        assert_eq!(
            session.latest_timestamp(),
            Some(datetime!(2025-01-02 08:00:00))
        );
    }

    #[test]
    fn test_end_to_end_example() {
        let (_dir, store) = temp_store(ConflictPolicy::Replace);
        let mut session = store.session().unwrap();

        let row = reading(datetime!(2025-01-01 00:00:00), 70.0);
        assert_eq!(session.insert(&[row]).unwrap(), 1);
        assert_eq!(session.record_count(), 1);

        // Identical row again: no growth.
        assert_eq!(session.insert(&[row]).unwrap(), 0);
        assert_eq!(session.record_count(), 1);

        // Same timestamp, new temperature under replace: no growth, value
        // overwritten.
        let mut updated = row;
        updated.temp = 71.0;
        assert_eq!(session.insert(&[updated]).unwrap(), 0);
        assert_eq!(session.record_count(), 1);
        assert_eq!(session.readings().next().unwrap().temp, 71.0);
    }
}
