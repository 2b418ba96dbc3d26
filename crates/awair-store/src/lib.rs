//! Local Parquet persistence for Awair sensor readings.
//!
//! This crate maintains a deduplicated, timestamp-unique, timestamp-sorted
//! dataset in a single columnar file, safely absorbing repeated and
//! overlapping fetch batches.
//!
//! A [`Session`] is a scoped acquisition of the dataset: the whole file is
//! loaded into memory on open, mutated through [`Session::insert`], and
//! written back exactly once on [`Session::close`] if anything changed.
//! Dropping a session without closing discards its staged changes, so the
//! backing file is never partially written.
//!
//! Only one session should operate on a given path at a time; concurrent
//! sessions race and can lose writes (no locking is provided).
//!
//! # Example
//!
//! ```no_run
//! use awair_store::Store;
//! use awair_types::ConflictPolicy;
//!
//! let store = Store::open("awair-17617.parquet", ConflictPolicy::Warn);
//! let mut session = store.session()?;
//! // ... insert fetched batches ...
//! session.close()?;
//! # Ok::<(), awair_store::Error>(())
//! ```

pub mod analysis;
mod error;
mod parquet;
mod store;

pub use analysis::{Gap, daily_counts, largest_gaps};
pub use error::{Error, Result};
pub use store::{Session, Store, Summary};

/// Default data file path for a device, following platform conventions.
///
/// - Linux: `~/.local/share/awair/awair-<id>.parquet`
/// - macOS: `~/Library/Application Support/awair/awair-<id>.parquet`
/// - Windows: `C:\Users\<user>\AppData\Local\awair\awair-<id>.parquet`
pub fn default_data_path(device_id: u64) -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("awair")
        .join(format!("awair-{device_id}.parquet"))
}
