//! Awair cloud API client and backfill loop.
//!
//! This crate retrieves raw sensor readings from the Awair developer API and
//! walks a requested time window backward in adaptively-sized chunks,
//! handing normalized rows to a [`RowSink`](awair_types::RowSink).
//!
//! The endpoint sits behind the [`AirDataSource`] trait so the loop can be
//! driven by the real HTTP client ([`ApiClient`]) or by a scripted
//! [`MockSource`] in tests.
//!
//! # Example
//!
//! ```no_run
//! use awair_client::{ApiClient, Device, RangeOptions, fetch_range};
//! use awair_types::parse_timestamp;
//!
//! let mut client = ApiClient::new("token", Device::new("awair-element", 17617));
//! let options = RangeOptions::new(
//!     parse_timestamp("2025-01-01T00:00:00")?,
//!     parse_timestamp("2025-02-01T00:00:00")?,
//! );
//!
//! let mut rows = Vec::new();
//! let summary = fetch_range(&mut client, &options, &mut rows)?;
//! println!("{} rows in {} requests", summary.total_inserted, summary.requests);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod client;
mod error;
mod fetch;
mod mock;
mod normalize;
mod source;

pub use client::{ApiClient, DEFAULT_BASE_URL, Device};
pub use error::{Error, Result};
pub use fetch::{FetchResult, FetchSummary, RangeOptions, StopReason, fetch_range};
pub use mock::{MockPage, MockSource, raw_sample};
pub use normalize::normalize_sample;
pub use source::{AirDataSource, PageRequest, RawSample, RawSensor};
