//! Shared types for the Awair air-quality data pipeline.
//!
//! This crate provides the types shared between the API client
//! (awair-client) and the local persistence layer (awair-store).
//!
//! # Features
//!
//! - [`Reading`]: one fixed-shape sensor sample
//! - [`SensorField`]: the closed, ordered set of value fields
//! - [`ConflictPolicy`]: what to do when two observations disagree
//! - [`timestamp`]: naive-timestamp parsing and formatting
//! - [`RowSink`]: the seam between fetching and storage

pub mod error;
pub mod policy;
pub mod reading;
pub mod sink;
pub mod timestamp;

pub use error::{ParseError, ParseResult};
pub use policy::ConflictPolicy;
pub use reading::{Reading, SensorField};
pub use sink::{BoxError, RowSink};
pub use timestamp::{format_timestamp, parse_timestamp};
