//! The data-source seam: one paginated page fetch.

use serde::Deserialize;
use time::PrimitiveDateTime;

use crate::error::Result;

/// Parameters of one page request against the raw-readings endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// Window start (inclusive).
    pub from: PrimitiveDateTime,
    /// Window end (inclusive).
    pub to: PrimitiveDateTime,
    /// Maximum rows per page (API-imposed ceiling, typically ≤ 360).
    pub limit: u32,
}

/// One sensor record as returned by the API, before normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSample {
    /// Sample timestamp, as received (RFC 3339 or naive ISO-8601).
    pub timestamp: String,
    /// Heterogeneous sensor component array.
    pub sensors: Vec<RawSensor>,
}

/// One `{comp, value}` entry of a raw sample.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSensor {
    /// Sensor component name (e.g. `temp`, `co2`).
    pub comp: String,
    /// Measured value.
    pub value: f64,
}

/// A paginated source of raw sensor readings.
///
/// Implemented by [`ApiClient`](crate::ApiClient) over HTTP and by
/// [`MockSource`](crate::MockSource) for tests, so code driving the
/// backfill loop works with either.
pub trait AirDataSource {
    /// Fetch one page of raw samples for the requested window.
    ///
    /// Returning an empty vector means the range holds no further data.
    ///
    /// # Errors
    ///
    /// [`Error::RateLimited`](crate::Error::RateLimited) on HTTP 429,
    /// [`Error::Http`](crate::Error::Http) on any other non-success status.
    fn fetch_page(&mut self, request: &PageRequest) -> Result<Vec<RawSample>>;
}
