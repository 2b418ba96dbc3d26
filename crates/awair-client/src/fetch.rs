//! Backward-walking, rate-limit-aware range fetching.
//!
//! [`fetch_range`] retrieves every reading in a `[from, to]` window by
//! repeatedly requesting pages ending at the current window end and moving
//! the end backward past the oldest row each page returns. Rate limiting
//! (HTTP 429) stops the whole operation; other HTTP errors only retreat the
//! window and continue.

use std::thread;
use std::time::Duration as StdDuration;

use time::{Duration, PrimitiveDateTime};
use tracing::{debug, info, warn};

use awair_types::{Reading, RowSink, format_timestamp};

use crate::error::{Error, Result};
use crate::normalize::normalize_sample;
use crate::source::{AirDataSource, PageRequest, RawSample};

/// Window retreat after a recoverable HTTP error.
const HTTP_ERROR_STEP: Duration = Duration::hours(1);

/// Forced retreat when a page fails to advance past the window end.
const NO_PROGRESS_STEP: Duration = Duration::minutes(1);

/// Retreat past the oldest returned row, avoiding a boundary re-fetch.
const BOUNDARY_STEP: Duration = Duration::seconds(1);

/// Outcome of one page fetch: normalized rows plus descriptive statistics.
///
/// The statistics are log-only; control flow never depends on them beyond
/// the oldest timestamp.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Normalized rows, in API order.
    pub rows: Vec<Reading>,
    /// Echo of the requested window start.
    pub requested_from: PrimitiveDateTime,
    /// Echo of the requested window end.
    pub requested_to: PrimitiveDateTime,
    /// Echo of the requested page limit.
    pub requested_limit: u32,
    /// Oldest timestamp in the batch, if any rows were returned.
    pub actual_from: Option<PrimitiveDateTime>,
    /// Newest timestamp in the batch, if any rows were returned.
    pub actual_to: Option<PrimitiveDateTime>,
    /// Average inter-sample interval in seconds, defined for n > 1.
    pub avg_interval_seconds: Option<f64>,
}

impl FetchResult {
    /// Normalize a page of raw samples and derive its statistics.
    ///
    /// # Errors
    ///
    /// Propagates normalization failures; a malformed row fails the page.
    pub fn from_samples(request: &PageRequest, samples: &[RawSample]) -> Result<Self> {
        let rows = samples
            .iter()
            .map(normalize_sample)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let actual_from = rows.iter().map(|r| r.timestamp).min();
        let actual_to = rows.iter().map(|r| r.timestamp).max();

        let avg_interval_seconds = match (actual_from, actual_to) {
            (Some(from), Some(to)) if rows.len() > 1 => {
                Some((to - from).as_seconds_f64() / (rows.len() - 1) as f64)
            }
            _ => None,
        };

        Ok(Self {
            rows,
            requested_from: request.from,
            requested_to: request.to,
            requested_limit: request.limit,
            actual_from,
            actual_to,
            avg_interval_seconds,
        })
    }
}

/// Why a range operation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The window end walked back to (or past) the requested start.
    ReachedStart,
    /// A page came back empty; no more historical data in range.
    Exhausted,
    /// The API rate-limited the operation (terminal, not retried).
    RateLimited,
    /// The configured request cap was reached.
    RequestCap,
}

/// Outcome of a whole range operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSummary {
    /// Total page requests issued, including failed ones.
    pub requests: u32,
    /// Total rows the sink accepted as new.
    pub total_inserted: usize,
    /// Why the operation stopped.
    pub stop: StopReason,
}

impl FetchSummary {
    /// Whether the operation ended because of rate limiting.
    #[must_use]
    pub fn rate_limited(&self) -> bool {
        self.stop == StopReason::RateLimited
    }
}

/// Options for a range operation.
#[derive(Debug, Clone)]
pub struct RangeOptions {
    /// Window start (inclusive). Must precede `to`.
    pub from: PrimitiveDateTime,
    /// Window end (inclusive).
    pub to: PrimitiveDateTime,
    /// Maximum rows per page. Must be positive.
    pub limit: u32,
    /// Courtesy delay applied before every page request.
    pub sleep: StdDuration,
    /// Optional cap on total page requests, for bounded or test runs.
    pub max_requests: Option<u32>,
}

impl RangeOptions {
    /// Default page limit, matching the API ceiling.
    pub const DEFAULT_LIMIT: u32 = 360;

    /// Create options for a window with the default limit and no delay.
    #[must_use]
    pub fn new(from: PrimitiveDateTime, to: PrimitiveDateTime) -> Self {
        Self {
            from,
            to,
            limit: Self::DEFAULT_LIMIT,
            sleep: StdDuration::ZERO,
            max_requests: None,
        }
    }

    /// Set the page limit.
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the per-request courtesy delay.
    #[must_use]
    pub fn sleep(mut self, sleep: StdDuration) -> Self {
        self.sleep = sleep;
        self
    }

    /// Cap the total number of page requests.
    #[must_use]
    pub fn max_requests(mut self, max_requests: u32) -> Self {
        self.max_requests = Some(max_requests);
        self
    }
}

/// Fetch all readings in `[options.from, options.to]`, walking backward.
///
/// Each successful page is normalized and handed to `sink`; the next window
/// ends one second before the oldest row returned (or one minute earlier
/// than before, when a page makes no progress). Rate limiting stops the
/// operation and is reported in the summary rather than returned as an
/// error; other HTTP errors retreat the window by one hour and continue.
///
/// # Errors
///
/// Returns an error for an invalid range or limit, transport failures,
/// malformed rows, or a sink rejection (including a data conflict under the
/// `error` policy).
pub fn fetch_range<S: AirDataSource>(
    source: &mut S,
    options: &RangeOptions,
    sink: &mut dyn RowSink,
) -> Result<FetchSummary> {
    if options.from >= options.to {
        return Err(Error::InvalidRange(format!(
            "from {} must precede to {}",
            format_timestamp(options.from),
            format_timestamp(options.to)
        )));
    }
    if options.limit == 0 {
        return Err(Error::InvalidRange("page limit must be positive".into()));
    }

    info!(
        "fetching readings from {} to {}",
        format_timestamp(options.from),
        format_timestamp(options.to)
    );

    let mut window_end = options.to;
    let mut requests: u32 = 0;
    let mut total_inserted: usize = 0;

    let stop = loop {
        if window_end <= options.from {
            break StopReason::ReachedStart;
        }
        if options.max_requests.is_some_and(|cap| requests >= cap) {
            info!("request cap reached after {} requests", requests);
            break StopReason::RequestCap;
        }

        if !options.sleep.is_zero() {
            thread::sleep(options.sleep);
        }

        let request = PageRequest {
            from: options.from,
            to: window_end,
            limit: options.limit,
        };
        requests += 1;

        let samples = match source.fetch_page(&request) {
            Ok(samples) => samples,
            Err(Error::RateLimited { .. }) => {
                warn!("rate limit exceeded; stopping after {} requests", requests);
                break StopReason::RateLimited;
            }
            Err(Error::Http { status, message }) => {
                warn!(
                    "HTTP {} fetching {} to {}: {}; retreating window",
                    status,
                    format_timestamp(request.from),
                    format_timestamp(request.to),
                    message
                );
                window_end -= HTTP_ERROR_STEP;
                continue;
            }
            Err(e) => return Err(e),
        };

        let result = FetchResult::from_samples(&request, &samples)?;
        let Some(oldest) = result.actual_from else {
            info!("no more data available");
            break StopReason::Exhausted;
        };

        debug!(
            "page: {} rows, actual range {} to {}, avg interval {:?}s",
            result.rows.len(),
            format_timestamp(oldest),
            result.actual_to.map(format_timestamp).unwrap_or_default(),
            result.avg_interval_seconds
        );

        let inserted = sink.insert(&result.rows).map_err(Error::Sink)?;
        total_inserted += inserted;

        // A page that fails to advance past the window end would loop
        // forever on the same window; step back a full minute instead.
        if oldest >= window_end {
            window_end -= NO_PROGRESS_STEP;
        } else {
            window_end = oldest - BOUNDARY_STEP;
        }
        debug!("next window ends at {}", format_timestamp(window_end));
    };

    info!(
        "complete: {} requests, {} rows inserted",
        requests, total_inserted
    );

    Ok(FetchSummary {
        requests,
        total_inserted,
        stop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockPage, MockSource, raw_sample};
    use awair_types::parse_timestamp;
    use time::macros::datetime;

    fn options(from: &str, to: &str) -> RangeOptions {
        RangeOptions::new(
            parse_timestamp(from).unwrap(),
            parse_timestamp(to).unwrap(),
        )
    }

    #[test]
    fn test_invalid_range_rejected() {
        let mut source = MockSource::new(vec![]);
        let mut sink = Vec::new();

        let opts = options("2025-01-02T00:00:00", "2025-01-01T00:00:00");
        assert!(matches!(
            fetch_range(&mut source, &opts, &mut sink),
            Err(Error::InvalidRange(_))
        ));

        let opts = options("2025-01-01T00:00:00", "2025-01-02T00:00:00").limit(0);
        assert!(matches!(
            fetch_range(&mut source, &opts, &mut sink),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn test_backward_pagination_terminates_on_empty_page() {
        // Two pages of monotonically older rows, then exhaustion.
        let mut source = MockSource::new(vec![
            MockPage::Rows(vec![
                raw_sample("2025-01-01T12:00:00", 70.0),
                raw_sample("2025-01-01T11:00:00", 71.0),
            ]),
            MockPage::Rows(vec![raw_sample("2025-01-01T06:00:00", 72.0)]),
            MockPage::Rows(vec![]),
        ]);
        let mut sink = Vec::new();

        let opts = options("2025-01-01T00:00:00", "2025-01-01T13:00:00");
        let summary = fetch_range(&mut source, &opts, &mut sink).unwrap();

        assert_eq!(summary.stop, StopReason::Exhausted);
        assert_eq!(summary.requests, 3);
        assert_eq!(summary.total_inserted, 3);
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn test_window_steps_back_past_oldest_row() {
        let mut source = MockSource::new(vec![
            MockPage::Rows(vec![
                raw_sample("2025-01-01T12:00:00", 70.0),
                raw_sample("2025-01-01T11:00:00", 71.0),
            ]),
            MockPage::Rows(vec![]),
        ]);
        let mut sink = Vec::new();

        let opts = options("2025-01-01T00:00:00", "2025-01-01T13:00:00");
        fetch_range(&mut source, &opts, &mut sink).unwrap();

        // Second request ends one second before the oldest row of the first.
        assert_eq!(source.requests[1].to, datetime!(2025-01-01 10:59:59));
        // The start never moves.
        assert_eq!(source.requests[1].from, datetime!(2025-01-01 00:00:00));
    }

    #[test]
    fn test_rate_limit_short_circuits() {
        let mut source = MockSource::new(vec![
            MockPage::Rows(vec![raw_sample("2025-01-01T12:00:00", 70.0)]),
            MockPage::RateLimited,
        ]);
        let mut sink = Vec::new();

        let opts = options("2025-01-01T00:00:00", "2025-01-01T13:00:00");
        let summary = fetch_range(&mut source, &opts, &mut sink).unwrap();

        assert!(summary.rate_limited());
        assert_eq!(summary.requests, 2);
        // Exactly the one successful page made it to the sink.
        assert_eq!(summary.total_inserted, 1);
    }

    #[test]
    fn test_http_error_retreats_one_hour_and_continues() {
        let mut source = MockSource::new(vec![
            MockPage::HttpError(500),
            MockPage::Rows(vec![]),
        ]);
        let mut sink = Vec::new();

        let opts = options("2025-01-01T00:00:00", "2025-01-01T13:00:00");
        let summary = fetch_range(&mut source, &opts, &mut sink).unwrap();

        assert_eq!(summary.stop, StopReason::Exhausted);
        assert_eq!(summary.requests, 2);
        assert_eq!(source.requests[1].to, datetime!(2025-01-01 12:00:00));
    }

    #[test]
    fn test_repeated_http_errors_bounded_by_range_start() {
        // Every request fails; the window retreats an hour at a time until
        // it crosses the start.
        let mut source = MockSource::new(vec![
            MockPage::HttpError(502),
            MockPage::HttpError(502),
            MockPage::HttpError(502),
        ]);
        let mut sink = Vec::new();

        let opts = options("2025-01-01T10:30:00", "2025-01-01T13:00:00");
        let summary = fetch_range(&mut source, &opts, &mut sink).unwrap();

        assert_eq!(summary.stop, StopReason::ReachedStart);
        assert_eq!(summary.requests, 3);
        assert_eq!(summary.total_inserted, 0);
    }

    #[test]
    fn test_no_progress_page_forces_minute_step() {
        // The page's oldest row sits exactly at the window end.
        let mut source = MockSource::new(vec![
            MockPage::Rows(vec![raw_sample("2025-01-01T13:00:00", 70.0)]),
            MockPage::Rows(vec![]),
        ]);
        let mut sink = Vec::new();

        let opts = options("2025-01-01T00:00:00", "2025-01-01T13:00:00");
        fetch_range(&mut source, &opts, &mut sink).unwrap();

        assert_eq!(source.requests[1].to, datetime!(2025-01-01 12:59:00));
    }

    #[test]
    fn test_request_cap_stops_early() {
        let mut source = MockSource::new(vec![
            MockPage::Rows(vec![raw_sample("2025-01-01T12:00:00", 70.0)]),
            MockPage::Rows(vec![raw_sample("2025-01-01T06:00:00", 71.0)]),
        ]);
        let mut sink = Vec::new();

        let opts = options("2025-01-01T00:00:00", "2025-01-01T13:00:00").max_requests(1);
        let summary = fetch_range(&mut source, &opts, &mut sink).unwrap();

        assert_eq!(summary.stop, StopReason::RequestCap);
        assert_eq!(summary.requests, 1);
        assert_eq!(summary.total_inserted, 1);
    }

    #[test]
    fn test_malformed_row_propagates() {
        let mut bad = raw_sample("2025-01-01T12:00:00", 70.0);
        bad.sensors.retain(|s| s.comp != "voc");

        let mut source = MockSource::new(vec![MockPage::Rows(vec![bad])]);
        let mut sink = Vec::new();

        let opts = options("2025-01-01T00:00:00", "2025-01-01T13:00:00");
        assert!(matches!(
            fetch_range(&mut source, &opts, &mut sink),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_fetch_result_statistics() {
        let request = PageRequest {
            from: datetime!(2025-01-01 00:00:00),
            to: datetime!(2025-01-01 13:00:00),
            limit: 360,
        };
        let samples = vec![
            raw_sample("2025-01-01T12:00:00", 70.0),
            raw_sample("2025-01-01T12:01:00", 70.5),
            raw_sample("2025-01-01T12:02:00", 71.0),
        ];

        let result = FetchResult::from_samples(&request, &samples).unwrap();
        assert_eq!(result.actual_from, Some(datetime!(2025-01-01 12:00:00)));
        assert_eq!(result.actual_to, Some(datetime!(2025-01-01 12:02:00)));
        assert_eq!(result.avg_interval_seconds, Some(60.0));

        let empty = FetchResult::from_samples(&request, &[]).unwrap();
        assert!(empty.actual_from.is_none());
        assert!(empty.avg_interval_seconds.is_none());
    }
}
