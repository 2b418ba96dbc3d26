//! Scripted data source for testing.
//!
//! [`MockSource`] plays back a fixed script of page outcomes and records
//! every request it receives, so tests can drive the backfill loop without
//! a network and assert on the exact windows it asked for.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::source::{AirDataSource, PageRequest, RawSample, RawSensor};

/// One scripted page outcome.
#[derive(Debug, Clone)]
pub enum MockPage {
    /// A successful page with the given samples.
    Rows(Vec<RawSample>),
    /// HTTP 429.
    RateLimited,
    /// Any other HTTP error with the given status.
    HttpError(u16),
}

/// A data source that plays back a script of page outcomes.
///
/// Once the script runs out, every further request returns an empty page,
/// matching an exhausted range.
#[derive(Debug, Default)]
pub struct MockSource {
    script: VecDeque<MockPage>,
    /// Every request received, in order.
    pub requests: Vec<PageRequest>,
}

impl MockSource {
    /// Create a source that plays the given pages in order.
    #[must_use]
    pub fn new(script: Vec<MockPage>) -> Self {
        Self {
            script: script.into(),
            requests: Vec::new(),
        }
    }
}

impl AirDataSource for MockSource {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<Vec<RawSample>> {
        self.requests.push(request.clone());

        match self.script.pop_front() {
            Some(MockPage::Rows(samples)) => Ok(samples),
            Some(MockPage::RateLimited) => Err(Error::RateLimited {
                from: request.from.to_string(),
                to: request.to.to_string(),
            }),
            Some(MockPage::HttpError(status)) => Err(Error::Http {
                status,
                message: "scripted failure".to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

/// Build a complete raw sample at `timestamp` with `temp` set to `temp` and
/// the remaining fields at fixed baseline values.
#[must_use]
pub fn raw_sample(timestamp: &str, temp: f64) -> RawSample {
    let sensor = |comp: &str, value: f64| RawSensor {
        comp: comp.to_string(),
        value,
    };

    RawSample {
        timestamp: timestamp.to_string(),
        sensors: vec![
            sensor("temp", temp),
            sensor("co2", 400.0),
            sensor("pm10", 5.0),
            sensor("pm25", 3.0),
            sensor("humid", 40.0),
            sensor("voc", 100.0),
        ],
    }
}
