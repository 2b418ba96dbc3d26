//! Analysis over stored readings: timing gaps and daily record counts.

use time::{Date, Duration, PrimitiveDateTime};

use awair_types::Reading;

/// A gap between two consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    /// Timestamp of the sample before the gap.
    pub start: PrimitiveDateTime,
    /// Timestamp of the sample after the gap.
    pub end: PrimitiveDateTime,
}

impl Gap {
    /// Length of the gap.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// The `count` largest gaps between consecutive readings, longest first.
///
/// `readings` must be sorted ascending by timestamp (as the store yields
/// them). Gaps shorter than `min_gap`, when given, are ignored.
#[must_use]
pub fn largest_gaps(readings: &[Reading], count: usize, min_gap: Option<Duration>) -> Vec<Gap> {
    let mut gaps: Vec<Gap> = readings
        .windows(2)
        .map(|pair| Gap {
            start: pair[0].timestamp,
            end: pair[1].timestamp,
        })
        .filter(|gap| min_gap.is_none_or(|min| gap.duration() >= min))
        .collect();

    gaps.sort_by_key(|gap| std::cmp::Reverse(gap.duration()));
    gaps.truncate(count);
    gaps
}

/// Record counts per calendar day, in date order.
#[must_use]
pub fn daily_counts(readings: &[Reading]) -> Vec<(Date, usize)> {
    let mut counts: std::collections::BTreeMap<Date, usize> = std::collections::BTreeMap::new();
    for reading in readings {
        *counts.entry(reading.timestamp.date()).or_default() += 1;
    }
    counts.into_iter().collect()
}
