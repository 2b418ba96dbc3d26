//! Naive-timestamp parsing and formatting.
//!
//! All timestamps in the pipeline are timezone-naive. Zone-aware inputs
//! (RFC 3339 with `Z` or an offset) are converted to UTC and then stripped
//! at the parse boundary, so mixed naive/aware comparisons can never occur
//! downstream.

use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::{ParseError, ParseResult};

/// Naive ISO-8601 format, seconds resolution with optional subseconds.
const NAIVE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
);

/// Format used when emitting timestamps (query parameters, JSONL, logs).
const DISPLAY_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Parse a timestamp string into a naive datetime.
///
/// Accepts RFC 3339 (`2025-01-01T00:00:00Z`, `2025-01-01T00:00:00+02:00`),
/// which is normalized to UTC before the offset is stripped, and plain naive
/// ISO-8601 (`2025-01-01T00:00:00`, with or without fractional seconds).
///
/// # Errors
///
/// Returns [`ParseError::InvalidTimestamp`] if the input matches neither
/// format.
pub fn parse_timestamp(input: &str) -> ParseResult<PrimitiveDateTime> {
    if let Ok(aware) = OffsetDateTime::parse(input, &Rfc3339) {
        let utc = aware.to_offset(time::UtcOffset::UTC);
        return Ok(PrimitiveDateTime::new(utc.date(), utc.time()));
    }

    PrimitiveDateTime::parse(input, NAIVE_FORMAT).map_err(|e| ParseError::InvalidTimestamp {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Format a naive datetime as `YYYY-MM-DDTHH:MM:SS`.
pub fn format_timestamp(ts: PrimitiveDateTime) -> String {
    // The display format has no fallible components.
    ts.format(DISPLAY_FORMAT)
        .unwrap_or_else(|_| ts.to_string())
}

/// Serde support for naive timestamps in the display format.
#[cfg(feature = "serde")]
pub mod serde {
    use ::serde::{Deserialize, Deserializer, Serializer, de::Error as _};
    use time::PrimitiveDateTime;

    /// Serialize a naive timestamp as `YYYY-MM-DDTHH:MM:SS`.
    pub fn serialize<S: Serializer>(
        ts: &PrimitiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(*ts))
    }

    /// Deserialize a naive timestamp, accepting RFC 3339 or naive ISO-8601.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<PrimitiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_timestamp(&s).map_err(D::Error::custom)
    }
}
