//! Timestamp parsing for store-provided date-times.
//!
//! Accepted inputs (surrounding whitespace is ignored):
//! - RFC 3339 with a `Z` marker: `2024-05-01T12:00:00Z`, `2024-05-01T12:00:00.123Z`
//! - RFC 3339 with an explicit offset: `2024-05-01T14:00:00+02:00`
//! - Postgres text form: `2024-05-01 12:00:00.123456+00`, `...+0200`, `...+02:00`
//! - No offset at all: `2024-05-01T12:00:00.123456` (read as UTC)
//!
//! Every accepted input is normalized to `DateTime<Utc>`.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("timestamp is empty")]
    Empty,

    #[error("unrecognized timestamp format: {value:?}")]
    Malformed { value: String },
}

/// Parse a stored timestamp into UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TimestampError::Empty);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    // A trailing zero-offset marker is the same instant as "+00:00".
    let normalized = match trimmed.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{rest}+00:00"),
        None => trimmed.to_string(),
    };

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Ok(naive.and_utc());
        }
    }

    Err(TimestampError::Malformed {
        value: trimmed.to_string(),
    })
}
