//! Timestamp normalization for the source's two clock formats.
//!
//! The incident table reports either a full date-time (`2024-05-01 08:00:00`)
//! or a bare clock time (`8:45 PM`) depending on the view. Both must reduce
//! to an hour-of-day for the per-hour statistics and to something totally
//! ordered for "most recent incident". A string matching neither format is an
//! [`UnparseableTime`] — callers log it and skip time-dependent updates, but
//! keep processing the record's other fields.

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;

/// Full date-time format used by the historical views.
const FULL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Bare clock-time format used by the live table.
const CLOCK_FORMAT: &str = "%I:%M %p";

/// A timestamp string matched neither recognized format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unparseable timestamp: {raw:?}")]
pub struct UnparseableTime {
    /// The offending raw string, for the operator log.
    pub raw: String,
}

/// A parsed incident timestamp.
///
/// Totally ordered so "most recent" is well-defined over a mixed store:
/// bare clock times (no date) order before any fully dated stamp, and within
/// each variant ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IncidentTime {
    /// A clock time with no date attached.
    Clock(NaiveTime),
    /// A full date and time.
    Full(NaiveDateTime),
}

impl IncidentTime {
    /// Hour of day, 0–23.
    #[must_use]
    pub fn hour(&self) -> u32 {
        match self {
            Self::Clock(time) => time.hour(),
            Self::Full(datetime) => datetime.time().hour(),
        }
    }
}

/// Attempts the fixed, ordered list of timestamp formats and returns the
/// first successful parse.
///
/// # Errors
///
/// Returns [`UnparseableTime`] carrying the raw input when no format matches.
pub fn parse_incident_time(raw: &str) -> Result<IncidentTime, UnparseableTime> {
    let trimmed = raw.trim();
    if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, FULL_FORMAT) {
        return Ok(IncidentTime::Full(datetime));
    }
    if let Ok(time) = NaiveTime::parse_from_str(trimmed, CLOCK_FORMAT) {
        return Ok(IncidentTime::Clock(time));
    }
    Err(UnparseableTime {
        raw: raw.to_string(),
    })
}
