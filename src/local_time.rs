//! # UTC → local wall-clock conversion
//!
//! The timezone API gives one offset for "now"; that offset is applied flatly
//! to every sample of the cycle. There is no timezone database and no DST
//! rule lookup, so a day window that crosses a DST change will show the tides
//! after the change one hour off.
//!
//! Timestamps must have the exact shape `YYYY-MM-DDTHH:MM:SS`, optionally
//! followed by `Z`. Fractional seconds and numeric offsets are rejected.

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

use crate::{LocalTideEvent, TideLevel, TideSample};

const UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Error, Debug, PartialEq)]
pub enum TimeError {
    #[error("unparsable timestamp {timestamp:?}: {reason}")]
    Parse { timestamp: String, reason: String },

    #[error("local time out of range for {timestamp:?} at UTC{offset_hours:+}")]
    OutOfRange { timestamp: String, offset_hours: f64 },

    #[error("UTC offset {offset_hours} h is not a representable duration")]
    Offset { offset_hours: f64 },
}

/// Parse a `Z`-suffixed UTC timestamp into a naive date-time.
pub fn parse_utc(timestamp: &str) -> Result<NaiveDateTime, TimeError> {
    let trimmed = timestamp.strip_suffix('Z').unwrap_or(timestamp);
    NaiveDateTime::parse_from_str(trimmed, UTC_FORMAT).map_err(|e| TimeError::Parse {
        timestamp: timestamp.to_string(),
        reason: e.to_string(),
    })
}

/// Offset in (possibly fractional) hours as a duration, to the millisecond.
pub fn offset_duration(offset_hours: f64) -> Result<Duration, TimeError> {
    let millis = (offset_hours * 3_600_000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return Err(TimeError::Offset { offset_hours });
    }
    Duration::try_milliseconds(millis as i64).ok_or(TimeError::Offset { offset_hours })
}

/// Shift a naive UTC date-time by a flat offset.
pub fn shift(utc: NaiveDateTime, offset_hours: f64) -> Result<NaiveDateTime, TimeError> {
    utc.checked_add_signed(offset_duration(offset_hours)?)
        .ok_or_else(|| TimeError::OutOfRange {
            timestamp: utc.format(UTC_FORMAT).to_string(),
            offset_hours,
        })
}

/// Shift a UTC timestamp by a flat offset.
///
/// ```
/// use chrono::NaiveDate;
/// use tide_clock_lib::local_time::to_local;
///
/// let local = to_local("2024-01-01T10:00:00Z", 12.0).unwrap();
/// let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
///     .unwrap()
///     .and_hms_opt(22, 0, 0)
///     .unwrap();
/// assert_eq!(local, expected);
/// ```
pub fn to_local(timestamp: &str, offset_hours: f64) -> Result<NaiveDateTime, TimeError> {
    let utc = parse_utc(timestamp)?;
    utc.checked_add_signed(offset_duration(offset_hours)?)
        .ok_or_else(|| TimeError::OutOfRange {
            timestamp: timestamp.to_string(),
            offset_hours,
        })
}

/// Localise and classify every sample, keeping order and count.
pub fn normalize(
    samples: &[TideSample],
    offset_hours: f64,
) -> Result<Vec<LocalTideEvent>, TimeError> {
    samples
        .iter()
        .map(|sample| {
            Ok(LocalTideEvent {
                local_time: to_local(&sample.time, offset_hours)?,
                height_m: sample.height_m,
                level: TideLevel::classify(sample.height_m),
            })
        })
        .collect()
}
