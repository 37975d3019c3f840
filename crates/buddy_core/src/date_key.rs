use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// `Sun May 12 2024`, the key shape used for habit completion sets.
pub const DAY_IDENTITY_FORMAT: &str = "%a %b %d %Y";
/// `2024-05-12`, the key shape used for task and focus aggregation.
pub const ISO_DAY_FORMAT: &str = "%Y-%m-%d";

const NAIVE_INSTANT_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DayClass {
    Past,
    Today,
    Future,
}

/// Calendar day of `instant` in its own timezone. Time of day is discarded.
pub fn local_day<Tz: TimeZone>(instant: &DateTime<Tz>) -> NaiveDate {
    instant.date_naive()
}

pub fn day_identity<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    format_day_identity(local_day(instant))
}

pub fn iso_day_key<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    format_iso_day(local_day(instant))
}

pub fn format_day_identity(day: NaiveDate) -> String {
    day.format(DAY_IDENTITY_FORMAT).to_string()
}

pub fn format_iso_day(day: NaiveDate) -> String {
    day.format(ISO_DAY_FORMAT).to_string()
}

/// Parses a calendar-day key in either encoding.
///
/// A day-identity key whose weekday disagrees with its date is rejected
/// rather than silently corrected.
pub fn parse_day(input: &str) -> EngineResult<NaiveDate> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, ISO_DAY_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(trimmed, DAY_IDENTITY_FORMAT))
        .map_err(|_| invalid(input))
}

/// Parses an instant and re-expresses it in `tz`.
///
/// RFC 3339 strings carry their own offset. Strings without an offset are
/// read as wall-clock time in `tz`; a wall-clock time that does not exist in
/// `tz` (a DST gap) is rejected.
pub fn parse_instant<Tz: TimeZone>(input: &str, tz: &Tz) -> EngineResult<DateTime<Tz>> {
    let trimmed = input.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(tz));
    }
    for format in NAIVE_INSTANT_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return tz
                .from_local_datetime(&naive)
                .earliest()
                .ok_or_else(|| invalid(input));
        }
    }
    Err(invalid(input))
}

/// Resolves any accepted date or instant string to the local calendar day.
///
/// Bare day keys are taken as-is; they already name a calendar day and are
/// never shifted through UTC.
pub fn local_day_of<Tz: TimeZone>(input: &str, tz: &Tz) -> EngineResult<NaiveDate> {
    if let Ok(day) = parse_day(input) {
        return Ok(day);
    }
    parse_instant(input, tz).map(|instant| local_day(&instant))
}

pub fn classify(day: NaiveDate, today: NaiveDate) -> DayClass {
    match day.cmp(&today) {
        Ordering::Less => DayClass::Past,
        Ordering::Equal => DayClass::Today,
        Ordering::Greater => DayClass::Future,
    }
}

fn invalid(input: &str) -> EngineError {
    EngineError::InvalidDate {
        input: input.to_string(),
    }
}
