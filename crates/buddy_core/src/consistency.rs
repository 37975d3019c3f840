use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::date_key::{format_day_identity, format_iso_day, local_day, parse_day, parse_instant};
use crate::error::{EngineError, EngineResult};
use crate::streak::CompletionSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    /// A day counts once if anything happened on it.
    #[default]
    Habit,
    /// A day's value is the sum of its event magnitudes.
    Magnitude,
}

/// When an event happened: a precise instant, or a bare calendar day such as
/// a task's due date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum EventTime {
    Instant(DateTime<Utc>),
    Day(NaiveDate),
}

impl EventTime {
    pub fn local_day<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        match self {
            EventTime::Instant(instant) => local_day(&instant.with_timezone(tz)),
            EventTime::Day(day) => *day,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DatedEvent {
    pub timestamp: EventTime,
    pub magnitude: f64,
}

impl DatedEvent {
    pub fn at(instant: DateTime<Utc>, magnitude: f64) -> Self {
        Self {
            timestamp: EventTime::Instant(instant),
            magnitude,
        }
    }

    pub fn on(day: NaiveDate, magnitude: f64) -> Self {
        Self {
            timestamp: EventTime::Day(day),
            magnitude,
        }
    }

    /// Builds an event from a stored date string: either a bare day key or an
    /// instant. Instants without an offset are wall-clock time in `tz`.
    pub fn parse<Tz: TimeZone>(input: &str, magnitude: f64, tz: &Tz) -> EngineResult<Self> {
        if let Ok(day) = parse_day(input) {
            return Ok(Self::on(day, magnitude));
        }
        parse_instant(input, tz).map(|instant| Self::at(instant.with_timezone(&Utc), magnitude))
    }
}

/// Sparse day to value mapping. Days without events have no entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayBuckets {
    values: BTreeMap<NaiveDate, f64>,
}

impl DayBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// One presence bucket per completed day.
    pub fn from_completions(completions: &CompletionSet) -> Self {
        Self {
            values: completions.iter().map(|day| (day, 1.0)).collect(),
        }
    }

    /// Value for `day`, zero when absent.
    pub fn get(&self, day: NaiveDate) -> f64 {
        self.values.get(&day).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.values.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values.iter().map(|(day, value)| (*day, *value))
    }

    /// Buckets falling inside `range`.
    pub fn within(&self, range: RangeInclusive<NaiveDate>) -> Self {
        if range.start() > range.end() {
            return Self::new();
        }
        Self {
            values: self
                .values
                .range(range)
                .map(|(day, value)| (*day, *value))
                .collect(),
        }
    }

    /// String-keyed view using the key encoding each mode is stored under.
    pub fn keyed(&self, mode: AggregationMode) -> BTreeMap<String, f64> {
        let encode: fn(NaiveDate) -> String = match mode {
            AggregationMode::Habit => format_day_identity,
            AggregationMode::Magnitude => format_iso_day,
        };
        self.values
            .iter()
            .map(|(day, value)| (encode(*day), *value))
            .collect()
    }

    fn add(&mut self, day: NaiveDate, amount: f64) {
        *self.values.entry(day).or_insert(0.0) += amount;
    }
}

/// Folds dated events into per-day buckets on the calendar of `tz`.
///
/// Zero-magnitude events contribute nothing in magnitude mode, so no bucket
/// ever holds zero. Magnitudes are only validated in magnitude mode.
pub fn aggregate<Tz: TimeZone>(
    events: &[DatedEvent],
    mode: AggregationMode,
    tz: &Tz,
) -> EngineResult<DayBuckets> {
    let mut buckets = DayBuckets::new();
    for event in events {
        let day = event.timestamp.local_day(tz);
        match mode {
            AggregationMode::Habit => {
                buckets.values.insert(day, 1.0);
            }
            AggregationMode::Magnitude => {
                let value = event.magnitude;
                if !value.is_finite() || value < 0.0 {
                    return Err(EngineError::InvalidMagnitude { value });
                }
                if value > 0.0 {
                    buckets.add(day, value);
                }
            }
        }
    }
    tracing::debug!(
        events = events.len(),
        days = buckets.len(),
        ?mode,
        "aggregated dated events"
    );
    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn instant(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn sessions() -> Vec<DatedEvent> {
        vec![
            DatedEvent::at(instant("2024-05-12T08:00:00Z"), 25.0),
            DatedEvent::at(instant("2024-05-12T15:30:00Z"), 50.0),
            DatedEvent::at(instant("2024-05-10T09:00:00Z"), 25.0),
            DatedEvent::at(instant("2024-05-11T09:00:00Z"), 0.0),
            DatedEvent::on(day(2024, 5, 11), 1.0),
        ]
    }

    #[test]
    fn magnitude_mode_sums_per_day() {
        let buckets = aggregate(&sessions(), AggregationMode::Magnitude, &Utc).unwrap();
        assert_eq!(buckets.get(day(2024, 5, 12)), 75.0);
        assert_eq!(buckets.get(day(2024, 5, 10)), 25.0);
        assert_eq!(buckets.get(day(2024, 5, 11)), 1.0);
        assert_eq!(buckets.get(day(2024, 5, 9)), 0.0);
    }

    #[test]
    fn output_is_sparse_and_preserves_totals() {
        let events = sessions();
        let buckets = aggregate(&events, AggregationMode::Magnitude, &Utc).unwrap();
        assert!(buckets.iter().all(|(_, value)| value > 0.0));
        let input_total: f64 = events.iter().map(|event| event.magnitude).sum();
        assert_eq!(buckets.total(), input_total);
    }

    #[test]
    fn habit_mode_records_presence_only() {
        let buckets = aggregate(&sessions(), AggregationMode::Habit, &Utc).unwrap();
        assert_eq!(buckets.len(), 3);
        assert!(buckets.iter().all(|(_, value)| value == 1.0));
    }

    #[test]
    fn input_order_does_not_matter() {
        let mut reversed = sessions();
        reversed.reverse();
        assert_eq!(
            aggregate(&sessions(), AggregationMode::Magnitude, &Utc).unwrap(),
            aggregate(&reversed, AggregationMode::Magnitude, &Utc).unwrap()
        );
    }

    #[test]
    fn instants_land_on_the_local_day() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let events = [DatedEvent::at(instant("2024-05-13T03:00:00Z"), 30.0)];
        let buckets = aggregate(&events, AggregationMode::Magnitude, &tz).unwrap();
        assert_eq!(buckets.get(day(2024, 5, 12)), 30.0);
        assert_eq!(buckets.get(day(2024, 5, 13)), 0.0);
    }

    #[test]
    fn rejects_negative_magnitudes() {
        let events = [DatedEvent::on(day(2024, 5, 12), -5.0)];
        assert_eq!(
            aggregate(&events, AggregationMode::Magnitude, &Utc),
            Err(EngineError::InvalidMagnitude { value: -5.0 })
        );
        assert!(aggregate(&events, AggregationMode::Habit, &Utc).is_ok());
    }

    #[test]
    fn empty_input_gives_empty_buckets() {
        let buckets = aggregate(&[], AggregationMode::Magnitude, &Utc).unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn keyed_view_uses_mode_encoding() {
        let buckets = aggregate(&sessions(), AggregationMode::Magnitude, &Utc).unwrap();
        let iso = buckets.keyed(AggregationMode::Magnitude);
        assert_eq!(iso.get("2024-05-12"), Some(&75.0));
        let identity = buckets.keyed(AggregationMode::Habit);
        assert_eq!(identity.get("Sun May 12 2024"), Some(&75.0));
    }

    #[test]
    fn window_keeps_only_days_in_range() {
        let buckets = aggregate(&sessions(), AggregationMode::Magnitude, &Utc).unwrap();
        let window = buckets.within(day(2024, 5, 11)..=day(2024, 5, 12));
        assert_eq!(window.len(), 2);
        assert_eq!(window.get(day(2024, 5, 10)), 0.0);
    }

    #[test]
    fn parses_stored_timestamps() {
        let due = DatedEvent::parse("2024-05-12", 1.0, &Utc).unwrap();
        assert_eq!(due.timestamp, EventTime::Day(day(2024, 5, 12)));
        let session = DatedEvent::parse("2024-05-12T08:00:00.000Z", 25.0, &Utc).unwrap();
        assert_eq!(session.timestamp.local_day(&Utc), day(2024, 5, 12));
        assert!(DatedEvent::parse("not a date", 1.0, &Utc).is_err());
    }

    #[test]
    fn offsetless_instants_agree_with_local_day_of() {
        let tz = chrono::FixedOffset::east_opt(9 * 3600).unwrap();
        let input = "2024-05-12T20:00:00";
        let event = DatedEvent::parse(input, 1.0, &tz).unwrap();
        assert_eq!(event.timestamp.local_day(&tz), day(2024, 5, 12));
        assert_eq!(
            crate::date_key::local_day_of(input, &tz).unwrap(),
            event.timestamp.local_day(&tz)
        );
    }
}
