use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::consistency::{AggregationMode, DayBuckets};
use crate::error::{EngineError, EngineResult};

pub const DEFAULT_WEEKS: u32 = 20;
pub const DEFAULT_MAX_VALUE: f64 = 4.0;
pub const MAX_INTENSITY: u8 = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapSpec {
    pub weeks: u32,
    pub mode: AggregationMode,
    /// Value that maps to full intensity. Only read in magnitude mode.
    pub max_value: f64,
}

impl Default for HeatmapSpec {
    fn default() -> Self {
        Self {
            weeks: DEFAULT_WEEKS,
            mode: AggregationMode::Habit,
            max_value: DEFAULT_MAX_VALUE,
        }
    }
}

impl HeatmapSpec {
    pub fn habit(weeks: u32) -> Self {
        Self {
            weeks,
            ..Self::default()
        }
    }

    pub fn magnitude(weeks: u32, max_value: f64) -> Self {
        Self {
            weeks,
            mode: AggregationMode::Magnitude,
            max_value,
        }
    }

    fn validate(&self) -> EngineResult<()> {
        if self.mode == AggregationMode::Magnitude
            && !(self.max_value.is_finite() && self.max_value > 0.0)
        {
            return Err(EngineError::Configuration(format!(
                "magnitude scale must be positive, got {}",
                self.max_value
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapCell {
    pub date: NaiveDate,
    pub raw_value: f64,
    pub intensity: u8,
    pub is_future: bool,
}

/// First and last day of the grid: whole weeks ending on the Saturday on or
/// after `today`.
pub fn window(weeks: u32, today: NaiveDate) -> EngineResult<(NaiveDate, NaiveDate)> {
    if weeks == 0 {
        return Err(EngineError::Configuration(
            "heatmap must span at least one week".to_string(),
        ));
    }
    let to_saturday = 6 - today.weekday().num_days_from_sunday();
    let span = u64::from(weeks) * 7 - 1;
    let end = today.checked_add_days(Days::new(u64::from(to_saturday)));
    let start = end.and_then(|end| end.checked_sub_days(Days::new(span)));
    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(EngineError::Configuration(format!(
            "{weeks} week window around {today} is outside the supported calendar"
        ))),
    }
}

/// Intensity bucket in `0..=4` for a day's value.
pub fn intensity(value: f64, mode: AggregationMode, max_value: f64) -> u8 {
    if value <= 0.0 || value.is_nan() {
        return 0;
    }
    match mode {
        AggregationMode::Habit => 1,
        AggregationMode::Magnitude => {
            let scaled = (value / max_value * f64::from(MAX_INTENSITY)).ceil();
            scaled.min(f64::from(MAX_INTENSITY)) as u8
        }
    }
}

/// Lays out `spec.weeks * 7` cells in ascending date order.
///
/// Cells after `today` are flagged future and carry no value or intensity,
/// whatever the buckets say.
pub fn build_grid(
    buckets: &DayBuckets,
    spec: &HeatmapSpec,
    today: NaiveDate,
) -> EngineResult<Vec<HeatmapCell>> {
    spec.validate()?;
    let (start, end) = window(spec.weeks, today)?;

    let cells: Vec<HeatmapCell> = start
        .iter_days()
        .take_while(|date| *date <= end)
        .map(|date| {
            if date > today {
                return HeatmapCell {
                    date,
                    raw_value: 0.0,
                    intensity: 0,
                    is_future: true,
                };
            }
            let raw_value = buckets.get(date);
            HeatmapCell {
                date,
                raw_value,
                intensity: intensity(raw_value, spec.mode, spec.max_value),
                is_future: false,
            }
        })
        .collect();

    tracing::trace!(%start, %end, cells = cells.len(), "built heatmap grid");
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consistency::{aggregate, DatedEvent};
    use crate::streak::CompletionSet;
    use chrono::{Utc, Weekday};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn grid_has_whole_weeks_ending_saturday() {
        let today = day(2024, 5, 12);
        for weeks in [1, 4, 20] {
            let cells = build_grid(&DayBuckets::new(), &HeatmapSpec::habit(weeks), today).unwrap();
            assert_eq!(cells.len(), weeks as usize * 7);
            assert!(cells.windows(2).all(|pair| pair[0].date.succ_opt() == Some(pair[1].date)));
            let last = cells.last().unwrap();
            assert_eq!(last.date.weekday(), Weekday::Sat);
            assert_eq!(cells[0].date.weekday(), Weekday::Sun);
        }
    }

    #[test]
    fn saturday_today_ends_the_grid() {
        let today = day(2024, 5, 18);
        let (start, end) = window(1, today).unwrap();
        assert_eq!(end, today);
        assert_eq!(start, day(2024, 5, 12));
    }

    #[test]
    fn default_window_spans_twenty_weeks() {
        let (start, end) = window(DEFAULT_WEEKS, day(2024, 5, 15)).unwrap();
        assert_eq!(end, day(2024, 5, 18));
        assert_eq!((end - start).num_days(), 139);
    }

    #[test]
    fn future_cells_are_masked() {
        let today = day(2024, 5, 14);
        let events = [
            DatedEvent::on(day(2024, 5, 14), 30.0),
            DatedEvent::on(day(2024, 5, 16), 60.0),
        ];
        let buckets = aggregate(&events, AggregationMode::Magnitude, &Utc).unwrap();
        let cells = build_grid(&buckets, &HeatmapSpec::magnitude(1, 60.0), today).unwrap();

        let today_cell = cells.iter().find(|cell| cell.date == today).unwrap();
        assert!(!today_cell.is_future);
        assert_eq!(today_cell.intensity, 2);

        for cell in cells.iter().filter(|cell| cell.date > today) {
            assert!(cell.is_future);
            assert_eq!(cell.intensity, 0);
            assert_eq!(cell.raw_value, 0.0);
        }
        assert_eq!(cells.iter().filter(|cell| cell.is_future).count(), 4);
    }

    #[test]
    fn magnitude_intensity_buckets() {
        let mode = AggregationMode::Magnitude;
        assert_eq!(intensity(15.0, mode, 60.0), 1);
        assert_eq!(intensity(16.0, mode, 60.0), 2);
        assert_eq!(intensity(45.0, mode, 60.0), 3);
        assert_eq!(intensity(60.0, mode, 60.0), 4);
        assert_eq!(intensity(0.0, mode, 60.0), 0);
        assert_eq!(intensity(61.0, mode, 60.0), 4);
        assert_eq!(intensity(1.0, mode, 4.0), 1);
    }

    #[test]
    fn habit_intensity_is_binary() {
        let today = day(2024, 5, 12);
        let completions: CompletionSet = [day(2024, 5, 11), today].into_iter().collect();
        let buckets = DayBuckets::from_completions(&completions);
        let cells = build_grid(&buckets, &HeatmapSpec::habit(2), today).unwrap();
        let marked: Vec<_> = cells.iter().filter(|cell| cell.intensity > 0).collect();
        assert_eq!(marked.len(), 2);
        assert!(marked.iter().all(|cell| cell.intensity == 1));
    }

    #[test]
    fn rejects_unusable_configuration() {
        let today = day(2024, 5, 12);
        let buckets = DayBuckets::new();
        for max_value in [0.0, -60.0, f64::NAN] {
            assert!(matches!(
                build_grid(&buckets, &HeatmapSpec::magnitude(4, max_value), today),
                Err(EngineError::Configuration(_))
            ));
        }
        assert!(build_grid(&buckets, &HeatmapSpec::habit(0), today).is_err());
        let habit_ignores_scale = HeatmapSpec {
            max_value: 0.0,
            ..HeatmapSpec::habit(4)
        };
        assert!(build_grid(&buckets, &habit_ignores_scale, today).is_ok());
    }

    #[test]
    fn empty_window_is_a_configuration_error() {
        assert!(matches!(
            window(0, day(2024, 5, 12)),
            Err(EngineError::Configuration(_))
        ));
    }
}
