use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use buddy_core::{aggregate, AggregationMode, DatedEvent, DayBuckets, EngineResult};
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Collection;

pub const FOCUS_HISTORY: Collection<FocusLog> = Collection::new("flow_history");

/// Floor for the weekly chart scale, in minutes.
pub const CHART_MIN_SCALE: u32 = 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FocusMode {
    Pomo,
    Sprint,
    Custom,
    Flow,
    Short,
    Long,
}

impl FocusMode {
    /// Breaks are never logged.
    pub fn is_work(self) -> bool {
        !matches!(self, Self::Short | Self::Long)
    }
}

impl FromStr for FocusMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pomo" => Ok(Self::Pomo),
            "sprint" => Ok(Self::Sprint),
            "custom" => Ok(Self::Custom),
            "flow" => Ok(Self::Flow),
            "short" => Ok(Self::Short),
            "long" => Ok(Self::Long),
            other => Err(anyhow!("unknown focus mode `{other}`")),
        }
    }
}

impl fmt::Display for FocusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pomo => "pomo",
            Self::Sprint => "sprint",
            Self::Custom => "custom",
            Self::Flow => "flow",
            Self::Short => "short",
            Self::Long => "long",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusSession {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub mode: FocusMode,
}

impl FocusSession {
    pub fn as_event(&self) -> DatedEvent {
        DatedEvent::at(self.date, f64::from(self.duration_minutes))
    }
}

/// Completed work sessions, newest first. Sessions are only ever appended.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct FocusLog {
    sessions: Vec<FocusSession>,
}

impl FocusLog {
    pub fn sessions(&self) -> &[FocusSession] {
        &self.sessions
    }

    /// Logs a finished session. Break modes are ignored and yield `None`.
    pub fn record(
        &mut self,
        mode: FocusMode,
        duration_minutes: u32,
        now: DateTime<Utc>,
    ) -> Option<&FocusSession> {
        if !mode.is_work() {
            return None;
        }
        let mut id = now.timestamp_millis();
        while self.sessions.iter().any(|session| session.id == id) {
            id += 1;
        }
        self.sessions.insert(
            0,
            FocusSession {
                id,
                date: now,
                duration_minutes,
                mode,
            },
        );
        self.sessions.first()
    }

    pub fn events(&self) -> Vec<DatedEvent> {
        self.sessions.iter().map(FocusSession::as_event).collect()
    }

    /// Focus minutes per local calendar day.
    pub fn minutes_per_day<Tz: TimeZone>(&self, tz: &Tz) -> EngineResult<DayBuckets> {
        aggregate(&self.events(), AggregationMode::Magnitude, tz)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusStats {
    pub today_minutes: u32,
    pub total_minutes: u32,
    /// Total rounded to one decimal place.
    pub total_hours: f64,
    /// The trailing week ending today, oldest first.
    pub last_7_days: Vec<(NaiveDate, u32)>,
    pub chart_max: u32,
}

impl FocusStats {
    pub fn compute<Tz: TimeZone>(log: &FocusLog, today: NaiveDate, tz: &Tz) -> EngineResult<Self> {
        let per_day = log.minutes_per_day(tz)?;
        let total_minutes: u32 = log
            .sessions()
            .iter()
            .map(|session| session.duration_minutes)
            .sum();

        let last_7_days: Vec<(NaiveDate, u32)> = (0..7u64)
            .rev()
            .filter_map(|back| today.checked_sub_days(Days::new(back)))
            .map(|day| (day, per_day.get(day) as u32))
            .collect();
        let busiest = last_7_days.iter().map(|(_, minutes)| *minutes).max();

        Ok(Self {
            today_minutes: per_day.get(today) as u32,
            total_minutes,
            total_hours: (f64::from(total_minutes) / 6.0).round() / 10.0,
            last_7_days,
            chart_max: busiest.unwrap_or(0).max(CHART_MIN_SCALE),
        })
    }
}
