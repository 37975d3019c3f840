use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, ensure, Result};
use buddy_core::{compute_streak, date_key::parse_day, streak, CompletionSet, DayBuckets};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::store::Collection;

pub const HABITS: Collection<HabitBook> = Collection::new("cm_habits");
pub const HABIT_CATEGORIES: Collection<HabitCategories> = Collection::new("cm_habit_cats");

pub const DEFAULT_CATEGORIES: [&str; 5] =
    ["Study", "Health", "Productivity", "Learning", "Mindfulness"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HabitFrequency {
    #[default]
    Daily,
    Weekly,
}

impl FromStr for HabitFrequency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            other => Err(anyhow!("unknown habit frequency `{other}`")),
        }
    }
}

impl fmt::Display for HabitFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => f.write_str("daily"),
            Self::Weekly => f.write_str("weekly"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: i64,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub frequency: HabitFrequency,
    /// Cached copy of the current streak; see [`Habit::refresh_streak`].
    #[serde(default)]
    pub streak: u32,
    #[serde(default, deserialize_with = "completions_skipping_invalid")]
    pub completed_dates: CompletionSet,
    pub created_at: DateTime<Utc>,
}

/// Unreadable entries are dropped so one bad day cannot discard the habit.
fn completions_skipping_invalid<'de, D>(deserializer: D) -> Result<CompletionSet, D::Error>
where
    D: Deserializer<'de>,
{
    let keys = Vec::<String>::deserialize(deserializer)?;
    Ok(keys
        .iter()
        .filter_map(|key| match parse_day(key) {
            Ok(day) => Some(day),
            Err(err) => {
                warn!(%err, "dropping unreadable completion date");
                None
            }
        })
        .collect())
}

impl Habit {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        category: impl Into<String>,
        frequency: HabitFrequency,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            frequency,
            streak: 0,
            completed_dates: CompletionSet::new(),
            created_at,
        }
    }

    pub fn is_done_on(&self, day: NaiveDate) -> bool {
        self.completed_dates.contains(day)
    }

    pub fn current_streak(&self, today: NaiveDate) -> u32 {
        compute_streak(&self.completed_dates, today)
    }

    /// Flips today's completion, updating the set and the cached streak together.
    pub fn toggle(&mut self, today: NaiveDate) -> u32 {
        let (completed, streak) = streak::toggle(&self.completed_dates, today);
        self.completed_dates = completed;
        self.streak = streak;
        streak
    }

    /// Re-derives the cached streak. Returns whether it changed.
    pub fn refresh_streak(&mut self, today: NaiveDate) -> bool {
        let streak = self.current_streak(today);
        let changed = streak != self.streak;
        self.streak = streak;
        changed
    }

    pub fn consistency(&self) -> DayBuckets {
        DayBuckets::from_completions(&self.completed_dates)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct HabitBook {
    habits: Vec<Habit>,
}

impl HabitBook {
    pub fn new(habits: Vec<Habit>) -> Self {
        Self { habits }
    }

    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn into_habits(self) -> Vec<Habit> {
        self.habits
    }

    pub fn get(&self, id: i64) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == id)
    }

    /// Creates a habit identified by its creation time in milliseconds.
    pub fn add(
        &mut self,
        name: &str,
        category: &str,
        frequency: HabitFrequency,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let name = name.trim();
        ensure!(!name.is_empty(), "habit name cannot be empty");
        let mut id = now.timestamp_millis();
        while self.get(id).is_some() {
            id += 1;
        }
        self.habits
            .push(Habit::new(id, name, category.trim(), frequency, now));
        Ok(id)
    }

    /// Renames or re-files a habit. Completions and streak are untouched.
    pub fn edit(
        &mut self,
        id: i64,
        name: &str,
        category: &str,
        frequency: HabitFrequency,
    ) -> Result<()> {
        let name = name.trim();
        ensure!(!name.is_empty(), "habit name cannot be empty");
        let habit = self.get_mut(id)?;
        habit.name = name.to_string();
        habit.category = category.trim().to_string();
        habit.frequency = frequency;
        Ok(())
    }

    pub fn delete(&mut self, id: i64) -> Result<Habit> {
        let Some(index) = self.habits.iter().position(|habit| habit.id == id) else {
            bail!("unknown habit {id}");
        };
        Ok(self.habits.remove(index))
    }

    pub fn toggle(&mut self, id: i64, today: NaiveDate) -> Result<u32> {
        Ok(self.get_mut(id)?.toggle(today))
    }

    /// Brings every cached streak up to date. Returns how many changed.
    pub fn refresh_streaks(&mut self, today: NaiveDate) -> usize {
        self.habits
            .iter_mut()
            .map(|habit| habit.refresh_streak(today))
            .filter(|changed| *changed)
            .count()
    }

    fn get_mut(&mut self, id: i64) -> Result<&mut Habit> {
        self.habits
            .iter_mut()
            .find(|habit| habit.id == id)
            .ok_or_else(|| anyhow!("unknown habit {id}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct HabitCategories {
    names: Vec<String>,
}

impl Default for HabitCategories {
    fn default() -> Self {
        Self {
            names: DEFAULT_CATEGORIES.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl HabitCategories {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|existing| existing == name)
    }

    /// Returns false for blank or already-known names.
    pub fn add(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.contains(name) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    pub fn remove(&mut self, name: &str) -> Result<bool> {
        if !self.contains(name) {
            return Ok(false);
        }
        ensure!(self.names.len() > 1, "at least one habit category is required");
        self.names.retain(|existing| existing != name);
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    pub total: usize,
    pub completed_today: usize,
    /// Share of habits done today, as a rounded percentage.
    pub completion_rate: u32,
    /// Unrounded mean streak. The dashboard shows it with one decimal.
    pub average_streak: f64,
}

impl HabitStats {
    pub fn compute(habits: &[Habit], today: NaiveDate) -> Self {
        let total = habits.len();
        if total == 0 {
            return Self {
                total,
                completed_today: 0,
                completion_rate: 0,
                average_streak: 0.0,
            };
        }
        let completed_today = habits.iter().filter(|habit| habit.is_done_on(today)).count();
        let streak_sum: u32 = habits.iter().map(|habit| habit.current_streak(today)).sum();
        Self {
            total,
            completed_today,
            completion_rate: (completed_today as f64 / total as f64 * 100.0).round() as u32,
            average_streak: f64::from(streak_sum) / total as f64,
        }
    }
}
