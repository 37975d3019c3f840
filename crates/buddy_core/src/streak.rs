use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date_key::{format_day_identity, parse_day};
use crate::error::EngineError;

/// The calendar days on which a habit was marked done.
///
/// Persisted as an array of day-identity strings; loading accepts either key
/// encoding and collapses duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CompletionSet {
    days: BTreeSet<NaiveDate>,
}

impl CompletionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.days.contains(&day)
    }

    pub fn insert(&mut self, day: NaiveDate) -> bool {
        self.days.insert(day)
    }

    pub fn remove(&mut self, day: NaiveDate) -> bool {
        self.days.remove(&day)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Days in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.iter().copied()
    }
}

impl FromIterator<NaiveDate> for CompletionSet {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self {
            days: iter.into_iter().collect(),
        }
    }
}

impl Extend<NaiveDate> for CompletionSet {
    fn extend<I: IntoIterator<Item = NaiveDate>>(&mut self, iter: I) {
        self.days.extend(iter);
    }
}

impl TryFrom<Vec<String>> for CompletionSet {
    type Error = EngineError;

    fn try_from(keys: Vec<String>) -> Result<Self, Self::Error> {
        keys.iter().map(|key| parse_day(key)).collect()
    }
}

impl From<CompletionSet> for Vec<String> {
    fn from(set: CompletionSet) -> Self {
        set.days.into_iter().map(format_day_identity).collect()
    }
}

/// Current run of consecutive completed days.
///
/// The run is anchored at `today` when today is marked. An unmarked today
/// does not break a run that was alive through yesterday: the run is then
/// anchored at yesterday. With neither marked the streak is zero.
pub fn compute_streak(set: &CompletionSet, today: NaiveDate) -> u32 {
    let yesterday = today.pred_opt();
    let anchor = if set.contains(today) {
        Some(today)
    } else {
        yesterday.filter(|day| set.contains(*day))
    };

    let mut streak = 0;
    let mut cursor = anchor;
    while let Some(day) = cursor {
        if !set.contains(day) {
            break;
        }
        streak += 1;
        cursor = day.pred_opt();
    }
    streak
}

/// Marks or un-marks `today` and returns the new set with its streak.
pub fn toggle(set: &CompletionSet, today: NaiveDate) -> (CompletionSet, u32) {
    let mut next = set.clone();
    if !next.remove(today) {
        next.insert(today);
    }
    let streak = compute_streak(&next, today);
    tracing::trace!(%today, marked = next.contains(today), streak, "toggled completion");
    (next, streak)
}
