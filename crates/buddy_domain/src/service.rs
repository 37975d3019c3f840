use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use buddy_core::{build_grid, HeatmapCell, HeatmapSpec};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{
    focus::{FocusLog, FocusMode, FocusSession, FocusStats, FOCUS_HISTORY},
    habit::{Habit, HabitBook, HabitCategories, HabitFrequency, HabitStats, HABITS, HABIT_CATEGORIES},
    planner::{NewTask, PlannerTask, TaskPlanner, TaskStats, PLANNER_TASKS},
    store::{JsonDirStore, KeyValueStore, MemoryStore},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub habits: Vec<Habit>,
    pub habit_stats: HabitStats,
    pub focus_stats: FocusStats,
    pub task_stats: TaskStats,
}

/// Reads snapshots from the store, runs them through the pure engine and
/// writes the results back. Holds no state of its own beyond the store.
pub struct StudyService<Tz: TimeZone> {
    store: Arc<dyn KeyValueStore>,
    tz: Tz,
}

pub struct StudyServiceBuilder {
    data_dir: Option<PathBuf>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl StudyServiceBuilder {
    pub fn new() -> Self {
        Self {
            data_dir: None,
            store: None,
        }
    }

    /// Persist under `path` as one JSON file per collection.
    pub fn data_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Falls back to an in-memory store when neither a store nor a data
    /// directory was given.
    pub fn build<Tz: TimeZone>(self, tz: Tz) -> Result<StudyService<Tz>> {
        let store: Arc<dyn KeyValueStore> = match (self.store, self.data_dir) {
            (Some(store), _) => store,
            (None, Some(dir)) => Arc::new(
                JsonDirStore::open(&dir)
                    .with_context(|| format!("failed to open data dir {}", dir.display()))?,
            ),
            (None, None) => Arc::new(MemoryStore::new()),
        };
        Ok(StudyService { store, tz })
    }
}

impl Default for StudyServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StudyService<Utc> {
    pub fn builder() -> StudyServiceBuilder {
        StudyServiceBuilder::new()
    }
}

impl<Tz: TimeZone> StudyService<Tz> {
    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    /// Local calendar day of `now` in the service timezone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    // Habits

    /// All habits with streaks re-derived for `today`. Stale cached streaks
    /// are written back.
    pub fn habits(&self, today: NaiveDate) -> Result<Vec<Habit>> {
        let mut book = self.load_habits();
        let changed = book.refresh_streaks(today);
        if changed > 0 {
            debug!(changed, %today, "refreshed stale habit streaks");
            HABITS.save(self.store.as_ref(), &book)?;
        }
        Ok(book.into_habits())
    }

    pub fn habit(&self, id: i64, today: NaiveDate) -> Result<Habit> {
        self.habits(today)?
            .into_iter()
            .find(|habit| habit.id == id)
            .ok_or_else(|| anyhow!("unknown habit {id}"))
    }

    #[instrument(skip(self))]
    pub fn add_habit(
        &self,
        name: &str,
        category: &str,
        frequency: HabitFrequency,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let mut book = self.habits_for_update()?;
        let id = book.add(name, category, frequency, now)?;
        HABITS.save(self.store.as_ref(), &book)?;
        self.register_category(category)?;
        info!(id, "habit added");
        Ok(id)
    }

    #[instrument(skip(self))]
    pub fn edit_habit(
        &self,
        id: i64,
        name: &str,
        category: &str,
        frequency: HabitFrequency,
    ) -> Result<()> {
        let mut book = self.habits_for_update()?;
        book.edit(id, name, category, frequency)?;
        HABITS.save(self.store.as_ref(), &book)?;
        self.register_category(category)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn delete_habit(&self, id: i64) -> Result<Habit> {
        let mut book = self.habits_for_update()?;
        let removed = book.delete(id)?;
        HABITS.save(self.store.as_ref(), &book)?;
        info!(id, name = %removed.name, "habit deleted");
        Ok(removed)
    }

    /// Marks or un-marks `today` and returns the recomputed streak.
    #[instrument(skip(self))]
    pub fn toggle_habit(&self, id: i64, today: NaiveDate) -> Result<u32> {
        let mut book = self.habits_for_update()?;
        let streak = book.toggle(id, today)?;
        HABITS.save(self.store.as_ref(), &book)?;
        Ok(streak)
    }

    pub fn categories(&self) -> HabitCategories {
        HABIT_CATEGORIES.load_or_default(self.store.as_ref())
    }

    pub fn add_category(&self, name: &str) -> Result<bool> {
        self.register_category(name)
    }

    pub fn remove_category(&self, name: &str) -> Result<bool> {
        let mut categories = HABIT_CATEGORIES.load_for_update(self.store.as_ref())?;
        let removed = categories.remove(name)?;
        if removed {
            HABIT_CATEGORIES.save(self.store.as_ref(), &categories)?;
        }
        Ok(removed)
    }

    pub fn habit_stats(&self, today: NaiveDate) -> Result<HabitStats> {
        Ok(HabitStats::compute(&self.habits(today)?, today))
    }

    pub fn habit_heatmap(&self, id: i64, weeks: u32, today: NaiveDate) -> Result<Vec<HeatmapCell>> {
        let book = self.load_habits();
        let habit = book.get(id).ok_or_else(|| anyhow!("unknown habit {id}"))?;
        Ok(build_grid(&habit.consistency(), &HeatmapSpec::habit(weeks), today)?)
    }

    // Focus sessions

    pub fn focus_sessions(&self) -> Vec<FocusSession> {
        self.load_focus().sessions().to_vec()
    }

    /// Appends a finished session. Breaks are not logged and yield `None`.
    #[instrument(skip(self))]
    pub fn record_focus_session(
        &self,
        mode: FocusMode,
        duration_minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<FocusSession>> {
        let mut log = FOCUS_HISTORY.load_for_update(self.store.as_ref())?;
        let Some(session) = log.record(mode, duration_minutes, now).cloned() else {
            debug!(%mode, "break sessions are not logged");
            return Ok(None);
        };
        FOCUS_HISTORY.save(self.store.as_ref(), &log)?;
        Ok(Some(session))
    }

    pub fn focus_stats(&self, today: NaiveDate) -> Result<FocusStats> {
        Ok(FocusStats::compute(&self.load_focus(), today, &self.tz)?)
    }

    pub fn focus_heatmap(
        &self,
        weeks: u32,
        max_minutes: f64,
        today: NaiveDate,
    ) -> Result<Vec<HeatmapCell>> {
        let buckets = self.load_focus().minutes_per_day(&self.tz)?;
        Ok(build_grid(&buckets, &HeatmapSpec::magnitude(weeks, max_minutes), today)?)
    }

    // Planner tasks

    pub fn tasks(&self) -> Vec<PlannerTask> {
        self.load_tasks().sorted().into_iter().cloned().collect()
    }

    #[instrument(skip(self, task), fields(title = %task.title))]
    pub fn add_task(&self, task: NewTask, now: DateTime<Utc>) -> Result<i64> {
        let mut planner = PLANNER_TASKS.load_for_update(self.store.as_ref())?;
        let id = planner.add(task, now)?;
        PLANNER_TASKS.save(self.store.as_ref(), &planner)?;
        Ok(id)
    }

    #[instrument(skip(self))]
    pub fn toggle_task(&self, id: i64) -> Result<bool> {
        let mut planner = PLANNER_TASKS.load_for_update(self.store.as_ref())?;
        let completed = planner.toggle(id)?;
        PLANNER_TASKS.save(self.store.as_ref(), &planner)?;
        Ok(completed)
    }

    #[instrument(skip(self))]
    pub fn delete_task(&self, id: i64) -> Result<PlannerTask> {
        let mut planner = PLANNER_TASKS.load_for_update(self.store.as_ref())?;
        let removed = planner.delete(id)?;
        PLANNER_TASKS.save(self.store.as_ref(), &planner)?;
        Ok(removed)
    }

    pub fn task_stats(&self, today: NaiveDate) -> TaskStats {
        TaskStats::compute(self.load_tasks().tasks(), today)
    }

    pub fn task_heatmap(
        &self,
        weeks: u32,
        max_tasks: f64,
        today: NaiveDate,
    ) -> Result<Vec<HeatmapCell>> {
        let buckets = self.load_tasks().due_per_day()?;
        Ok(build_grid(&buckets, &HeatmapSpec::magnitude(weeks, max_tasks), today)?)
    }

    pub fn dashboard(&self, today: NaiveDate) -> Result<DashboardSnapshot> {
        let habits = self.habits(today)?;
        Ok(DashboardSnapshot {
            habit_stats: HabitStats::compute(&habits, today),
            habits,
            focus_stats: self.focus_stats(today)?,
            task_stats: self.task_stats(today),
        })
    }
}

impl<Tz: TimeZone> StudyService<Tz> {
    fn load_habits(&self) -> HabitBook {
        HABITS.load_or_default(self.store.as_ref())
    }

    fn load_focus(&self) -> FocusLog {
        FOCUS_HISTORY.load_or_default(self.store.as_ref())
    }

    fn load_tasks(&self) -> TaskPlanner {
        PLANNER_TASKS.load_or_default(self.store.as_ref())
    }

    fn habits_for_update(&self) -> Result<HabitBook> {
        Ok(HABITS.load_for_update(self.store.as_ref())?)
    }

    fn register_category(&self, name: &str) -> Result<bool> {
        let mut categories = HABIT_CATEGORIES.load_for_update(self.store.as_ref())?;
        let added = categories.add(name);
        if added {
            HABIT_CATEGORIES.save(self.store.as_ref(), &categories)?;
        }
        Ok(added)
    }
}
