use std::str::FromStr;

use anyhow::{anyhow, bail, ensure, Result};
use buddy_core::{aggregate, AggregationMode, DatedEvent, DayBuckets, EngineResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Collection;

pub const PLANNER_TASKS: Collection<TaskPlanner> = Collection::new("cm_planner_tasks");

pub const DEFAULT_TASK_CATEGORY: &str = "general";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl FromStr for TaskPriority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(anyhow!("unknown task priority `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlannerTask {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub completed: bool,
}

impl PlannerTask {
    /// Every task counts once toward its due day, finished or not.
    pub fn as_event(&self) -> DatedEvent {
        DatedEvent::on(self.due_date, 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub category: String,
    pub due_date: NaiveDate,
    pub priority: TaskPriority,
}

impl NewTask {
    pub fn new(title: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            category: DEFAULT_TASK_CATEGORY.to_string(),
            due_date,
            priority: TaskPriority::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct TaskPlanner {
    tasks: Vec<PlannerTask>,
}

impl TaskPlanner {
    pub fn tasks(&self) -> &[PlannerTask] {
        &self.tasks
    }

    pub fn add(&mut self, task: NewTask, now: DateTime<Utc>) -> Result<i64> {
        let title = task.title.trim();
        ensure!(!title.is_empty(), "task title cannot be empty");
        let mut id = now.timestamp_millis();
        while self.tasks.iter().any(|existing| existing.id == id) {
            id += 1;
        }
        let category = match task.category.trim() {
            "" => DEFAULT_TASK_CATEGORY.to_string(),
            other => other.to_string(),
        };
        self.tasks.push(PlannerTask {
            id,
            title: title.to_string(),
            description: task.description,
            category,
            due_date: task.due_date,
            priority: task.priority,
            completed: false,
        });
        Ok(id)
    }

    /// Flips completion and returns the new state.
    pub fn toggle(&mut self, id: i64) -> Result<bool> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| anyhow!("unknown task {id}"))?;
        task.completed = !task.completed;
        Ok(task.completed)
    }

    pub fn delete(&mut self, id: i64) -> Result<PlannerTask> {
        let Some(index) = self.tasks.iter().position(|task| task.id == id) else {
            bail!("unknown task {id}");
        };
        Ok(self.tasks.remove(index))
    }

    /// Open tasks first, then by priority, then by due date.
    pub fn sorted(&self) -> Vec<&PlannerTask> {
        let mut tasks: Vec<&PlannerTask> = self.tasks.iter().collect();
        tasks.sort_by(|a, b| {
            a.completed
                .cmp(&b.completed)
                .then_with(|| a.priority.cmp(&b.priority))
                .then_with(|| a.due_date.cmp(&b.due_date))
        });
        tasks
    }

    pub fn events(&self) -> Vec<DatedEvent> {
        self.tasks.iter().map(PlannerTask::as_event).collect()
    }

    /// Task count per due day.
    pub fn due_per_day(&self) -> EngineResult<DayBuckets> {
        aggregate(&self.events(), AggregationMode::Magnitude, &Utc)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Open tasks due today.
    pub due_today: usize,
}

impl TaskStats {
    pub fn compute(tasks: &[PlannerTask], today: NaiveDate) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|task| task.completed).count();
        let due_today = tasks
            .iter()
            .filter(|task| task.due_date == today && !task.completed)
            .count();
        Self {
            total,
            completed,
            pending: total - completed,
            due_today,
        }
    }
}
