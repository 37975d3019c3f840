use std::path::PathBuf;

use anyhow::{Context, Result};
use buddy_core::AggregationMode;
use buddy_domain::{planner::NewTask, StudyService};
use chrono::{DateTime, Local, TimeZone, Utc};
use tracing::{info, warn};

use crate::cli::{CategoryCommand, Command, FocusCommand, HabitCommand, HeatmapCommand, TaskCommand};
use crate::render;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub heatmap_weeks: u32,
    pub focus_scale_minutes: f64,
    pub task_scale: f64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(dir) = lookup("BUDDY_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir.trim());
            }
        }
        if let Some(weeks) = lookup("BUDDY_HEATMAP_WEEKS") {
            match weeks.trim().parse::<u32>() {
                Ok(value) if value > 0 => config.heatmap_weeks = value,
                _ => warn!(value = %weeks, "ignoring invalid BUDDY_HEATMAP_WEEKS"),
            }
        }
        if let Some(scale) = lookup("BUDDY_FOCUS_SCALE_MINUTES") {
            match parse_scale(&scale) {
                Some(value) => config.focus_scale_minutes = value,
                None => warn!(value = %scale, "ignoring invalid BUDDY_FOCUS_SCALE_MINUTES"),
            }
        }
        if let Some(scale) = lookup("BUDDY_TASK_SCALE") {
            match parse_scale(&scale) {
                Some(value) => config.task_scale = value,
                None => warn!(value = %scale, "ignoring invalid BUDDY_TASK_SCALE"),
            }
        }
        config
    }
}

fn parse_scale(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("study-buddy-data"),
            heatmap_weeks: buddy_core::heatmap::DEFAULT_WEEKS,
            focus_scale_minutes: 60.0,
            task_scale: 4.0,
        }
    }
}

pub fn run(config: AppConfig, command: Command) -> Result<()> {
    info!(data_dir = %config.data_dir.display(), "opening study data");
    let service = StudyService::builder()
        .data_dir(&config.data_dir)
        .build(Local)
        .context("failed to open study data")?;
    let output = execute(&service, &config, command, Utc::now())?;
    print!("{output}");
    Ok(())
}

/// Runs one command against the service and returns the text to print.
pub fn execute<Tz: TimeZone>(
    service: &StudyService<Tz>,
    config: &AppConfig,
    command: Command,
    now: DateTime<Utc>,
) -> Result<String> {
    let today = service.today(now);
    let weeks = config.heatmap_weeks;

    let output = match command {
        Command::Show => render::render_dashboard(&service.dashboard(today)?, today),
        Command::Habit(HabitCommand::List) => render::render_habits(&service.habits(today)?, today),
        Command::Habit(HabitCommand::Add {
            name,
            category,
            frequency,
        }) => {
            let id = service.add_habit(&name, &category, frequency, now)?;
            format!("Added habit {id}\n")
        }
        Command::Habit(HabitCommand::Edit {
            id,
            name,
            category,
            frequency,
        }) => {
            service.edit_habit(id, &name, &category, frequency)?;
            format!("Updated habit {id}\n")
        }
        Command::Habit(HabitCommand::Toggle { id }) => {
            let streak = service.toggle_habit(id, today)?;
            let done = service.habit(id, today)?.is_done_on(today);
            let state = if done { "done" } else { "not done" };
            format!("Habit {id} {state} today · streak {streak}\n")
        }
        Command::Habit(HabitCommand::Delete { id }) => {
            let removed = service.delete_habit(id)?;
            format!("Deleted habit {}\n", removed.name)
        }
        Command::Category(CategoryCommand::List) => {
            let mut out = service.categories().names().join("\n");
            out.push('\n');
            out
        }
        Command::Category(CategoryCommand::Add { name }) => {
            if service.add_category(&name)? {
                format!("Added category {name}\n")
            } else {
                format!("Category {name} already exists\n")
            }
        }
        Command::Category(CategoryCommand::Remove { name }) => {
            if service.remove_category(&name)? {
                format!("Removed category {name}\n")
            } else {
                format!("No category named {name}\n")
            }
        }
        Command::Focus(FocusCommand::Log { minutes, mode }) => {
            match service.record_focus_session(mode, minutes, now)? {
                Some(session) => format!("Logged {}m of {}\n", session.duration_minutes, session.mode),
                None => format!("{mode} breaks are not logged\n"),
            }
        }
        Command::Focus(FocusCommand::List) => {
            render::render_focus_week(&service.focus_stats(today)?)
        }
        Command::Task(TaskCommand::List) => render::render_tasks(&service.tasks()),
        Command::Task(TaskCommand::Add {
            title,
            due,
            category,
            priority,
            description,
        }) => {
            let task = NewTask {
                description,
                category,
                priority,
                ..NewTask::new(title, due.unwrap_or(today))
            };
            let id = service.add_task(task, now)?;
            format!("Added task {id}\n")
        }
        Command::Task(TaskCommand::Toggle { id }) => {
            let state = if service.toggle_task(id)? { "done" } else { "open" };
            format!("Task {id} {state}\n")
        }
        Command::Task(TaskCommand::Delete { id }) => {
            let removed = service.delete_task(id)?;
            format!("Deleted task {}\n", removed.title)
        }
        Command::Heatmap(HeatmapCommand::Focus) => {
            let cells = service.focus_heatmap(weeks, config.focus_scale_minutes, today)?;
            render::render_heatmap("Focus minutes", &cells, AggregationMode::Magnitude)
        }
        Command::Heatmap(HeatmapCommand::Tasks) => {
            let cells = service.task_heatmap(weeks, config.task_scale, today)?;
            render::render_heatmap("Tasks due", &cells, AggregationMode::Magnitude)
        }
        Command::Heatmap(HeatmapCommand::Habit { id }) => {
            let habit = service.habit(id, today)?;
            let cells = service.habit_heatmap(id, weeks, today)?;
            render::render_heatmap(&habit.name, &cells, AggregationMode::Habit)
        }
    };
    Ok(output)
}
