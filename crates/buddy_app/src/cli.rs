use std::path::PathBuf;

use buddy_domain::{focus::FocusMode, habit::HabitFrequency, planner::TaskPriority};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "study_buddy")]
#[command(about = "Habit streaks, focus sessions and study tasks in the terminal")]
pub struct Cli {
    /// Directory holding the JSON collections (overrides BUDDY_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Heatmap window in weeks (overrides BUDDY_HEATMAP_WEEKS)
    #[arg(long, global = true)]
    pub weeks: Option<u32>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Dashboard overview
    Show,
    #[command(subcommand)]
    Habit(HabitCommand),
    #[command(subcommand)]
    Category(CategoryCommand),
    #[command(subcommand)]
    Focus(FocusCommand),
    #[command(subcommand)]
    Task(TaskCommand),
    #[command(subcommand)]
    Heatmap(HeatmapCommand),
}

#[derive(Subcommand, Debug)]
pub enum HabitCommand {
    List,
    Add {
        name: String,
        #[arg(long, default_value = "Study")]
        category: String,
        #[arg(long, default_value = "daily")]
        frequency: HabitFrequency,
    },
    Edit {
        id: i64,
        name: String,
        #[arg(long, default_value = "Study")]
        category: String,
        #[arg(long, default_value = "daily")]
        frequency: HabitFrequency,
    },
    /// Mark or un-mark today
    Toggle { id: i64 },
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    List,
    Add { name: String },
    Remove { name: String },
}

#[derive(Subcommand, Debug)]
pub enum FocusCommand {
    /// Log a finished session
    Log {
        minutes: u32,
        #[arg(long, default_value = "pomo")]
        mode: FocusMode,
    },
    List,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    List,
    Add {
        title: String,
        /// Due date as YYYY-MM-DD, defaults to today
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long, default_value = "general")]
        category: String,
        #[arg(long, default_value = "medium")]
        priority: TaskPriority,
        #[arg(long, default_value = "")]
        description: String,
    },
    Toggle { id: i64 },
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum HeatmapCommand {
    /// Focus minutes per day
    Focus,
    /// Tasks due per day
    Tasks,
    /// Completion history of one habit
    Habit { id: i64 },
}
