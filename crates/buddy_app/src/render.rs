use std::fmt::Write;

use buddy_core::{heatmap::MAX_INTENSITY, AggregationMode, HeatmapCell};
use buddy_domain::{focus::FocusStats, habit::Habit, planner::PlannerTask, DashboardSnapshot};
use chrono::NaiveDate;

/// Glyph per intensity, empty first.
pub const INTENSITY_GLYPHS: [char; 5] = ['·', '░', '▒', '▓', '█'];
const FUTURE_GLYPH: char = ' ';
const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const BAR_WIDTH: u32 = 24;

pub fn cell_glyph(cell: &HeatmapCell, mode: AggregationMode) -> char {
    if cell.is_future {
        return FUTURE_GLYPH;
    }
    match (mode, cell.intensity) {
        (_, 0) => INTENSITY_GLYPHS[0],
        (AggregationMode::Habit, _) => INTENSITY_GLYPHS[usize::from(MAX_INTENSITY)],
        (AggregationMode::Magnitude, level) => {
            INTENSITY_GLYPHS[usize::from(level.min(MAX_INTENSITY))]
        }
    }
}

/// Lays the chronological cells out as seven weekday rows, one column per week.
pub fn render_heatmap(title: &str, cells: &[HeatmapCell], mode: AggregationMode) -> String {
    let mut out = String::new();
    let (Some(first), Some(last)) = (cells.first(), cells.last()) else {
        let _ = writeln!(out, "{title}: no data");
        return out;
    };
    let _ = writeln!(out, "{title} ({} to {})", first.date, last.date);

    let weeks: Vec<&[HeatmapCell]> = cells.chunks(7).collect();
    for (row, label) in WEEKDAY_LABELS.iter().enumerate() {
        let line: String = weeks
            .iter()
            .map(|week| week.get(row).map_or(FUTURE_GLYPH, |cell| cell_glyph(cell, mode)))
            .collect();
        let _ = writeln!(out, "{label} {line}");
    }

    let legend: String = match mode {
        AggregationMode::Habit => format!(
            "{} {}",
            INTENSITY_GLYPHS[0],
            INTENSITY_GLYPHS[usize::from(MAX_INTENSITY)]
        ),
        AggregationMode::Magnitude => INTENSITY_GLYPHS
            .iter()
            .map(|glyph| glyph.to_string())
            .collect::<Vec<_>>()
            .join(" "),
    };
    let _ = writeln!(out, "    Less {legend} More");
    out
}

pub fn render_habits(habits: &[Habit], today: NaiveDate) -> String {
    if habits.is_empty() {
        return "No habits yet. Start small!\n".to_string();
    }
    let mut out = String::new();
    for habit in habits {
        let mark = if habit.is_done_on(today) { 'x' } else { ' ' };
        let plural = if habit.streak == 1 { "" } else { "s" };
        let _ = writeln!(
            out,
            "[{mark}] {} ({}, {}) · {} day{plural} streak · id {}",
            habit.name, habit.category, habit.frequency, habit.streak, habit.id
        );
    }
    out
}

pub fn render_tasks(tasks: &[PlannerTask]) -> String {
    if tasks.is_empty() {
        return "No tasks planned.\n".to_string();
    }
    let mut out = String::new();
    for task in tasks {
        let mark = if task.completed { 'x' } else { ' ' };
        let _ = writeln!(
            out,
            "[{mark}] {} · due {} · {:?} · {} · id {}",
            task.title, task.due_date, task.priority, task.category, task.id
        );
    }
    out
}

/// Bar chart of the trailing week's focus minutes.
pub fn render_focus_week(stats: &FocusStats) -> String {
    let mut out = String::new();
    let scale = stats.chart_max.max(1);
    for (day, minutes) in &stats.last_7_days {
        let filled = ((*minutes).min(scale) * BAR_WIDTH / scale) as usize;
        let bar = INTENSITY_GLYPHS[4].to_string().repeat(filled);
        let _ = writeln!(
            out,
            "{} {bar:<width$} {minutes}m",
            day.format("%a"),
            width = BAR_WIDTH as usize
        );
    }
    out
}

pub fn render_dashboard(snapshot: &DashboardSnapshot, today: NaiveDate) -> String {
    let habit = &snapshot.habit_stats;
    let focus = &snapshot.focus_stats;
    let tasks = &snapshot.task_stats;

    let mut out = String::new();
    let _ = writeln!(out, "Study Buddy · {}", today.format("%a %b %d %Y"));
    let _ = writeln!(
        out,
        "Habits: {}/{} done today ({}%) · avg streak {:.1}",
        habit.completed_today, habit.total, habit.completion_rate, habit.average_streak
    );
    let _ = writeln!(
        out,
        "Focus: {}m today · {} hrs total",
        focus.today_minutes, focus.total_hours
    );
    let _ = writeln!(
        out,
        "Tasks: {} pending · {} done · {} due today",
        tasks.pending, tasks.completed, tasks.due_today
    );
    out.push('\n');
    out.push_str(&render_habits(&snapshot.habits, today));
    out.push('\n');
    out.push_str(&render_focus_week(focus));
    out
}
