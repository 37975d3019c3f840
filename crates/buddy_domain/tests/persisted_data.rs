use std::fs;
use std::path::Path;

use buddy_domain::{focus::FocusMode, habit::HabitFrequency, StudyService};
use chrono::{NaiveDate, TimeZone, Utc};
use tempfile::tempdir;

fn write_fixture(dir: &Path, key: &str, contents: &str) {
    fs::create_dir_all(dir).expect("create data dir");
    fs::write(dir.join(format!("{key}.json")), contents).expect("write fixture");
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn stored_collections_drive_streaks_and_heatmaps() {
    let temp = tempdir().expect("tempdir");
    let data = temp.path().join("data");
    let today = day(2024, 5, 12);

    write_fixture(
        &data,
        "cm_habits",
        r#"[{"id":1715000000000,"name":"Read","category":"Study","frequency":"daily","streak":1,
            "completedDates":["Fri May 10 2024","Sat May 11 2024","Sun May 12 2024"],
            "createdAt":"2024-05-01T08:00:00.000Z"}]"#,
    );
    write_fixture(
        &data,
        "flow_history",
        r#"[{"id":2,"date":"2024-05-12T08:00:00.000Z","durationMinutes":30,"mode":"pomo"},
            {"id":1,"date":"2024-05-11T08:00:00.000Z","durationMinutes":60,"mode":"flow"}]"#,
    );
    write_fixture(
        &data,
        "cm_planner_tasks",
        r#"[{"id":1,"title":"Essay","description":"","category":"general","dueDate":"2024-05-12","priority":"high","completed":false},
            {"id":2,"title":"Quiz","description":"","category":"general","dueDate":"2024-05-12","priority":"low","completed":true}]"#,
    );

    let service = StudyService::builder()
        .data_dir(&data)
        .build(Utc)
        .expect("build study service");

    let habits = service.habits(today).expect("habits");
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].streak, 3, "stale cached streak is re-derived");
    let stored = fs::read_to_string(data.join("cm_habits.json")).expect("read habits");
    assert!(stored.contains(r#""streak":3"#));

    let habit_cells = service
        .habit_heatmap(1715000000000, 2, today)
        .expect("habit heatmap");
    assert_eq!(habit_cells.len(), 14);
    assert_eq!(habit_cells.iter().filter(|cell| cell.intensity == 1).count(), 3);

    let focus_cells = service.focus_heatmap(1, 60.0, today).expect("focus heatmap");
    assert_eq!(focus_cells.len(), 7);
    assert_eq!(focus_cells[0].date, today);
    assert_eq!(focus_cells[0].raw_value, 30.0);
    assert_eq!(focus_cells[0].intensity, 2);
    assert!(focus_cells[1..].iter().all(|cell| cell.is_future));

    let task_cells = service.task_heatmap(1, 4.0, today).expect("task heatmap");
    assert_eq!(task_cells[0].raw_value, 2.0);
    assert_eq!(task_cells[0].intensity, 2);

    let dashboard = service.dashboard(today).expect("dashboard");
    assert_eq!(dashboard.habit_stats.completed_today, 1);
    assert_eq!(dashboard.focus_stats.today_minutes, 30);
    assert_eq!(dashboard.focus_stats.total_hours, 1.5);
    assert_eq!(dashboard.task_stats.due_today, 1);

    let streak = service
        .toggle_habit(1715000000000, today)
        .expect("toggle habit");
    assert_eq!(streak, 2);
    let stored = fs::read_to_string(data.join("cm_habits.json")).expect("read habits");
    assert!(!stored.contains("Sun May 12 2024"));
    assert!(stored.contains("Sat May 11 2024"));
}

#[test]
fn fresh_data_dir_round_trips_through_reopen() {
    let temp = tempdir().expect("tempdir");
    let now = Utc.with_ymd_and_hms(2024, 5, 12, 9, 30, 0).unwrap();
    let today = day(2024, 5, 12);

    {
        let service = StudyService::builder()
            .data_dir(temp.path())
            .build(Utc)
            .expect("build study service");
        let id = service
            .add_habit("Meditate", "Mindfulness", HabitFrequency::Daily, now)
            .expect("add habit");
        service.toggle_habit(id, today).expect("toggle habit");
        service
            .record_focus_session(FocusMode::Sprint, 50, now)
            .expect("record session");
        assert!(service
            .record_focus_session(FocusMode::Long, 15, now)
            .expect("record break")
            .is_none());
    }

    let reopened = StudyService::builder()
        .data_dir(temp.path())
        .build(Utc)
        .expect("reopen study service");
    let habits = reopened.habits(today).expect("habits");
    assert_eq!(habits[0].name, "Meditate");
    assert_eq!(habits[0].streak, 1);
    assert_eq!(reopened.focus_sessions().len(), 1);
    assert_eq!(reopened.categories().names().len(), 5);
}

#[test]
fn corrupt_collections_fall_back_to_empty() {
    let temp = tempdir().expect("tempdir");
    write_fixture(temp.path(), "cm_habits", "[{\"id\":");
    write_fixture(temp.path(), "flow_history", "not json");

    let service = StudyService::builder()
        .data_dir(temp.path())
        .build(Utc)
        .expect("build study service");
    let today = day(2024, 5, 12);
    assert!(service.habits(today).expect("habits").is_empty());
    let cells = service.focus_heatmap(4, 60.0, today).expect("focus heatmap");
    assert!(cells.iter().all(|cell| cell.intensity == 0));
}

#[test]
fn bad_completion_date_does_not_erase_other_habits() {
    let temp = tempdir().expect("tempdir");
    write_fixture(
        temp.path(),
        "cm_habits",
        r#"[{"id":1,"name":"Read","category":"Study","frequency":"daily","streak":0,
             "completedDates":["Sat May 11 2024"],"createdAt":"2024-05-01T08:00:00.000Z"},
            {"id":2,"name":"Run","category":"Health","frequency":"daily","streak":0,
             "completedDates":["Invalid Date"],"createdAt":"2024-05-01T08:00:00.000Z"}]"#,
    );
    let service = StudyService::builder()
        .data_dir(temp.path())
        .build(Utc)
        .expect("build study service");
    let now = Utc.with_ymd_and_hms(2024, 5, 12, 9, 0, 0).unwrap();

    service
        .add_habit("Meditate", "Mindfulness", HabitFrequency::Daily, now)
        .expect("add habit");

    let names: Vec<String> = service
        .habits(day(2024, 5, 12))
        .expect("habits")
        .into_iter()
        .map(|habit| habit.name)
        .collect();
    assert_eq!(names, ["Read", "Run", "Meditate"]);
}

#[test]
fn corrupt_collection_is_never_overwritten() {
    let temp = tempdir().expect("tempdir");
    let corrupt = "[{\"id\":";
    write_fixture(temp.path(), "cm_habits", corrupt);
    let service = StudyService::builder()
        .data_dir(temp.path())
        .build(Utc)
        .expect("build study service");
    let now = Utc.with_ymd_and_hms(2024, 5, 12, 9, 0, 0).unwrap();

    assert!(service
        .add_habit("Meditate", "Mindfulness", HabitFrequency::Daily, now)
        .is_err());
    let stored = fs::read_to_string(temp.path().join("cm_habits.json")).expect("read habits");
    assert_eq!(stored, corrupt);
}
