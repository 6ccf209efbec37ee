use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use habit_core::{
    calendar::add_days,
    dashboard,
    export,
    stats,
    storage::{FileStore, KeyValueStore, MemoryStore, FOLLOWS_KEY, HABITS_KEY},
    view::CalendarView,
    DateKey, HabitStore, MonthCursor,
};
use tempfile::tempdir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
}

#[test]
fn streak_scenario_read_habit() {
    let store = HabitStore::open(Arc::new(MemoryStore::new()));
    let habit = store.create("Read", "#22c55e").expect("create habit");
    assert_eq!(habit.goal(), 5);

    for offset in 0..4 {
        let day = DateKey::from_date(add_days(today(), -offset));
        assert_eq!(store.toggle_day(habit.id(), day).expect("toggle"), Some(true));
    }
    let fifth_prior = DateKey::from_date(add_days(today(), -4));

    let habit = store.get(habit.id()).expect("habit exists");
    assert!(!habit.is_completed(fifth_prior));
    assert_eq!(stats::current_streak(&habit, today()), 4);

    store.toggle_day(habit.id(), fifth_prior).expect("toggle");
    let habit = store.get(habit.id()).expect("habit exists");
    assert_eq!(stats::current_streak(&habit, today()), 5);
    assert_eq!(stats::best_streak(&habit, today()), 5);
}

#[test]
fn malformed_persisted_text_loads_as_empty() {
    let storage = Arc::new(MemoryStore::new().with_entry(HABITS_KEY, "\"not a list\""));
    let store = HabitStore::open(storage.clone());
    assert!(store.list().is_empty());

    // the next mutation replaces the corrupt document
    store.create("Fresh", "").expect("create habit");
    let raw = storage.raw(HABITS_KEY).expect("persisted");
    assert!(raw.starts_with('['));
    assert_eq!(store.list().len(), 1);
}

#[test]
fn file_backed_store_survives_reopening() {
    let temp = tempdir().expect("tempdir");
    let data_dir = temp.path().join("habits");

    let created = {
        let storage = Arc::new(FileStore::open(&data_dir).expect("open file store"));
        let store = HabitStore::open(storage);
        let habit = store.create("Meditate", "").expect("create habit");
        store.set_goal(habit.id(), 3).expect("set goal");
        store
            .toggle_day(habit.id(), DateKey::from_date(today()))
            .expect("toggle");
        habit
    };

    let storage = Arc::new(FileStore::open(&data_dir).expect("reopen file store"));
    assert!(storage.get(FOLLOWS_KEY).expect("read follows").is_none());
    let store = HabitStore::open(storage);
    let habit = store.get(created.id()).expect("habit persisted");
    assert_eq!(habit.name(), "Meditate");
    assert_eq!(habit.goal(), 3);
    assert!(habit.is_completed_on(today()));
}

#[test]
fn dashboard_and_exports_agree_with_the_ledger() {
    let store = HabitStore::open(Arc::new(MemoryStore::new()));
    let habit = store.create("Journal", "").expect("create habit");
    let first = DateKey::from_date(NaiveDate::from_ymd_opt(2026, 10, 1).expect("date"));
    let second = DateKey::from_date(NaiveDate::from_ymd_opt(2026, 10, 2).expect("date"));
    store.toggle_day(habit.id(), first).expect("toggle");
    store.toggle_day(habit.id(), second).expect("toggle");
    store.toggle_day(habit.id(), second).expect("toggle");

    let mut view = CalendarView::new(today());
    let snapshot = dashboard::snapshot(&store, &view, None, today()).expect("snapshot");
    assert_eq!(snapshot.grid.cursor, MonthCursor::new(2026, 10));
    assert!((snapshot.stats.period_completion_ratio - 100.0 / 31.0).abs() < 1e-9);

    view.previous();
    let september = dashboard::snapshot(&store, &view, Some(habit.id()), today()).expect("snapshot");
    assert_eq!(september.stats.period_completion_ratio, 0.0);
    assert_eq!(september.stats.current_streak, snapshot.stats.current_streak);

    let csv = export::to_csv(&store.list()).expect("csv export");
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("\"2026-10-02\",\"false\""));

    let ics = export::to_ics(&snapshot.habit, today(), &Utc);
    assert_eq!(ics.matches("END:VEVENT").count(), export::ICS_EVENT_COUNT as usize);
}
