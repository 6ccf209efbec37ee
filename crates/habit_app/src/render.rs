use std::fmt::Write as _;

use habit_core::{
    dashboard::HabitSnapshot,
    stats::Stats,
    view::{GridCell, MonthGrid, WEEKDAY_LABELS},
    Habit,
};

pub fn habit_list(habits: &[Habit]) -> String {
    if habits.is_empty() {
        return "No habits yet.\n".to_string();
    }
    let mut out = String::new();
    for habit in habits {
        let reminder = match (habit.reminder_enabled(), habit.reminder_time()) {
            (true, Some(time)) => format!("reminder {time}"),
            _ => "no reminder".to_string(),
        };
        let _ = writeln!(
            out,
            "{}  {:<24} goal {}/week  {}  {}",
            short_id(habit),
            habit.name(),
            habit.goal(),
            habit.color(),
            reminder
        );
    }
    out
}

pub fn snapshot(snapshot: &HabitSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", snapshot.habit.name(), short_id(&snapshot.habit));
    out.push('\n');
    out.push_str(&grid(&snapshot.grid));
    out.push('\n');
    out.push_str(&stats(&snapshot.stats, snapshot.habit.goal()));
    out
}

/// Month calendar, Monday first; completed days carry a `*`.
pub fn grid(grid: &MonthGrid) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", grid.title);
    let header: Vec<String> = WEEKDAY_LABELS.iter().map(|label| format!("{label:>4}")).collect();
    let _ = writeln!(out, "{}", header.concat());
    for week in &grid.weeks {
        let row: Vec<String> = week.iter().map(cell).collect();
        let _ = writeln!(out, "{}", row.concat().trim_end());
    }
    out
}

fn cell(cell: &GridCell) -> String {
    match cell {
        GridCell::Blank => "    ".to_string(),
        GridCell::Day { day, completed, .. } => {
            let mark = if *completed { "*" } else { " " };
            format!("{day:>3}{mark}")
        }
    }
}

pub fn stats(stats: &Stats, goal: u8) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Current streak: {} days", stats.current_streak);
    let _ = writeln!(out, "Best streak:    {} days", stats.best_streak);
    let _ = writeln!(
        out,
        "This week:      {}/{} ({}%)",
        stats.this_week, goal, stats.goal_progress
    );
    let _ = writeln!(out, "Month:          {:.0}%", stats.period_completion_ratio);
    let buckets: Vec<String> = stats.weekly_buckets.iter().map(u32::to_string).collect();
    let _ = writeln!(out, "Last 8 weeks:   {}", buckets.join(" "));
    out
}

fn short_id(habit: &Habit) -> &str {
    let id = habit.id().as_str();
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use habit_core::{
        dashboard, storage::MemoryStore, view::CalendarView, DateKey, HabitStore, ReminderTime,
    };

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn grid_marks_completed_days() {
        let store = HabitStore::open(Arc::new(MemoryStore::new()));
        let habit = store.create("Read", "").unwrap();
        store
            .toggle_day(habit.id(), DateKey::from_date(today()))
            .unwrap();
        let snapshot = dashboard::snapshot(&store, &CalendarView::new(today()), None, today())
            .unwrap();

        let text = grid(&snapshot.grid);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "October 2026");
        assert_eq!(lines[1], " Mon Tue Wed Thu Fri Sat Sun");
        // October 2026 starts on a Thursday
        assert_eq!(lines[2], "              1   2   3   4");
        assert!(text.contains(" 19*"));
        assert!(!text.contains(" 18*"));
    }

    #[test]
    fn list_shows_goal_and_reminder() {
        let store = HabitStore::open(Arc::new(MemoryStore::new()));
        let habit = store.create("Walk", "#22c55e").unwrap();
        store
            .set_reminder(habit.id(), true, ReminderTime::from_hm(7, 30))
            .unwrap();
        let text = habit_list(&store.list());
        assert!(text.contains("Walk"));
        assert!(text.contains("goal 5/week"));
        assert!(text.contains("reminder 07:30"));
        assert_eq!(habit_list(&[]), "No habits yet.\n");
    }

    #[test]
    fn stats_block_reports_progress() {
        let store = HabitStore::open(Arc::new(MemoryStore::new()));
        let habit = store.create("Read", "").unwrap();
        store
            .toggle_day(habit.id(), DateKey::from_date(today()))
            .unwrap();
        let snapshot = dashboard::snapshot(&store, &CalendarView::new(today()), None, today())
            .unwrap();
        let text = stats(&snapshot.stats, snapshot.habit.goal());
        assert!(text.contains("Current streak: 1 days"));
        assert!(text.contains("This week:      1/5 (20%)"));
        assert!(text.contains("Last 8 weeks:   0 0 0 0 0 0 0 1"));
    }
}
