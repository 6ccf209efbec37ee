use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    habit::{Habit, HabitId},
    stats::{self, Stats},
    store::HabitStore,
    view::{CalendarView, MonthGrid},
};

/// Everything the habit panel shows for the selected habit, recomputed from
/// the store on every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitSnapshot {
    pub habit: Habit,
    pub grid: MonthGrid,
    pub stats: Stats,
}

/// The selected habit, falling back to the first one when nothing (or a
/// since-deleted habit) is selected.
pub fn select<'a>(habits: &'a [Habit], selected: Option<&HabitId>) -> Option<&'a Habit> {
    selected
        .and_then(|id| habits.iter().find(|habit| habit.id() == id))
        .or_else(|| habits.first())
}

pub fn snapshot(
    store: &HabitStore,
    view: &CalendarView,
    selected: Option<&HabitId>,
    today: NaiveDate,
) -> Option<HabitSnapshot> {
    let habits = store.list();
    let habit = select(&habits, selected)?.clone();
    Some(snapshot_for(habit, view, today))
}

pub fn snapshot_for(habit: Habit, view: &CalendarView, today: NaiveDate) -> HabitSnapshot {
    let grid = view.build_grid(&habit);
    let stats = stats::compute_stats(&habit, today, view.cursor());
    HabitSnapshot { habit, grid, stats }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::calendar::DateKey;
    use crate::storage::MemoryStore;
    use crate::view::GridCell;

    #[test]
    fn selection_falls_back_to_first_habit() {
        let store = HabitStore::open(Arc::new(MemoryStore::new()));
        let first = store.create("First", "").unwrap();
        let second = store.create("Second", "").unwrap();
        let habits = store.list();

        assert_eq!(select(&habits, None).unwrap().id(), first.id());
        assert_eq!(select(&habits, Some(second.id())).unwrap().id(), second.id());
        assert_eq!(
            select(&habits, Some(&HabitId::from("gone"))).unwrap().id(),
            first.id()
        );
        assert!(select(&[], None).is_none());
    }

    #[test]
    fn snapshot_reflects_latest_toggle() {
        let store = HabitStore::open(Arc::new(MemoryStore::new()));
        let habit = store.create("Read", "").unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let view = CalendarView::new(today);

        let before = snapshot(&store, &view, Some(habit.id()), today).unwrap();
        assert_eq!(before.stats.current_streak, 0);

        store
            .toggle_day(habit.id(), DateKey::from_date(today))
            .unwrap();
        let after = snapshot(&store, &view, Some(habit.id()), today).unwrap();
        assert_eq!(after.stats.current_streak, 1);
        assert_eq!(after.stats.this_week, 1);
        assert_eq!(after.stats.goal_progress, 20);
        let completed = after
            .grid
            .days()
            .filter(|cell| matches!(cell, GridCell::Day { completed: true, .. }))
            .count();
        assert_eq!(completed, 1);
    }

    #[test]
    fn empty_store_has_no_snapshot() {
        let store = HabitStore::open(Arc::new(MemoryStore::new()));
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert!(snapshot(&store, &CalendarView::new(today), None, today).is_none());
    }
}
