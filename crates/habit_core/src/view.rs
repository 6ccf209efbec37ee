use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    calendar::{monday_offset, DateKey, MonthCursor},
    error::HabitError,
    habit::{Habit, HabitId},
    store::HabitStore,
};

pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum GridCell {
    #[serde(rename = "blank")]
    Blank,
    #[serde(rename = "day")]
    Day {
        day: u32,
        key: DateKey,
        completed: bool,
    },
}

impl GridCell {
    pub fn key(&self) -> Option<DateKey> {
        match self {
            GridCell::Blank => None,
            GridCell::Day { key, .. } => Some(*key),
        }
    }
}

/// Week-major layout of one month. Every row has seven cells, Monday first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
    pub cursor: MonthCursor,
    pub title: String,
    pub weeks: Vec<[GridCell; 7]>,
}

impl MonthGrid {
    pub fn days(&self) -> impl Iterator<Item = &GridCell> {
        self.weeks
            .iter()
            .flatten()
            .filter(|cell| matches!(cell, GridCell::Day { .. }))
    }
}

/// Month cursor driving the calendar panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarView {
    cursor: MonthCursor,
}

impl CalendarView {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            cursor: MonthCursor::containing(today),
        }
    }

    pub fn at(cursor: MonthCursor) -> Self {
        Self { cursor }
    }

    pub fn cursor(&self) -> MonthCursor {
        self.cursor
    }

    pub fn next(&mut self) {
        self.cursor = self.cursor.shifted(1);
    }

    pub fn previous(&mut self) {
        self.cursor = self.cursor.shifted(-1);
    }

    pub fn build_grid(&self, habit: &Habit) -> MonthGrid {
        let cursor = self.cursor;
        let mut cells: Vec<GridCell> = Vec::new();
        if let Some(first) = cursor.first_day() {
            cells.extend((0..monday_offset(first)).map(|_| GridCell::Blank));
            for day in 1..=cursor.days() {
                let Some(date) = cursor.day(day) else {
                    break;
                };
                let key = DateKey::from_date(date);
                cells.push(GridCell::Day {
                    day,
                    key,
                    completed: habit.is_completed(key),
                });
            }
        }
        while cells.len() % 7 != 0 {
            cells.push(GridCell::Blank);
        }

        let weeks: Vec<[GridCell; 7]> = cells
            .chunks(7)
            .map(|week| std::array::from_fn(|column| week[column].clone()))
            .collect();

        MonthGrid {
            cursor,
            title: cursor.title(),
            weeks,
        }
    }

    /// Flips the ledger entry behind `cell`. Blank cells are ignored. The
    /// caller is responsible for recomputing statistics afterwards.
    pub fn toggle(
        &self,
        store: &HabitStore,
        habit_id: &HabitId,
        cell: &GridCell,
    ) -> Result<Option<bool>, HabitError> {
        match cell.key() {
            Some(key) => store.toggle_day(habit_id, key),
            None => Ok(None),
        }
    }
}
