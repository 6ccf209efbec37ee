//! Read-side projections over a habit's completion ledger.
//!
//! Every function is pure: the same ledger and reference day always produce
//! the same numbers. A day counts as completed only when its ledger entry is
//! `true`.

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::{add_days, week_start, MonthCursor};
use crate::habit::Habit;

/// How far back `best_streak` looks, in days before the reference day.
pub const BEST_STREAK_WINDOW_DAYS: i64 = 180;
pub const WEEKLY_BUCKET_COUNT: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub current_streak: u32,
    pub best_streak: u32,
    /// Oldest first; the last bucket ends on the reference day.
    pub weekly_buckets: [u32; WEEKLY_BUCKET_COUNT],
    /// Completions from Monday of the reference week through the reference day.
    pub this_week: u32,
    /// `this_week` against the weekly goal, capped at 100.
    pub goal_progress: u32,
    /// Percentage of the viewed month's days that are completed.
    pub period_completion_ratio: f64,
}

pub fn compute_stats(habit: &Habit, as_of: NaiveDate, period: MonthCursor) -> Stats {
    let this_week = this_week(habit, as_of);
    Stats {
        current_streak: current_streak(habit, as_of),
        best_streak: best_streak(habit, as_of),
        weekly_buckets: weekly_buckets(habit, as_of),
        this_week,
        goal_progress: goal_progress(this_week, habit.goal()),
        period_completion_ratio: period_completion_ratio(habit, period),
    }
}

/// Consecutive completed days ending at `as_of`; zero when `as_of` itself is
/// not completed.
pub fn current_streak(habit: &Habit, as_of: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = Some(as_of);
    while let Some(current) = day {
        if !habit.is_completed_on(current) {
            break;
        }
        streak += 1;
        day = current.pred_opt();
    }
    streak
}

/// Longest run of completed days inside `as_of - 180 ..= as_of`. Runs are cut
/// at the window start even if they continue further back.
pub fn best_streak(habit: &Habit, as_of: NaiveDate) -> u32 {
    let start = add_days(as_of, -BEST_STREAK_WINDOW_DAYS);
    let mut best = 0;
    let mut run = 0;
    let mut expected = start;
    for key in habit.completed_between(start, as_of) {
        let day = key.date();
        run = if day == expected { run + 1 } else { 1 };
        best = best.max(run);
        expected = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    best
}

/// Eight seven-day buckets walking back from `as_of` in whole weeks. Bucket
/// `i` covers the week ending `(7 - i) * 7` days before `as_of`.
pub fn weekly_buckets(habit: &Habit, as_of: NaiveDate) -> [u32; WEEKLY_BUCKET_COUNT] {
    let mut buckets = [0; WEEKLY_BUCKET_COUNT];
    for (index, bucket) in buckets.iter_mut().enumerate() {
        let weeks_back = (WEEKLY_BUCKET_COUNT - 1 - index) as i64;
        let end = add_days(as_of, -weeks_back * 7);
        let start = add_days(end, -6);
        *bucket = count_completed(habit, start, end);
    }
    buckets
}

pub fn this_week(habit: &Habit, as_of: NaiveDate) -> u32 {
    count_completed(habit, week_start(as_of), as_of)
}

pub fn goal_progress(this_week: u32, goal: u8) -> u32 {
    let goal = u32::from(goal.max(1));
    let percent = (f64::from(this_week) / f64::from(goal) * 100.0).round() as u32;
    percent.min(100)
}

pub fn period_completion_ratio(habit: &Habit, period: MonthCursor) -> f64 {
    let days = period.days();
    let (Some(first), Some(last)) = (period.first_day(), period.day(days)) else {
        return 0.0;
    };
    let completed = count_completed(habit, first, last);
    f64::from(completed) / f64::from(days) * 100.0
}

fn count_completed(habit: &Habit, start: NaiveDate, end: NaiveDate) -> u32 {
    habit.completed_between(start, end).count() as u32
}
