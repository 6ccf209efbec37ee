use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Canonical `YYYY-MM-DD` identifier of one local calendar day.
///
/// A key can only be obtained from a real `NaiveDate` or by parsing its own
/// canonical form, so ordering keys is the same as ordering days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(s, DATE_KEY_FORMAT)
            .map_err(|_| ParseError::DateKey(s.to_string()))?;
        let key = Self(date);
        // chrono accepts unpadded fields; only the canonical spelling is a key
        if key.to_string() != s {
            return Err(ParseError::DateKey(s.to_string()));
        }
        Ok(key)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// A (year, month) pair with no range restriction on the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthCursor {
    pub year: i32,
    /// 1-based.
    pub month: u32,
}

impl MonthCursor {
    pub fn new(year: i32, month: u32) -> Self {
        let (year, month) = shift_month(year, month.clamp(1, 12), 0);
        Self { year, month }
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn shifted(self, delta: i64) -> Self {
        let (year, month) = shift_month(self.year, self.month, delta);
        Self { year, month }
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn day(self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    pub fn days(self) -> u32 {
        days_in_month(self.year, self.month)
    }

    pub fn title(self) -> String {
        month_title(self.year, self.month)
    }
}

impl fmt::Display for MonthCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthCursor {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::Month(s.to_string());
        let (year, month) = s.trim().rsplit_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Self { year, month })
    }
}

/// Shifts a 1-based month by `delta` months, carrying into the year.
pub fn shift_month(year: i32, month: u32, delta: i64) -> (i32, u32) {
    let total = i64::from(year) * 12 + i64::from(month) - 1 + delta;
    let year = total.div_euclid(12).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    let month = total.rem_euclid(12) as u32 + 1;
    (year, month)
}

/// Number of days in the month, using the proleptic Gregorian leap rule so it
/// stays defined beyond the range chrono can represent.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Column of `date` in a Monday-first week (Monday = 0).
pub fn monday_offset(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    add_days(date, -i64::from(monday_offset(date)))
}

/// Saturates at chrono's representable range instead of panicking.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

pub fn month_title(year: i32, month: u32) -> String {
    match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(first) => first.format("%B %Y").to_string(),
        None => format!("{year:04}-{month:02}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_key_formats_zero_padded() {
        assert_eq!(DateKey::from_date(date(2024, 1, 5)).to_string(), "2024-01-05");
    }

    #[test]
    fn date_key_rejects_non_canonical_spellings() {
        assert!("2024-1-5".parse::<DateKey>().is_err());
        assert!("2024-02-30".parse::<DateKey>().is_err());
        assert!("yesterday".parse::<DateKey>().is_err());
        assert_eq!(
            "2024-02-29".parse::<DateKey>().unwrap().date(),
            date(2024, 2, 29)
        );
    }

    #[test]
    fn date_key_order_matches_string_order() {
        let keys = [
            DateKey::from(date(2023, 12, 31)),
            DateKey::from(date(2024, 1, 1)),
            DateKey::from(date(2024, 10, 2)),
        ];
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].to_string() < pair[1].to_string());
        }
    }

    #[test]
    fn shift_month_carries_across_years() {
        assert_eq!(shift_month(2024, 12, 1), (2025, 1));
        assert_eq!(shift_month(2024, 1, -1), (2023, 12));
        assert_eq!(shift_month(2024, 3, -27), (2021, 12));
        assert_eq!(shift_month(0, 1, -1), (-1, 12));
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn week_start_is_monday() {
        // 2026-10-19 is a Monday
        assert_eq!(week_start(date(2026, 10, 19)), date(2026, 10, 19));
        assert_eq!(week_start(date(2026, 10, 25)), date(2026, 10, 19));
        assert_eq!(monday_offset(date(2026, 10, 25)), 6);
    }

    #[test]
    fn month_cursor_parses_and_titles() {
        let cursor: MonthCursor = "2026-10".parse().unwrap();
        assert_eq!(cursor, MonthCursor::new(2026, 10));
        assert_eq!(cursor.title(), "October 2026");
        assert_eq!(cursor.to_string(), "2026-10");
        assert!("2026-13".parse::<MonthCursor>().is_err());
    }
}
