use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::calendar::DateKey;
use crate::error::{HabitError, ParseError};

pub const DEFAULT_GOAL: u8 = 5;
pub const MIN_GOAL: u8 = 1;
pub const MAX_GOAL: u8 = 7;
pub const DEFAULT_COLOR: &str = "#7c3aed";

/// Insertion-ordered; ids are unique.
pub type HabitCollection = Vec<Habit>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(String);

impl HabitId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HabitId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for HabitId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Wall-clock time of day at minute resolution, written `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReminderTime(NaiveTime);

impl ReminderTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn hour(self) -> u32 {
        self.0.hour()
    }

    pub fn minute(self) -> u32 {
        self.0.minute()
    }

    pub fn as_naive_time(self) -> NaiveTime {
        self.0
    }

    /// Exact `HH:MM` match against the given wall-clock time.
    pub fn matches(self, now: NaiveTime) -> bool {
        self.to_string() == now.format("%H:%M").to_string()
    }
}

impl Default for ReminderTime {
    fn default() -> Self {
        Self(NaiveTime::from_hms_opt(20, 0, 0).unwrap_or_default())
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ReminderTime {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::ReminderTime(s.to_string());
        let (hour, minute) = s.split_once(':').ok_or_else(invalid)?;
        if hour.len() != 2 || minute.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;
        Self::from_hm(hour, minute).ok_or_else(invalid)
    }
}

impl Serialize for ReminderTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReminderTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// One tracked habit together with its completion ledger.
///
/// The serialised field names are the persisted document format; unknown
/// fields are rejected so malformed documents never half-load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Habit {
    id: HabitId,
    name: String,
    color: String,
    #[serde(default = "default_goal", deserialize_with = "deserialize_goal")]
    goal: u8,
    #[serde(rename = "remTime", default)]
    reminder_time: Option<ReminderTime>,
    #[serde(rename = "remOn", default)]
    reminder_enabled: bool,
    #[serde(default)]
    history: BTreeMap<DateKey, bool>,
}

fn default_goal() -> u8 {
    DEFAULT_GOAL
}

/// Stored goals may be any JSON number, fractional or out of range; they are
/// rounded and clamped rather than failing the whole document.
fn deserialize_goal<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(DEFAULT_GOAL);
    };
    let goal = match number.as_i64() {
        Some(goal) => goal,
        None => number.as_f64().map_or(i64::from(DEFAULT_GOAL), |goal| goal.round() as i64),
    };
    Ok(clamp_goal(goal))
}

impl Habit {
    pub(crate) fn new(id: HabitId, name: String, color: String) -> Self {
        Self {
            id,
            name,
            color,
            goal: DEFAULT_GOAL,
            reminder_time: None,
            reminder_enabled: false,
            history: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &HabitId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn goal(&self) -> u8 {
        self.goal
    }

    pub fn reminder_time(&self) -> Option<ReminderTime> {
        self.reminder_time
    }

    pub fn reminder_enabled(&self) -> bool {
        self.reminder_enabled
    }

    /// The raw ledger, including explicit `false` entries.
    pub fn history(&self) -> &BTreeMap<DateKey, bool> {
        &self.history
    }

    pub fn is_completed(&self, key: DateKey) -> bool {
        self.history.get(&key).copied().unwrap_or(false)
    }

    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        self.is_completed(DateKey::from_date(date))
    }

    /// Completed days within `start..=end`, in chronological order.
    pub fn completed_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Iterator<Item = DateKey> + '_ {
        let range = if start <= end {
            Some(DateKey::from_date(start)..=DateKey::from_date(end))
        } else {
            None
        };
        range
            .into_iter()
            .flat_map(move |range| self.history.range(range))
            .filter(|(_, done)| **done)
            .map(|(key, _)| *key)
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_goal(&mut self, goal: i64) {
        self.goal = clamp_goal(goal);
    }

    pub(crate) fn set_reminder(&mut self, enabled: bool, time: Option<ReminderTime>) {
        if enabled {
            self.reminder_time = Some(time.or(self.reminder_time).unwrap_or_default());
        } else if time.is_some() {
            self.reminder_time = time;
        }
        self.reminder_enabled = enabled;
    }

    /// Flips the entry for `key`, creating it as completed when absent.
    pub(crate) fn toggle(&mut self, key: DateKey) -> bool {
        let entry = self.history.entry(key).or_insert(false);
        *entry = !*entry;
        *entry
    }

    /// Restores invariants on a record read from storage.
    pub(crate) fn normalize(&mut self) {
        self.goal = clamp_goal(i64::from(self.goal));
        if self.reminder_enabled && self.reminder_time.is_none() {
            self.reminder_time = Some(ReminderTime::default());
        }
    }
}

pub fn clamp_goal(goal: i64) -> u8 {
    goal.clamp(i64::from(MIN_GOAL), i64::from(MAX_GOAL)) as u8
}

/// Trims a user-supplied habit name, rejecting names that end up empty.
pub fn validate_name(name: &str) -> Result<String, HabitError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(HabitError::EmptyName);
    }
    Ok(trimmed.to_string())
}
