pub mod calendar;
pub mod clock;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod habit;
pub mod notifications;
pub mod reminders;
pub mod stats;
pub mod storage;
pub mod store;
pub mod view;

pub use crate::calendar::{DateKey, MonthCursor};
pub use crate::error::{ExportError, HabitError, ParseError, StorageError};
pub use crate::habit::{Habit, HabitCollection, HabitId, ReminderTime};
pub use crate::store::{HabitStore, HabitStoreBuilder, StoreEvent};
