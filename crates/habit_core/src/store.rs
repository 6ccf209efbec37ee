use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::{
    calendar::DateKey,
    error::{HabitError, StorageError},
    habit::{self, Habit, HabitCollection, HabitId, ReminderTime, DEFAULT_COLOR},
    notifications::{NotificationSink, Permission},
    storage::{KeyValueStore, HABITS_KEY},
};

/// Change notifications delivered to subscribers after the new state has
/// been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Created(HabitId),
    Renamed(HabitId),
    GoalChanged(HabitId),
    ReminderChanged(HabitId),
    Deleted(HabitId),
    DayToggled {
        id: HabitId,
        day: DateKey,
        completed: bool,
    },
}

impl StoreEvent {
    pub fn habit_id(&self) -> &HabitId {
        match self {
            StoreEvent::Created(id)
            | StoreEvent::Renamed(id)
            | StoreEvent::GoalChanged(id)
            | StoreEvent::ReminderChanged(id)
            | StoreEvent::Deleted(id) => id,
            StoreEvent::DayToggled { id, .. } => id,
        }
    }
}

type Subscriber = Box<dyn Fn(&StoreEvent) + Send + Sync>;

/// Result of a reminder change, carrying the permission state so callers can
/// warn when an enabled reminder will never fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderChange {
    pub habit: Habit,
    pub permission: Permission,
}

/// Owner of the habit collection.
///
/// Every operation re-reads the persisted document, and every mutation writes
/// the full collection back before returning.
pub struct HabitStore {
    storage: Arc<dyn KeyValueStore>,
    notification_sink: Option<Arc<dyn NotificationSink>>,
    write_lock: Mutex<()>,
    subscribers: RwLock<Vec<Subscriber>>,
}

pub struct HabitStoreBuilder {
    storage: Arc<dyn KeyValueStore>,
    notification_sink: Option<Arc<dyn NotificationSink>>,
}

impl HabitStoreBuilder {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            notification_sink: None,
        }
    }

    pub fn with_notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notification_sink = Some(sink);
        self
    }

    pub fn open(self) -> HabitStore {
        HabitStore {
            storage: self.storage,
            notification_sink: self.notification_sink,
            write_lock: Mutex::new(()),
            subscribers: RwLock::new(Vec::new()),
        }
    }
}

impl HabitStore {
    pub fn builder(storage: Arc<dyn KeyValueStore>) -> HabitStoreBuilder {
        HabitStoreBuilder::new(storage)
    }

    pub fn open(storage: Arc<dyn KeyValueStore>) -> Self {
        HabitStoreBuilder::new(storage).open()
    }

    /// Current collection in insertion order. Unreadable storage reads as
    /// empty, like corrupt storage.
    pub fn list(&self) -> HabitCollection {
        match self.read_collection() {
            Ok(habits) => habits,
            Err(err) => {
                warn!(%err, "unable to read habit collection");
                Vec::new()
            }
        }
    }

    pub fn get(&self, id: &HabitId) -> Option<Habit> {
        self.list().into_iter().find(|habit| habit.id() == id)
    }

    pub fn subscribe(&self, subscriber: impl Fn(&StoreEvent) + Send + Sync + 'static) {
        self.subscribers.write().push(Box::new(subscriber));
    }

    /// Appends a new habit with an empty ledger and the default goal. An empty
    /// `color` selects the default accent.
    pub fn create(&self, name: &str, color: &str) -> Result<Habit, HabitError> {
        let name = habit::validate_name(name)?;
        let color = match color.trim() {
            "" => DEFAULT_COLOR.to_string(),
            other => other.to_string(),
        };
        let habit = {
            let _guard = self.write_lock.lock();
            let mut habits = self.read_collection()?;
            let taken: HashSet<&HabitId> = habits.iter().map(Habit::id).collect();
            let mut id = HabitId::generate();
            while taken.contains(&id) {
                id = HabitId::generate();
            }
            let habit = Habit::new(id, name, color);
            habits.push(habit.clone());
            self.persist(&habits)?;
            habit
        };
        self.announce(&StoreEvent::Created(habit.id().clone()));
        Ok(habit)
    }

    pub fn rename(&self, id: &HabitId, new_name: &str) -> Result<Option<Habit>, HabitError> {
        let name = habit::validate_name(new_name)?;
        self.mutate(|habits| {
            let habit = find_mut(habits, id)?;
            habit.set_name(name);
            Some((habit.clone(), StoreEvent::Renamed(id.clone())))
        })
    }

    /// Out-of-range goals are clamped into `[1, 7]`, never rejected.
    pub fn set_goal(&self, id: &HabitId, goal: i64) -> Result<Option<Habit>, HabitError> {
        self.mutate(|habits| {
            let habit = find_mut(habits, id)?;
            habit.set_goal(goal);
            Some((habit.clone(), StoreEvent::GoalChanged(id.clone())))
        })
    }

    /// Enabling asks the host for notification permission first; the flag is
    /// stored whatever the answer.
    pub fn set_reminder(
        &self,
        id: &HabitId,
        enabled: bool,
        time: Option<ReminderTime>,
    ) -> Result<Option<ReminderChange>, HabitError> {
        let permission = if enabled {
            self.acquire_permission()
        } else {
            self.current_permission()
        };
        if enabled && !permission.is_granted() {
            warn!(habit_id = %id, ?permission, "reminder enabled without notification permission");
        }
        self.mutate(|habits| {
            let habit = find_mut(habits, id)?;
            habit.set_reminder(enabled, time);
            let change = ReminderChange {
                habit: habit.clone(),
                permission,
            };
            Some((change, StoreEvent::ReminderChanged(id.clone())))
        })
    }

    /// Returns whether a habit was removed.
    pub fn delete(&self, id: &HabitId) -> Result<bool, HabitError> {
        let removed = self.mutate(|habits| {
            let index = habits.iter().position(|habit| habit.id() == id)?;
            habits.remove(index);
            Some(((), StoreEvent::Deleted(id.clone())))
        })?;
        Ok(removed.is_some())
    }

    /// Flips the ledger entry for `day`, returning the new completion state.
    pub fn toggle_day(&self, id: &HabitId, day: DateKey) -> Result<Option<bool>, HabitError> {
        self.mutate(|habits| {
            let habit = find_mut(habits, id)?;
            let completed = habit.toggle(day);
            let event = StoreEvent::DayToggled {
                id: id.clone(),
                day,
                completed,
            };
            Some((completed, event))
        })
    }
}

impl HabitStore {
    fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut HabitCollection) -> Option<(T, StoreEvent)>,
    ) -> Result<Option<T>, HabitError> {
        let (value, event) = {
            let _guard = self.write_lock.lock();
            let mut habits = self.read_collection()?;
            let Some((value, event)) = apply(&mut habits) else {
                debug!("habit not found; nothing to change");
                return Ok(None);
            };
            self.persist(&habits)?;
            (value, event)
        };
        self.announce(&event);
        Ok(Some(value))
    }

    fn read_collection(&self) -> Result<HabitCollection, StorageError> {
        let raw = self.storage.get(HABITS_KEY)?;
        Ok(raw.map(|raw| decode_collection(&raw)).unwrap_or_default())
    }

    fn persist(&self, habits: &[Habit]) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(habits)?;
        self.storage.set(HABITS_KEY, &encoded)
    }

    fn announce(&self, event: &StoreEvent) {
        debug!(habit_id = %event.habit_id(), ?event, "habit collection updated");
        for subscriber in self.subscribers.read().iter() {
            subscriber(event);
        }
    }

    fn acquire_permission(&self) -> Permission {
        match &self.notification_sink {
            Some(sink) => match sink.permission() {
                Permission::Granted => Permission::Granted,
                _ => sink.request_permission(),
            },
            None => Permission::Unavailable,
        }
    }

    fn current_permission(&self) -> Permission {
        self.notification_sink
            .as_ref()
            .map(|sink| sink.permission())
            .unwrap_or(Permission::Unavailable)
    }
}

fn find_mut<'a>(habits: &'a mut [Habit], id: &HabitId) -> Option<&'a mut Habit> {
    habits.iter_mut().find(|habit| habit.id() == id)
}

/// Parses the persisted document. Anything other than a well-formed list of
/// habits yields an empty collection.
pub fn decode_collection(raw: &str) -> HabitCollection {
    let habits: HabitCollection = match serde_json::from_str(raw) {
        Ok(habits) => habits,
        Err(err) => {
            warn!(%err, "persisted habit collection is corrupt; starting empty");
            return Vec::new();
        }
    };
    let mut seen: HashSet<HabitId> = HashSet::new();
    habits
        .into_iter()
        .filter_map(|mut habit| {
            if !seen.insert(habit.id().clone()) {
                warn!(habit_id = %habit.id(), "dropping habit with duplicate id");
                return None;
            }
            habit.normalize();
            Some(habit)
        })
        .collect()
}
