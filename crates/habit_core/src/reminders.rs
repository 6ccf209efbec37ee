use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::{
    clock::Clock,
    habit::Habit,
    notifications::{NotificationRequest, NotificationSink},
    store::HabitStore,
};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
pub const REMINDER_TITLE: &str = "Habit reminder";

/// Compares every enabled reminder against the current local `HH:MM`.
///
/// A reminder fires only if a tick lands inside its minute; missed minutes
/// are not caught up.
pub struct ReminderScheduler {
    store: Arc<HabitStore>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn NotificationSink>,
    interval: Duration,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<HabitStore>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            clock,
            sink,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn tick(&self) -> Vec<NotificationRequest> {
        self.tick_at(self.clock.now())
    }

    /// Raises every reminder due at `now` and returns what was raised.
    pub fn tick_at(&self, now: NaiveDateTime) -> Vec<NotificationRequest> {
        let due = due_reminders(&self.store.list(), now);
        if due.is_empty() {
            return due;
        }
        if !self.sink.permission().is_granted() {
            debug!(count = due.len(), "notification permission missing; reminders dropped");
            return Vec::new();
        }
        for notification in &due {
            info!(habit_id = %notification.habit_id, "raising habit reminder");
            self.sink.notify(notification.clone());
        }
        due
    }

    /// Runs `tick` on a background thread every `interval` until the returned
    /// handle is stopped or dropped.
    pub fn start(self) -> io::Result<ReminderHandle> {
        let signal = Arc::new(StopSignal::default());
        let thread_signal = signal.clone();
        let thread = thread::Builder::new()
            .name("habit-reminders".into())
            .spawn(move || {
                let interval_ms = self.interval.as_millis() as u64;
                info!(interval_ms, "reminder scheduler started");
                loop {
                    self.tick();
                    if thread_signal.wait(self.interval) {
                        break;
                    }
                }
                info!("reminder scheduler stopped");
            })?;
        Ok(ReminderHandle {
            signal,
            thread: Some(thread),
        })
    }
}

pub fn due_reminders(habits: &[Habit], now: NaiveDateTime) -> Vec<NotificationRequest> {
    habits
        .iter()
        .filter(|habit| habit.reminder_enabled())
        .filter(|habit| {
            habit
                .reminder_time()
                .is_some_and(|time| time.matches(now.time()))
        })
        .map(|habit| reminder_notification(habit, now))
        .collect()
}

pub fn reminder_notification(habit: &Habit, now: NaiveDateTime) -> NotificationRequest {
    NotificationRequest {
        habit_id: habit.id().clone(),
        title: REMINDER_TITLE.to_string(),
        body: format!("{} — time to check in!", habit.name()),
        scheduled_for: now,
    }
}

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    /// Sleeps for `timeout` or until stopped; returns whether stop was requested.
    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.wake.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }

    fn stop(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }
}

pub struct ReminderHandle {
    signal: Arc<StopSignal>,
    thread: Option<JoinHandle<()>>,
}

impl ReminderHandle {
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Blocks the caller for as long as the scheduler runs.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("reminder thread panicked");
            }
        }
    }

    fn shutdown(&mut self) {
        self.signal.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("reminder thread panicked");
            }
        }
    }
}

impl Drop for ReminderHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::habit::ReminderTime;
    use crate::notifications::Permission;
    use crate::storage::MemoryStore;
    use chrono::NaiveDate;

    struct RecordingSink {
        permission: Permission,
        sent: Mutex<Vec<NotificationRequest>>,
    }

    impl RecordingSink {
        fn new(permission: Permission) -> Arc<Self> {
            Arc::new(Self {
                permission,
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    impl NotificationSink for RecordingSink {
        fn permission(&self) -> Permission {
            self.permission
        }

        fn request_permission(&self) -> Permission {
            self.permission
        }

        fn notify(&self, notification: NotificationRequest) {
            self.sent.lock().push(notification);
        }
    }

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    fn setup(permission: Permission) -> (Arc<HabitStore>, Arc<RecordingSink>, Arc<FixedClock>) {
        let sink = RecordingSink::new(permission);
        let store = HabitStore::builder(Arc::new(MemoryStore::new()))
            .with_notification_sink(sink.clone())
            .open();
        (Arc::new(store), sink, Arc::new(FixedClock::new(at(8, 0, 0))))
    }

    #[test]
    fn fires_only_on_the_exact_minute() {
        let (store, sink, clock) = setup(Permission::Granted);
        let read = store.create("Read", "").unwrap();
        let walk = store.create("Walk", "").unwrap();
        store.create("Quiet", "").unwrap();
        store
            .set_reminder(read.id(), true, ReminderTime::from_hm(20, 0))
            .unwrap();
        store
            .set_reminder(walk.id(), true, ReminderTime::from_hm(7, 30))
            .unwrap();

        let scheduler = ReminderScheduler::new(store.clone(), clock.clone(), sink.clone());
        assert!(scheduler.tick_at(at(19, 59, 59)).is_empty());
        let fired = scheduler.tick_at(at(20, 0, 42));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].habit_id, *read.id());
        assert_eq!(fired[0].title, REMINDER_TITLE);
        assert_eq!(fired[0].body, "Read — time to check in!");
        assert!(scheduler.tick_at(at(20, 1, 0)).is_empty());

        clock.set(at(7, 30, 5));
        let fired = scheduler.tick();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].habit_id, *walk.id());
        assert_eq!(sink.sent.lock().len(), 2);
    }

    #[test]
    fn disabled_reminders_never_fire() {
        let (store, sink, _) = setup(Permission::Granted);
        let habit = store.create("Read", "").unwrap();
        store.set_reminder(habit.id(), true, None).unwrap();
        store.set_reminder(habit.id(), false, None).unwrap();
        let clock = Arc::new(FixedClock::new(at(20, 0, 0)));
        let scheduler = ReminderScheduler::new(store, clock, sink.clone());
        assert!(scheduler.tick().is_empty());
        assert!(sink.sent.lock().is_empty());
    }

    #[test]
    fn denied_permission_keeps_the_flag_but_stays_silent() {
        let (store, sink, clock) = setup(Permission::Denied);
        let habit = store.create("Read", "").unwrap();
        let change = store.set_reminder(habit.id(), true, None).unwrap().unwrap();
        assert_eq!(change.permission, Permission::Denied);
        assert!(store.get(habit.id()).unwrap().reminder_enabled());

        clock.set(at(20, 0, 0));
        let scheduler = ReminderScheduler::new(store, clock, sink.clone());
        assert!(scheduler.tick().is_empty());
        assert!(sink.sent.lock().is_empty());
    }

    #[test]
    fn background_loop_ticks_until_stopped() {
        let (store, sink, clock) = setup(Permission::Granted);
        let habit = store.create("Read", "").unwrap();
        store.set_reminder(habit.id(), true, None).unwrap();
        clock.set(at(20, 0, 0));

        let handle = ReminderScheduler::new(store, clock, sink.clone())
            .with_interval(Duration::from_millis(5))
            .start()
            .expect("spawn scheduler");
        let deadline = Instant::now() + Duration::from_secs(5);
        while sink.sent.lock().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(handle.is_running());
        handle.stop();
        assert!(!sink.sent.lock().is_empty());
    }
}
