use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Local;
use habit_core::{
    clock::{Clock, SystemClock},
    dashboard,
    export::{self, ExportFile},
    notifications::{NotificationRequest, NotificationSink, Permission},
    reminders::{ReminderScheduler, DEFAULT_INTERVAL},
    storage::FileStore,
    view::CalendarView,
    DateKey, Habit, HabitId, HabitStore,
};
use tracing::{info, warn};

use crate::cli::{Cli, Command, Switch};
use crate::render;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) data_dir: PathBuf,
    pub(crate) reminder_interval: Duration,
    pub(crate) notifications: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("HABITS_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        if let Ok(interval) = std::env::var("HABITS_REMINDER_INTERVAL_SECS") {
            if let Ok(value) = interval.trim().parse::<u64>() {
                config.reminder_interval = Duration::from_secs(value.max(1));
            }
        }
        if let Ok(flag) = std::env::var("HABITS_NOTIFICATIONS") {
            config.notifications = notifications_enabled(&flag);
        }
        config
    }

    pub fn with_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.data_dir = dir;
        }
        self
    }
}

/// `0`, `off` and `false` in any case turn notifications off.
fn notifications_enabled(flag: &str) -> bool {
    let flag = flag.trim();
    !["0", "off", "false"]
        .iter()
        .any(|off| flag.eq_ignore_ascii_case(off))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".habits"),
            reminder_interval: DEFAULT_INTERVAL,
            notifications: true,
        }
    }
}

/// Prints reminders to the terminal. Permission is a configuration switch
/// rather than an interactive prompt.
struct TerminalSink {
    enabled: bool,
}

impl NotificationSink for TerminalSink {
    fn permission(&self) -> Permission {
        if self.enabled {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    fn request_permission(&self) -> Permission {
        self.permission()
    }

    fn notify(&self, notification: NotificationRequest) {
        println!(
            "[{}] {} ({})",
            notification.title,
            notification.body,
            notification.scheduled_for.format("%H:%M")
        );
    }
}

pub fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let config = config.with_data_dir(cli.data_dir);
    let storage = FileStore::open(&config.data_dir)
        .with_context(|| format!("unable to open {}", config.data_dir.display()))?;
    info!(path = %storage.dir().display(), "opened habit storage");

    let sink: Arc<dyn NotificationSink> = Arc::new(TerminalSink {
        enabled: config.notifications,
    });
    let store = Arc::new(
        HabitStore::builder(Arc::new(storage))
            .with_notification_sink(sink.clone())
            .open(),
    );
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match cli.command {
        Command::List => {
            print!("{}", render::habit_list(&store.list()));
        }
        Command::Add { name, color } => {
            let habit = store.create(&name, &color)?;
            println!("Created {} ({})", habit.name(), habit.id());
        }
        Command::Rename { id, name } => {
            let id = resolve_id(&store, &id)?;
            if let Some(habit) = store.rename(&id, &name)? {
                println!("Renamed to {}", habit.name());
            }
        }
        Command::Delete { id, yes } => {
            let id = resolve_id(&store, &id)?;
            let Some(habit) = store.get(&id) else {
                return Ok(());
            };
            if !yes {
                bail!("refusing to delete `{}` without --yes", habit.name());
            }
            store.delete(&id)?;
            println!("Deleted {}", habit.name());
        }
        Command::Goal { id, goal } => {
            let id = resolve_id(&store, &id)?;
            if let Some(habit) = store.set_goal(&id, goal)? {
                println!("Weekly goal for {} is now {}", habit.name(), habit.goal());
            }
        }
        Command::Remind { id, state, at } => {
            let id = resolve_id(&store, &id)?;
            let enabled = state == Switch::On;
            if let Some(change) = store.set_reminder(&id, enabled, at)? {
                let habit = &change.habit;
                if !enabled {
                    println!("Reminder for {} disabled", habit.name());
                } else {
                    let time = habit.reminder_time().unwrap_or_default();
                    println!("Reminder for {} set at {}", habit.name(), time);
                    if !change.permission.is_granted() {
                        println!("Warning: notifications are not permitted; this reminder will not fire.");
                    }
                }
            }
        }
        Command::Toggle { id, date } => {
            let id = resolve_id(&store, &id)?;
            let day = date.unwrap_or_else(|| DateKey::from_date(clock.today()));
            if let Some(done) = store.toggle_day(&id, day)? {
                let state = if done { "done" } else { "not done" };
                println!("{day} marked {state}");
            }
            show(&store, clock.as_ref(), Some(&id), None)?;
        }
        Command::Show { id, month } => {
            let id = id.map(|id| resolve_id(&store, &id)).transpose()?;
            let view = match month {
                Some(month) => CalendarView::at(month),
                None => CalendarView::new(clock.today()),
            };
            show(&store, clock.as_ref(), id.as_ref(), Some(view))?;
        }
        Command::ExportCsv { out } => {
            let file = export::csv_file(&store.list()).context("unable to build csv export")?;
            write_export(&config.data_dir, out, &file)?;
        }
        Command::ExportIcs { id, out } => {
            let habits = store.list();
            let selected = id.map(|id| resolve_id(&store, &id)).transpose()?;
            let Some(habit) = dashboard::select(&habits, selected.as_ref()) else {
                bail!("add a habit first");
            };
            let file = export::ics_file(habit, clock.today(), &Local);
            write_export(&config.data_dir, out, &file)?;
        }
        Command::Watch => {
            let handle = ReminderScheduler::new(store, clock, sink)
                .with_interval(config.reminder_interval)
                .start()
                .context("unable to start reminder scheduler")?;
            println!("Watching reminders; press Ctrl-C to stop.");
            handle.join();
        }
    }
    Ok(())
}

fn show(
    store: &HabitStore,
    clock: &dyn Clock,
    selected: Option<&HabitId>,
    view: Option<CalendarView>,
) -> Result<()> {
    let today = clock.today();
    let view = view.unwrap_or_else(|| CalendarView::new(today));
    match dashboard::snapshot(store, &view, selected, today) {
        Some(snapshot) => print!("{}", render::snapshot(&snapshot)),
        None => println!("No habits yet. Add one with `habits add <name>`."),
    }
    Ok(())
}

/// Accepts a full id or an unambiguous prefix of one.
fn resolve_id(store: &HabitStore, query: &str) -> Result<HabitId> {
    let habits = store.list();
    resolve_in(&habits, query)
}

fn resolve_in(habits: &[Habit], query: &str) -> Result<HabitId> {
    if let Some(habit) = habits.iter().find(|habit| habit.id().as_str() == query) {
        return Ok(habit.id().clone());
    }
    let matches: Vec<&Habit> = habits
        .iter()
        .filter(|habit| !query.is_empty() && habit.id().as_str().starts_with(query))
        .collect();
    match matches.as_slice() {
        [habit] => Ok(habit.id().clone()),
        [] => bail!("no habit with id `{query}`"),
        _ => bail!("id prefix `{query}` matches {} habits", matches.len()),
    }
}

fn write_export(data_dir: &Path, out: Option<PathBuf>, file: &ExportFile) -> Result<()> {
    let path = out.unwrap_or_else(|| data_dir.join(&file.file_name));
    fs::write(&path, &file.body).with_context(|| format!("unable to write {}", path.display()))?;
    info!(path = %path.display(), mime = file.mime, "export written");
    println!("Wrote {} ({})", path.display(), file.mime);
    if file.body.is_empty() {
        warn!(path = %path.display(), "export is empty");
    }
    Ok(())
}
