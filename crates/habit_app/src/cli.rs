use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use habit_core::{DateKey, MonthCursor, ReminderTime};

#[derive(Debug, Parser)]
#[command(name = "habits", about = "Track daily habits, streaks and reminders")]
pub struct Cli {
    /// Directory holding the persisted habit collection
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List habits in display order
    List,
    /// Create a habit with the default weekly goal of 5
    Add {
        name: String,
        /// Accent color, e.g. `#22c55e`
        #[arg(long, default_value = "")]
        color: String,
    },
    Rename {
        id: String,
        name: String,
    },
    Delete {
        id: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Set the weekly goal; values are clamped to 1..=7
    Goal {
        id: String,
        #[arg(allow_hyphen_values = true)]
        goal: i64,
    },
    /// Enable or disable the daily reminder
    Remind {
        id: String,
        #[arg(value_enum)]
        state: Switch,
        /// Reminder time as HH:MM (defaults to 20:00)
        #[arg(long)]
        at: Option<ReminderTime>,
    },
    /// Flip completion for a day (today by default)
    Toggle {
        id: String,
        #[arg(long)]
        date: Option<DateKey>,
    },
    /// Calendar and statistics for one habit
    Show {
        id: Option<String>,
        /// Month to display as YYYY-MM (defaults to the current month)
        #[arg(long)]
        month: Option<MonthCursor>,
    },
    /// Write the completion ledger of every habit as CSV
    ExportCsv {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write 30 days of reminder events as an iCalendar file
    ExportIcs {
        id: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run the reminder scheduler in the foreground
    Watch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reminder_command() {
        let cli = Cli::try_parse_from(["habits", "remind", "abc", "on", "--at", "07:15"]).unwrap();
        match cli.command {
            Command::Remind { id, state, at } => {
                assert_eq!(id, "abc");
                assert_eq!(state, Switch::On);
                assert_eq!(at.unwrap().to_string(), "07:15");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(Cli::try_parse_from(["habits", "toggle", "abc", "--date", "2024-1-1"]).is_err());
    }

    #[test]
    fn accepts_negative_goals_for_clamping() {
        let cli = Cli::try_parse_from(["habits", "goal", "abc", "-3"]).unwrap();
        assert!(matches!(cli.command, Command::Goal { goal: -3, .. }));
    }
}
