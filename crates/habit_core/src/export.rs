use std::io;

use chrono::{NaiveDate, TimeZone, Utc};
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::{calendar::add_days, error::ExportError, habit::Habit};

pub const CSV_MIME: &str = "text/csv";
pub const ICS_MIME: &str = "text/calendar";
pub const CSV_FILE_NAME: &str = "habits.csv";
pub const CSV_HEADER: [&str; 4] = ["habit_id", "habit_name", "date", "done"];
pub const ICS_EVENT_COUNT: i64 = 30;
pub const ICS_PRODUCT_ID: &str = "-//NewsLens//Habits//EN";

/// A generated document ready to be offered as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub mime: &'static str,
    pub body: String,
}

/// One row per ledger entry, `false` entries included, in collection order and
/// then chronological order within each habit. Every field is quoted and the
/// last row has no line terminator.
pub fn to_csv(habits: &[Habit]) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for habit in habits {
        for (day, done) in habit.history() {
            let day = day.to_string();
            let done = done.to_string();
            writer.write_record([
                habit.id().as_str(),
                habit.name(),
                day.as_str(),
                done.as_str(),
            ])?;
        }
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Flush(io::Error::new(err.error().kind(), err.error().to_string())))?;
    let mut text = String::from_utf8(bytes)?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

pub fn csv_file(habits: &[Habit]) -> Result<ExportFile, ExportError> {
    Ok(ExportFile {
        file_name: CSV_FILE_NAME.to_string(),
        mime: CSV_MIME,
        body: to_csv(habits)?,
    })
}

/// Thirty single events, one per day from `today`, each at the habit's
/// reminder time (20:00 when unset) in `tz`, written as UTC instants.
pub fn to_ics<Tz: TimeZone>(habit: &Habit, today: NaiveDate, tz: &Tz) -> String {
    let time = habit.reminder_time().unwrap_or_default().as_naive_time();
    let summary = escape_text(&format!("{} – Habit Reminder", habit.name()));

    let mut lines: Vec<String> = vec![
        "BEGIN:VCALENDAR".into(),
        "VERSION:2.0".into(),
        format!("PRODID:{ICS_PRODUCT_ID}"),
    ];
    for offset in 0..ICS_EVENT_COUNT {
        let local = add_days(today, offset).and_time(time);
        let instant = match tz.from_local_datetime(&local).earliest() {
            Some(instant) => instant.with_timezone(&Utc),
            None => Utc.from_utc_datetime(&local),
        };
        let stamp = instant.format("%Y%m%dT%H%M%SZ").to_string();
        lines.push("BEGIN:VEVENT".into());
        lines.push(format!("UID:nl-{}-{offset}@newslens", habit.id()));
        lines.push(format!("DTSTAMP:{stamp}"));
        lines.push(format!("DTSTART:{stamp}"));
        lines.push(format!("SUMMARY:{summary}"));
        lines.push("END:VEVENT".into());
    }
    lines.push("END:VCALENDAR".into());
    lines.join("\r\n")
}

pub fn ics_file<Tz: TimeZone>(habit: &Habit, today: NaiveDate, tz: &Tz) -> ExportFile {
    ExportFile {
        file_name: format!("{}-reminders.ics", safe_file_stem(habit.name())),
        mime: ICS_MIME,
        body: to_ics(habit, today, tz),
    }
}

/// Habit names are free text; path separators, reserved characters and
/// control characters become `_` so the download name stays one component.
fn safe_file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match stem.trim() {
        "" | "." | ".." => "habit".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// RFC 5545 TEXT escaping.
fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    escaped
}
