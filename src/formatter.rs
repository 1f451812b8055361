// Human readable rendering of entries: relative dates, durations and the `list` output.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use std::fmt::{Display, Formatter};
use std::io::{self, Write};

use crate::data::Entry;

/// Render `t` relative to the day `today`: `today 09:30`, `yesterday 09:30`, `3 days ago 09:30`
/// up to five days back, `2014-08-01 09:30` otherwise.
pub fn relative_date(t: NaiveDateTime, today: NaiveDate) -> String {
    let time = t.format("%H:%M");

    match (today - t.date()).num_days() {
        0 => format!("today {time}"),
        1 => format!("yesterday {time}"),
        age @ 2..=5 => format!("{age} days ago {time}"),
        _ => t.format("%Y-%m-%d %H:%M").to_string(),
    }
}

/// Print a duration as words, e.g. `2 hours 9 min 37 sec`. Hours do not roll over into days.
pub fn human_duration(d: &Duration) -> String {
    let total = d.num_seconds();
    if total < 0 {
        return format!("-{}", human_duration(&Duration::seconds(-total)));
    }

    let hours = total / 3600;
    let minutes = total % 3600 / 60;
    let seconds = total % 60;

    let mut parts = vec![];
    match hours {
        0 => {}
        1 => parts.push("one hour".to_string()),
        h => parts.push(format!("{h} hours")),
    }
    if minutes != 0 {
        parts.push(format!("{minutes} min"));
    }
    if seconds != 0 || parts.is_empty() {
        parts.push(format!("{seconds} sec"));
    }

    parts.join(" ")
}

/// Render an entry for humans, dates being relative to `today`.
pub fn entry(entry: &Entry, today: NaiveDate) -> String {
    let id = entry
        .id()
        .map_or_else(|| "?".to_string(), |id| id.to_string());

    let state = match (entry.end(), entry.duration()) {
        (Some(end), Some(d)) => format!(
            "finished {} ({})",
            relative_date(end, today),
            human_duration(&d)
        ),
        _ => "until now".to_string(),
    };

    let text = if entry.text().is_empty() {
        "(no text)"
    } else {
        entry.text()
    };

    format!(
        "Task {}, started {}, {}: {}",
        id,
        relative_date(entry.start(), today),
        state,
        text
    )
}

impl Display for Entry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", entry(self, Local::now().date_naive()))
    }
}

/// Return the time spent on `entries`. Running entries count until `now`.
pub fn total(entries: &[&Entry], now: NaiveDateTime) -> Duration {
    entries.iter().fold(Duration::zero(), |acc, e| {
        acc + e.duration().unwrap_or_else(|| now - e.start())
    })
}

/// Write one line per entry followed by the total time spent on them.
pub fn list<W: Write>(writer: &mut W, entries: &[&Entry], now: NaiveDateTime) -> io::Result<()> {
    for e in entries {
        writeln!(writer, "{}", entry(e, now.date()))?;
    }
    writeln!(writer, "Total: {}", human_duration(&total(entries, now)))
}
