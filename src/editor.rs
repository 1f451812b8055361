// Functions editing the time entries of a store (start, stop).

use crate::data::{Entry, Store};
use crate::error::Error;
use anyhow::Result;
use chrono::NaiveDateTime;

/// Finish every running entry at `now`, then start a new one with `text`. Return how many entries
/// were finished.
pub fn start(store: &mut Store, text: &str, now: NaiveDateTime) -> usize {
    let mut finished = 0;
    for entry in store.unfinished_entries_mut() {
        tracing::warn!("ending unfinished entry: {}", entry);
        entry.finish(now);
        finished += 1;
    }

    store.append(Entry::started_at(text, now));
    finished
}

/// Finish the most recent entry at `now`, appending `extra` to its text if not empty.
///
/// Fails with [`Error::NoEntries`] on an empty store and with [`Error::AlreadyStopped`] if the
/// most recent entry is already finished.
pub fn stop<'a>(store: &'a mut Store, extra: &str, now: NaiveDateTime) -> Result<&'a Entry> {
    let entry = store.most_recent_entry_mut().ok_or(Error::NoEntries)?;
    if !entry.is_running() {
        return Err(Error::AlreadyStopped.into());
    }

    entry.finish(now);
    if !extra.trim().is_empty() {
        entry.append_text(extra);
    }

    Ok(entry)
}
