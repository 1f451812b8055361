use crate::error::Error;
use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while_m_n};
use nom::character::complete::{char as nom_char, one_of, space1};
use nom::combinator::{all_consuming, eof, map, map_opt, recognize, rest, value};
use nom::sequence::{preceded, separated_pair, tuple};
use nom::IResult as NomResult;

/// Format of both timestamps of a storage line.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Written in place of the end timestamp while an entry is running.
pub const KEYWORD_RUNNING: &str = "running";

fn digits(count: usize) -> impl Fn(&str) -> NomResult<&str, &str> {
    move |input| take_while_m_n(count, count, |c: char| c.is_ascii_digit())(input)
}

fn parse_timestamp(input: &str) -> NomResult<&str, NaiveDateTime> {
    map_opt(
        separated_pair(
            recognize(tuple((
                digits(4),
                nom_char('-'),
                digits(2),
                nom_char('-'),
                digits(2),
            ))),
            space1,
            recognize(tuple((
                digits(2),
                nom_char(':'),
                digits(2),
                nom_char(':'),
                digits(2),
            ))),
        ),
        |(date, time): (&str, &str)| {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
            let time = NaiveTime::parse_from_str(time, "%H:%M:%S").ok()?;
            Some(date.and_time(time))
        },
    )(input)
}

fn parse_end(input: &str) -> NomResult<&str, Option<NaiveDateTime>> {
    alt((
        value(None, tag(KEYWORD_RUNNING)),
        map(parse_timestamp, Some),
    ))(input)
}

fn blank_to_end(input: &str) -> NomResult<&str, &str> {
    value("", tuple((take_while(|c: char| matches!(c, ' ' | '\t' | '\r')), eof)))(input)
}

/*
The text part of a line is one of:
  <blanks>
  ":" <blanks>
  ": <text>"
Everything after the single space or tab following the colon belongs to the text.
 */
fn parse_text(input: &str) -> NomResult<&str, &str> {
    alt((
        blank_to_end,
        preceded(
            nom_char(':'),
            alt((blank_to_end, preceded(one_of(" \t"), rest))),
        ),
    ))(input)
}

fn parse_entry(input: &str) -> NomResult<&str, (NaiveDateTime, Option<NaiveDateTime>, &str)> {
    all_consuming(tuple((
        parse_timestamp,
        preceded(space1, parse_end),
        parse_text,
    )))(input)
}

/// Current local time, truncated to whole seconds so that it survives a trip through the storage
/// format.
pub fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// One tracked activity: a start time, an optional end time and some free text which may carry
/// `+tags`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    id: Option<usize>,
    text: String,
    start: NaiveDateTime,
    end: Option<NaiveDateTime>,
}

impl Entry {
    /// Create a running entry started now.
    pub fn new(text: &str) -> Entry {
        Entry::started_at(text, now())
    }

    /// Create a running entry started at `start`.
    pub fn started_at(text: &str, start: NaiveDateTime) -> Entry {
        Entry {
            id: None,
            text: single_line(text),
            start,
            end: None,
        }
    }

    /// Same entry, finished at `end`.
    pub fn with_end(mut self, end: NaiveDateTime) -> Entry {
        self.end = Some(end);
        self
    }

    /// Return the ID of the entry, if it was loaded from storage. IDs count up from one in file
    /// order and are recomputed on every load, so they do not identify an entry across runs.
    pub fn id(&self) -> Option<usize> {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        self.end
    }

    /// Return true while the entry has no end time.
    pub fn is_running(&self) -> bool {
        self.end.is_none()
    }

    /// Return `end - start`, or None for a running entry.
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end - self.start)
    }

    /// Set the end time.
    pub fn finish(&mut self, at: NaiveDateTime) {
        self.end = Some(at);
    }

    /// Append `extra` to the text, separated by a space.
    pub fn append_text(&mut self, extra: &str) {
        let extra = single_line(extra);
        self.text = format!("{} {}", self.text, extra).trim().to_string();
    }

    /// Return the lower-cased tags of the entry: every whitespace separated word of the text
    /// starting with `+`, without the `+`. A lone `+` is not a tag.
    pub fn tags(&self) -> BTreeSet<String> {
        self.text
            .split_whitespace()
            .filter_map(|word| word.strip_prefix('+'))
            .filter(|tag| !tag.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    /// Return the storage representation of the entry (without line terminator).
    pub fn to_line(&self) -> String {
        let end = match self.end {
            Some(end) => end.format(DATE_FORMAT).to_string(),
            None => KEYWORD_RUNNING.to_string(),
        };

        format!("{} {}: {}", self.start.format(DATE_FORMAT), end, self.text)
    }
}

/// Text as it can be stored: on one line, and empty rather than blank.
fn single_line(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    text.replace(['\r', '\n'], " ")
}

impl FromStr for Entry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let line = s.trim_start();
        let line = line.strip_suffix('\r').unwrap_or(line);

        match parse_entry(line) {
            Ok((_, (start, end, text))) => Ok(Entry {
                id: None,
                text: text.to_string(),
                start,
                end,
            }),
            Err(_) => Err(Error::Parse(s.to_string())),
        }
    }
}

/// Return true for lines which carry no entry: blank ones and `#` comments.
fn is_comment(line: &str) -> bool {
    line.trim().is_empty() || line.starts_with('#')
}

/// The ordered collection of entries backing a command.
#[derive(Clone, Debug, Default)]
pub struct Store {
    entries: Vec<Entry>,
    skipped: usize,
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }

    /// Load entries from any line source.
    ///
    /// Lines that cannot be parsed are reported and skipped; they never abort the load.
    pub fn load<R: BufRead>(reader: R) -> Result<Store> {
        let mut store = Store::new();
        store.extend_from(reader, Path::new("<input>"))?;
        Ok(store)
    }

    fn extend_from<R: BufRead>(&mut self, reader: R, origin: &Path) -> Result<()> {
        for (number, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Cannot read {}", origin.display()))?;
            if is_comment(&line) {
                continue;
            }

            match line.parse::<Entry>() {
                Ok(mut entry) => {
                    entry.id = Some(self.entries.len() + 1);
                    self.entries.push(entry);
                }
                Err(e) => {
                    tracing::warn!("{}:{}: {}, skipping it", origin.display(), number + 1, e);
                    self.skipped += 1;
                }
            }
        }

        Ok(())
    }

    /// Load the entries stored in `path`. A missing file gives an empty Store.
    pub fn open(path: &Path) -> Result<Store> {
        Store::open_all(&[path.to_path_buf()])
    }

    /// Load and concatenate the entries of all `paths`, in the given order. IDs run across all
    /// files. Missing files are ignored.
    pub fn open_all(paths: &[PathBuf]) -> Result<Store> {
        let mut store = Store::new();

        for path in paths {
            let file = match File::open(path) {
                Ok(f) => f,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!("{} does not exist, nothing to load", path.display());
                    continue;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Cannot open {}", path.display()))
                }
            };

            store.extend_from(BufReader::new(file), path)?;
            tracing::debug!("{} entries after loading {}", store.len(), path.display());
        }

        Ok(store)
    }

    /// Write every entry, one per line, to `writer`.
    pub fn dump<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for entry in &self.entries {
            writeln!(writer, "{}", entry.to_line())?;
        }

        Ok(())
    }

    /// Replace the content of `path` with the store. The data is written to a temporary file
    /// next to it first and then renamed over it, so `path` never holds a partial write.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create {}", parent.display()))?;
        }

        let tmp = temp_path(path);
        let file =
            File::create(&tmp).with_context(|| format!("Cannot create {}", tmp.display()))?;

        if let Err(e) = self.write_and_replace(file, &tmp, path) {
            if let Err(rm) = fs::remove_file(&tmp) {
                tracing::debug!("cannot remove {}: {}", tmp.display(), rm);
            }
            return Err(e);
        }
        tracing::debug!("saved {} entries to {}", self.len(), path.display());

        Ok(())
    }

    fn write_and_replace(&self, file: File, tmp: &Path, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(file);
        self.dump(&mut writer)
            .with_context(|| format!("Cannot write {}", tmp.display()))?;
        let file = writer
            .into_inner()
            .with_context(|| format!("Cannot write {}", tmp.display()))?;
        file.sync_all()
            .with_context(|| format!("Cannot sync {}", tmp.display()))?;

        fs::rename(tmp, path)
            .with_context(|| format!("Cannot move {} to {}", tmp.display(), path.display()))
    }

    /// Add an entry at the end of the store.
    pub fn append(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Return a slice of the entries, in store order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lines rejected while loading.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// All running entries, in store order.
    pub fn unfinished_entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| e.is_running())
    }

    pub fn unfinished_entries_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries.iter_mut().filter(|e| e.is_running())
    }

    /// The last entry of the store.
    pub fn most_recent_entry(&self) -> Option<&Entry> {
        self.entries.last()
    }

    pub fn most_recent_entry_mut(&mut self) -> Option<&mut Entry> {
        self.entries.last_mut()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
pub(crate) fn parse_date_time(date: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(date, DATE_FORMAT).unwrap()
}

#[cfg(test)]
mod entry_tests {
    use crate::data::{parse_date_time, Entry};
    use crate::error::Error;
    use chrono::{Duration, Timelike};
    use std::collections::BTreeSet;

    fn tags(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_entry_to_line() {
        let start = parse_date_time("2014-08-22 17:10:00");

        assert_eq!(
            Entry::started_at("", start).to_line(),
            "2014-08-22 17:10:00 running: "
        );
        assert_eq!(
            Entry::started_at("foobar", start).to_line(),
            "2014-08-22 17:10:00 running: foobar"
        );
        assert_eq!(
            Entry::started_at("foobar +Uni", start)
                .with_end(parse_date_time("2014-08-22 18:00:05"))
                .to_line(),
            "2014-08-22 17:10:00 2014-08-22 18:00:05: foobar +Uni"
        );
    }

    #[test]
    fn test_entry_tags() {
        let start = parse_date_time("2014-08-22 17:10:00");

        assert_eq!(Entry::started_at("foobar +Uni", start).tags(), tags(&["uni"]));
        assert_eq!(Entry::started_at("+", start).tags(), tags(&[]));
        assert_eq!(Entry::started_at("a +X +x", start).tags(), tags(&["x"]));
        assert_eq!(
            Entry::started_at("+a\tb  +B-c +", start).tags(),
            tags(&["a", "b-c"])
        );
        assert_eq!(Entry::started_at("", start).tags(), tags(&[]));
    }

    #[test]
    fn test_entry_parse() {
        let entry: Entry = "2014-08-22 17:10:00 2014-08-22 18:10:00: write +report: part 1"
            .parse()
            .unwrap();

        assert_eq!(entry.start(), parse_date_time("2014-08-22 17:10:00"));
        assert_eq!(entry.end(), Some(parse_date_time("2014-08-22 18:10:00")));
        assert_eq!(entry.text(), "write +report: part 1");
        assert_eq!(entry.duration(), Some(Duration::hours(1)));
        assert_eq!(entry.id(), None);

        // Running entries, with and without text
        for line in [
            "2014-08-22 17:10:00 running: ",
            "2014-08-22 17:10:00 running:",
            "2014-08-22 17:10:00 running",
            "  2014-08-22   17:10:00\trunning",
        ] {
            let entry: Entry = line.parse().unwrap();
            assert!(entry.is_running(), "{line}");
            assert_eq!(entry.text(), "", "{line}");
            assert_eq!(entry.duration(), None);
        }

        // Blanks left by hand edits, CRLF line ends
        for (line, text) in [
            ("2014-08-22 17:10:00 2014-08-22 18:00:00 ", ""),
            ("2014-08-22 17:10:00 2014-08-22 18:00:00:\t ", ""),
            ("2014-08-22 17:10:00 running\r", ""),
            ("2014-08-22 17:10:00 running: \r", ""),
            ("2014-08-22 17:10:00 running: foo\r", "foo"),
            ("2014-08-22 17:10:00 running:\tfoo", "foo"),
            ("2014-08-22 17:10:00 running:  foo", " foo"),
        ] {
            let entry: Entry = line.parse().unwrap();
            assert_eq!(entry.text(), text, "{line:?}");
            assert_eq!(entry.start(), parse_date_time("2014-08-22 17:10:00"));
        }

        // Backwards entries are not rejected
        let entry: Entry = "2014-08-22 17:10:00 2014-08-22 17:00:00: oops"
            .parse()
            .unwrap();
        assert_eq!(entry.duration(), Some(Duration::minutes(-10)));
    }

    #[test]
    fn test_entry_parse_errors() {
        for line in [
            "",
            "hello world",
            "running running: nope",
            "2014-08-22 17:10:00",
            "2014-08-22 17:10:00 running:nope",
            "2014-08-22 17:10:00 running : nope",
            "2014-08-22 17:10:00 done: nope",
            "2014-13-22 17:10:00 running: bad month",
            "2014-08-22 25:10:00 running: bad hour",
            "2014-8-22 17:10:00 running: short month",
            "2014-08-22T17:10:00 running: iso",
        ] {
            assert_eq!(
                line.parse::<Entry>(),
                Err(Error::Parse(line.to_string())),
                "{line}"
            );
        }
    }

    #[test]
    fn test_entry_round_trip() {
        let start = parse_date_time("2014-08-01 09:00:00");
        let end = parse_date_time("2014-08-02 01:02:03");

        for entry in [
            Entry::started_at("", start),
            Entry::started_at("", start).with_end(end),
            Entry::started_at("  leading and trailing  ", start).with_end(end),
            Entry::started_at("a: b: c +tag", start),
            Entry::started_at("running", start).with_end(start),
            Entry::started_at("   ", start),
        ] {
            let parsed: Entry = entry.to_line().parse().unwrap();
            assert_eq!(parsed.start(), entry.start());
            assert_eq!(parsed.end(), entry.end());
            assert_eq!(parsed.text(), entry.text());
        }
    }

    #[test]
    fn test_entry_text_edit() {
        let start = parse_date_time("2014-08-01 09:00:00");

        let mut entry = Entry::started_at("one\ntwo", start);
        assert_eq!(entry.text(), "one two");

        entry.append_text("+three");
        assert_eq!(entry.text(), "one two +three");

        let mut entry = Entry::started_at("", start);
        entry.append_text("alone");
        assert_eq!(entry.text(), "alone");
    }

    #[test]
    fn test_entry_new_is_running_now() {
        let entry = Entry::new("+x");

        assert!(entry.is_running());
        assert_eq!(entry.id(), None);
        assert_eq!(entry.start().nanosecond(), 0);
    }
}
