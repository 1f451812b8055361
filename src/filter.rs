use crate::data::Entry;
use crate::error::Error;
use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate};
use regex::Regex;
use std::collections::BTreeSet;

/// A predicate over entries. Filters are built from command line tokens and chained by a
/// [`Pipeline`].
pub trait Filter {
    /// Return true if `entry` passes the filter.
    fn matches(&self, entry: &Entry) -> bool;

    /// Keep the entries passing the filter, in order.
    fn apply<'a>(&self, entries: Vec<&'a Entry>) -> Vec<&'a Entry> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

/// Return true if the start or the end day of `entry` satisfies `pred`.
fn touches(entry: &Entry, pred: impl Fn(NaiveDate) -> bool) -> bool {
    pred(entry.start().date()) || entry.end().map_or(false, |end| pred(end.date()))
}

/// Parse a `YYYY-M-D` day. Month and day may omit the leading zero.
fn parse_day(s: &str) -> Result<NaiveDate, Error> {
    let invalid = || Error::InvalidDate(s.to_string());
    let mut parts = s.split('-').map(|p| p.parse::<u32>().map_err(|_| invalid()));

    let (year, month, day) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(y), Some(m), Some(d), None) => (y?, m?, d?),
        _ => return Err(invalid()),
    };

    i32::try_from(year)
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
        .ok_or_else(invalid)
}

fn last_day_of_month(first: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };

    NaiveDate::from_ymd_opt(year, month, 1)?.pred_opt()
}

/// Keeps entries carrying all the requested tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagFilter {
    tags: BTreeSet<String>,
}

impl TagFilter {
    /// Consume the `+tag` tokens of `args` and return the filter along with the other tokens.
    pub fn build(args: Vec<String>) -> (TagFilter, Vec<String>) {
        let mut tags = BTreeSet::new();
        let mut remaining = vec![];

        for arg in args {
            match arg.strip_prefix('+') {
                Some(tag) if !tag.is_empty() => {
                    tags.insert(tag.to_lowercase());
                }
                _ => remaining.push(arg),
            }
        }

        (TagFilter { tags }, remaining)
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }
}

impl Filter for TagFilter {
    fn matches(&self, entry: &Entry) -> bool {
        self.tags.is_empty() || self.tags.is_subset(&entry.tags())
    }
}

/// Keeps entries started or finished on one of the requested days.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DateFilter {
    dates: BTreeSet<NaiveDate>,
}

impl DateFilter {
    /// Consume `@today`, `@yesterday` and `@YYYY-M-D` tokens of `args`.
    ///
    /// A token shaped like a date which is not a valid day fails with [`Error::InvalidDate`].
    pub fn build(args: Vec<String>, today: NaiveDate) -> Result<(DateFilter, Vec<String>)> {
        let is_date = Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}$")?;
        let mut dates = BTreeSet::new();
        let mut remaining = vec![];

        for arg in args {
            match arg.strip_prefix('@') {
                Some("today") => {
                    dates.insert(today);
                }
                Some("yesterday") => {
                    dates.insert(today - Duration::days(1));
                }
                Some(day) if is_date.is_match(day) => {
                    dates.insert(parse_day(day)?);
                }
                _ => remaining.push(arg),
            }
        }

        Ok((DateFilter { dates }, remaining))
    }

    pub fn dates(&self) -> &BTreeSet<NaiveDate> {
        &self.dates
    }
}

impl Filter for DateFilter {
    fn matches(&self, entry: &Entry) -> bool {
        self.dates.is_empty() || touches(entry, |day| self.dates.contains(&day))
    }
}

/// An inclusive range of days.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Timeframe {
    first_day: NaiveDate,
    last_day: NaiveDate,
}

impl Timeframe {
    pub fn new(first_day: NaiveDate, last_day: NaiveDate) -> Timeframe {
        Timeframe {
            first_day,
            last_day,
        }
    }

    /// Monday to Sunday of the week containing `day`.
    pub fn week(day: NaiveDate) -> Timeframe {
        let monday = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
        Timeframe::new(monday, monday + Duration::days(6))
    }

    /// The calendar month `month` of `year`.
    pub fn month(year: i32, month: u32) -> Option<Timeframe> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(Timeframe::new(first, last_day_of_month(first)?))
    }

    /// The calendar year `year`.
    pub fn year(year: i32) -> Option<Timeframe> {
        Some(Timeframe::new(
            NaiveDate::from_ymd_opt(year, 1, 1)?,
            NaiveDate::from_ymd_opt(year, 12, 31)?,
        ))
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    pub fn last_day(&self) -> NaiveDate {
        self.last_day
    }

    /// Return true if `day` lies within the timeframe, bounds included.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.first_day <= day && day <= self.last_day
    }
}

/*
Timeframes accepted on the command line:
  @week              Monday to Sunday of the current week
  @month             the current month
  @year              the current year
  @YYYY              a whole year
  @YYYY-M            a whole month
  @YYYY-M-D..YYYY-M-D an explicit range, both days included
 */
struct TimeframeSyntax {
    year: Regex,
    month: Regex,
    range: Regex,
}

impl TimeframeSyntax {
    fn new() -> Result<TimeframeSyntax> {
        Ok(TimeframeSyntax {
            year: Regex::new(r"^\d{4}$")?,
            month: Regex::new(r"^(\d{4})-(\d{1,2})$")?,
            range: Regex::new(r"^(\d{4}-\d{1,2}-\d{1,2})\.\.(\d{4}-\d{1,2}-\d{1,2})$")?,
        })
    }

    /// Return the timeframe described by `spec` (a token without its `@`), None if `spec` is not
    /// a timeframe at all.
    fn parse(&self, spec: &str, today: NaiveDate) -> Result<Option<Timeframe>, Error> {
        let invalid = || Error::InvalidDate(spec.to_string());

        let timeframe = match spec {
            "week" => Timeframe::week(today),
            "month" => Timeframe::month(today.year(), today.month()).ok_or_else(invalid)?,
            "year" => Timeframe::year(today.year()).ok_or_else(invalid)?,
            _ if self.year.is_match(spec) => spec
                .parse()
                .ok()
                .and_then(Timeframe::year)
                .ok_or_else(invalid)?,
            _ => {
                if let Some(caps) = self.month.captures(spec) {
                    let year = caps[1].parse().map_err(|_| invalid())?;
                    let month = caps[2].parse().map_err(|_| invalid())?;
                    Timeframe::month(year, month).ok_or_else(invalid)?
                } else if let Some(caps) = self.range.captures(spec) {
                    Timeframe::new(parse_day(&caps[1])?, parse_day(&caps[2])?)
                } else {
                    return Ok(None);
                }
            }
        };

        Ok(Some(timeframe))
    }
}

/// Keeps entries started or finished within one of the requested timeframes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimeframeFilter {
    timeframes: Vec<Timeframe>,
}

impl TimeframeFilter {
    /// Consume the timeframe tokens of `args`. Malformed days fail with [`Error::InvalidDate`].
    pub fn build(args: Vec<String>, today: NaiveDate) -> Result<(TimeframeFilter, Vec<String>)> {
        let syntax = TimeframeSyntax::new()?;
        let mut timeframes = vec![];
        let mut remaining = vec![];

        for arg in args {
            let parsed = match arg.strip_prefix('@') {
                Some(spec) => syntax.parse(spec, today)?,
                None => None,
            };

            match parsed {
                Some(t) => timeframes.push(t),
                None => remaining.push(arg),
            }
        }

        Ok((TimeframeFilter { timeframes }, remaining))
    }

    pub fn timeframes(&self) -> &[Timeframe] {
        &self.timeframes
    }
}

impl Filter for TimeframeFilter {
    fn matches(&self, entry: &Entry) -> bool {
        self.timeframes.is_empty()
            || self
                .timeframes
                .iter()
                .any(|t| touches(entry, |day| t.contains(day)))
    }
}

/// Tag, date and timeframe filters applied one after the other: an entry is kept only if every
/// filter accepts it.
pub struct Pipeline {
    filters: Vec<Box<dyn Filter>>,
    unrecognized: Vec<String>,
}

impl Pipeline {
    /// Build all filters from `args`, relative to the day `today`. Tokens none of the filters
    /// understand are kept aside, see [`Pipeline::unrecognized`].
    pub fn parse(args: &[String], today: NaiveDate) -> Result<Pipeline> {
        let (tags, args) = TagFilter::build(args.to_vec());
        let (dates, args) = DateFilter::build(args, today)?;
        let (timeframes, args) = TimeframeFilter::build(args, today)?;

        Ok(Pipeline {
            filters: vec![Box::new(tags), Box::new(dates), Box::new(timeframes)],
            unrecognized: args,
        })
    }

    /// Tokens left over after every filter took its own.
    pub fn unrecognized(&self) -> &[String] {
        &self.unrecognized
    }

    /// Return the entries passing all the filters, in order.
    pub fn apply<'a>(&self, entries: &'a [Entry]) -> Vec<&'a Entry> {
        self.filters
            .iter()
            .fold(entries.iter().collect::<Vec<_>>(), |kept, f| f.apply(kept))
    }
}
