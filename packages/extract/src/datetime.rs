//! Date and time parsing for Statement of Facts timestamps.
//!
//! SoF documents write timestamps as a day/month pair ("5th NOV") and a
//! separate clock time ("0700" or "07:00"), usually without a year. The
//! year is taken from the first four-digit `20xx` year found anywhere in
//! the document.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

const MONTHS: [(&str, u32); 12] = [
    ("JAN", 1),
    ("FEB", 2),
    ("MAR", 3),
    ("APR", 4),
    ("MAY", 5),
    ("JUN", 6),
    ("JUL", 7),
    ("AUG", 8),
    ("SEP", 9),
    ("OCT", 10),
    ("NOV", 11),
    ("DEC", 12),
];

static DAY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{1,2}").expect("valid regex"));

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").expect("valid regex"));

/// Returns the first `20xx` year mentioned in `text`.
#[must_use]
pub fn reference_year(text: &str) -> Option<i32> {
    YEAR_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parses a clock time written as `HH:MM` or `HHMM`.
///
/// Returns `None` for any other shape or an out-of-range hour/minute.
#[must_use]
pub fn parse_clock(time: &str) -> Option<(u32, u32)> {
    let time = time.replace('@', "");
    let time = time.trim();

    let (hours, minutes) = if let Some((h, m)) = time.split_once(':') {
        (h.trim().parse().ok()?, m.trim().parse().ok()?)
    } else if time.len() == 4 && time.bytes().all(|b| b.is_ascii_digit()) {
        (time[..2].parse().ok()?, time[2..].parse().ok()?)
    } else {
        return None;
    };

    (hours <= 23 && minutes <= 59).then_some((hours, minutes))
}

/// Combines a day/month string, an optional clock time, and a year.
///
/// The day is the first one- or two-digit run in `date`; the month is the
/// first three-letter abbreviation it contains. A missing time means
/// midnight. Impossible dates (e.g. 31 FEB) yield `None`.
#[must_use]
pub fn parse_date_time(date: &str, time: Option<&str>, year: i32) -> Option<NaiveDateTime> {
    let upper = date.to_uppercase();

    let day: u32 = DAY_RE.find(&upper)?.as_str().parse().ok()?;
    let month = MONTHS
        .iter()
        .find(|(name, _)| upper.contains(name))
        .map(|&(_, number)| number)?;

    let (hours, minutes) = match time {
        Some(time) => parse_clock(time)?,
        None => (0, 0),
    };

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hours, minutes, 0)
}

/// Formats a timestamp as ISO-8601 without fractional seconds.
#[must_use]
pub fn format_iso(datetime: NaiveDateTime) -> String {
    datetime.format("%Y-%m-%dT%H:%M:%S").to_string()
}
