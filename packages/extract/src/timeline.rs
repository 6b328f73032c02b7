//! Timeline extraction: the dated event rows of a Statement of Facts.
//!
//! Two passes run over normalized text:
//!
//! - **Numbered events** such as `6. Loading commenced: 5th NOV 0700`,
//!   classified by their description.
//! - **Context events**: any `<day> <month> <time>` occurrence whose
//!   surrounding text mentions a known port-call anchor (arrival,
//!   anchoring, berthing, ...).
//!
//! A year written between the date and the clock (`5th NOV 2023 0700`)
//! overrides the document year for that row.
//!
//! Results are de-duplicated on `(kind, start)` and sorted by start time,
//! undated rows last.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::{Match, Regex, RegexBuilder};
use sof_events_document_models::{EventField, EventRecord, FieldValue};

use crate::datetime::{format_iso, parse_date_time};

/// Characters of context taken on each side of a date/time occurrence.
const CONTEXT_RADIUS: usize = 50;

/// Kinds of timeline events the extractor recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    LoadingCommenced,
    LoadingCompleted,
    DischargingCommenced,
    DischargingCompleted,
    VesselSailed,
    VesselArrived,
    VesselAnchored,
    Berthed,
    Quarantine,
    Immigration,
    NoticeOfReadiness,
    CargoDocumentOnBoard,
}

impl EventKind {
    /// Label written to the record's `operation` field.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LoadingCommenced => "LOADING COMMENCED",
            Self::LoadingCompleted => "LOADING COMPLETED",
            Self::DischargingCommenced => "DISCHARGING COMMENCED",
            Self::DischargingCompleted => "DISCHARGING COMPLETED",
            Self::VesselSailed => "VESSEL SAILED",
            Self::VesselArrived => "VESSEL ARRIVED",
            Self::VesselAnchored => "VESSEL ANCHORED",
            Self::Berthed => "BERTHED",
            Self::Quarantine => "QUARANTINE",
            Self::Immigration => "IMMIGRATION",
            Self::NoticeOfReadiness => "NOTICE OF READINESS",
            Self::CargoDocumentOnBoard => "CARGO DOCUMENT ON BOARD",
        }
    }
}

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("valid regex")
}

/// Classifier for numbered event descriptions, tried in order.
static NUMBERED_KINDS: LazyLock<Vec<(Regex, EventKind)>> = LazyLock::new(|| {
    vec![
        (ci(r"loading\s+commenced"), EventKind::LoadingCommenced),
        (ci(r"loading\s+completed"), EventKind::LoadingCompleted),
        (ci(r"discharging\s+commenced"), EventKind::DischargingCommenced),
        (ci(r"discharging\s+completed"), EventKind::DischargingCompleted),
        (ci(r"vessel\s+sailed"), EventKind::VesselSailed),
        (ci(r"vessel\s+arrived"), EventKind::VesselArrived),
        (ci(r"vessel\s+anchor"), EventKind::VesselAnchored),
        (ci(r"\bberth\b"), EventKind::Berthed),
        (ci(r"\bquarantine\b"), EventKind::Quarantine),
        (ci(r"\bimmigration\b"), EventKind::Immigration),
        (ci(r"notice\s+of\s+readiness"), EventKind::NoticeOfReadiness),
        (ci(r"cargo\s+document"), EventKind::CargoDocumentOnBoard),
    ]
});

/// Anchors that give meaning to an otherwise unlabeled timestamp.
static CONTEXT_KINDS: LazyLock<Vec<(Regex, EventKind)>> = LazyLock::new(|| {
    vec![
        (ci(r"vessel\s+arrive"), EventKind::VesselArrived),
        (ci(r"vessel\s+anchor"), EventKind::VesselAnchored),
        (ci(r"berth"), EventKind::Berthed),
        (ci(r"quarantine"), EventKind::Quarantine),
        (ci(r"immigration"), EventKind::Immigration),
        (ci(r"notice\s+of\s+readiness"), EventKind::NoticeOfReadiness),
    ]
});

static NUMBERED_EVENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    ci(concat!(
        r"(?P<number>\d+)\.\s*(?P<text>[A-Za-z\s]+)[:\-]?\s*",
        r"(?P<date>\d{1,2}(?:st|nd|rd|th)?\s*(?:JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC)[a-z]*)",
        r"(?:\s*(?P<year>(?:19|20)\d{2})\b)?",
        r"\s*@?\s*(?P<time>\d{1,2}:\d{2}|\d{3,4})?",
    ))
});

static DATE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    ci(concat!(
        r"(?P<day>\d{1,2}(?:st|nd|rd|th)?)\s*",
        r"(?P<month>JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC)\s*",
        r"(?:(?P<year>(?:19|20)\d{2})\s+)?",
        r"@?\s*(?P<time>\d{1,2}:\d{2}|\d{3,4})",
    ))
});

/// One dated (or undated) row of the Statement of Facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEvent {
    /// What happened.
    pub kind: EventKind,
    /// When it happened, if the date and time parsed.
    pub start: Option<NaiveDateTime>,
    /// Source snippet the event was read from.
    pub remarks: String,
}

impl TimelineEvent {
    /// Converts this event into a record, inheriting vessel and port from
    /// the document summary.
    #[must_use]
    pub fn into_record(self, summary: &EventRecord) -> EventRecord {
        let stamp: FieldValue = self.start.map(format_iso).into();
        let remarks = if self.remarks.is_empty() {
            FieldValue::Absent
        } else {
            FieldValue::Found(self.remarks)
        };

        EventRecord::from_pairs([
            (EventField::Vessel, summary.get(EventField::Vessel).clone()),
            (EventField::Port, summary.get(EventField::Port).clone()),
            (EventField::Operation, self.kind.label().into()),
            (EventField::Start, stamp.clone()),
            (EventField::End, stamp),
            (EventField::Remarks, remarks),
        ])
    }
}

fn classify(text: &str, table: &[(Regex, EventKind)]) -> Option<EventKind> {
    table
        .iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|&(_, kind)| kind)
}

/// Resolves the year and clock time of one occurrence.
///
/// A four-digit number after the date is ambiguous: `2023` may be a year
/// or 20:23. It is read as the year when a clock time follows it or when
/// it equals the document year, and as the clock time otherwise.
fn year_and_time<'t>(
    year_cap: Option<Match<'t>>,
    time_cap: Option<Match<'t>>,
    year: i32,
) -> (i32, Option<&'t str>) {
    match (year_cap, time_cap) {
        (Some(y), Some(t)) => (parse_year(y).unwrap_or(year), Some(t.as_str())),
        (Some(y), None) if parse_year(y) == Some(year) => (year, None),
        (Some(y), None) => (year, Some(y.as_str())),
        (None, Some(t)) if t.as_str().len() == 4 && parse_year(t) == Some(year) => (year, None),
        (None, time) => (year, time.as_ref().map(Match::as_str)),
    }
}

fn parse_year(m: Match<'_>) -> Option<i32> {
    m.as_str().parse().ok()
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

fn numbered_events(text: &str, year: i32) -> Vec<TimelineEvent> {
    NUMBERED_EVENT_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let number = caps.name("number")?.as_str();
            let description = caps.name("text")?.as_str().trim().to_lowercase();
            let kind = classify(&description, &NUMBERED_KINDS)?;

            let (event_year, time) = year_and_time(caps.name("year"), caps.name("time"), year);
            let start = match (caps.name("date"), time) {
                (Some(date), Some(time)) => parse_date_time(date.as_str(), Some(time), event_year),
                _ => None,
            };

            Some(TimelineEvent {
                kind,
                start,
                remarks: format!("{number}. {description}"),
            })
        })
        .collect()
}

fn context_events(text: &str, year: i32) -> Vec<TimelineEvent> {
    DATE_TIME_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let date = format!("{} {}", caps.name("day")?.as_str(), caps.name("month")?.as_str());
            let (event_year, time) = year_and_time(caps.name("year"), caps.name("time"), year);
            let start = parse_date_time(&date, Some(time?), event_year)?;

            let from = floor_char_boundary(text, whole.start().saturating_sub(CONTEXT_RADIUS));
            let to = ceil_char_boundary(text, (whole.end() + CONTEXT_RADIUS).min(text.len()));
            let context = &text[from..to];

            let kind = classify(context, &CONTEXT_KINDS)?;

            Some(TimelineEvent {
                kind,
                start: Some(start),
                remarks: context.trim().to_owned(),
            })
        })
        .collect()
}

/// Extracts the ordered timeline from normalized text.
///
/// `year` supplies the year for day/month timestamps.
#[must_use]
pub fn extract_timeline(text: &str, year: i32) -> Vec<TimelineEvent> {
    let mut events = numbered_events(text, year);
    let numbered = events.len();
    events.extend(context_events(text, year));

    log::debug!(
        "Timeline candidates: {numbered} numbered, {} context",
        events.len() - numbered
    );

    let mut seen = BTreeSet::new();
    events.retain(|event| seen.insert((event.kind, event.start)));

    events.sort_by_key(|event| (event.start.is_none(), event.start));
    events
}
