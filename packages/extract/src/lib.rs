#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Event field extraction for Statement of Facts (SoF) documents.
//!
//! Turns the plain text of a [`RawDocument`] into an [`Extraction`]:
//!
//! - a **summary** [`EventRecord`] built from the declarative field
//!   [`RuleSet`] (vessel, port, operation, start, end, remarks),
//! - the voyage's ports of loading and discharge, and
//! - a **timeline** of dated event rows read from the numbered SoF entries
//!   and from timestamps near known port-call anchors.
//!
//! Extraction is a pure function of the input text. A field that no rule
//! matches is recorded as [`FieldValue::Absent`](sof_events_document_models::FieldValue::Absent);
//! the only failure is a document with no text at all.

pub mod datetime;
pub mod normalize;
pub mod rules;
pub mod timeline;

use chrono::Datelike as _;
use sof_events_document_models::{EventRecord, Extraction, RawDocument, VoyageMetadata};

pub use rules::{Matcher, MatcherDef, RuleSet};

/// Errors produced while loading rules or extracting a document.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The document had no text after format conversion.
    #[error("document contains no extractable text")]
    EmptyDocument,

    /// A rule pattern failed to compile.
    #[error("invalid pattern for field '{field}': {source}")]
    InvalidPattern {
        /// Field the pattern belongs to.
        field: String,
        /// Underlying regex error.
        source: regex::Error,
    },

    /// The rule table could not be parsed.
    #[error("invalid rule table: {0}")]
    RuleTable(String),

    /// A rule file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Applies a [`RuleSet`] and the timeline passes to documents.
#[derive(Debug, Clone)]
pub struct Extractor {
    rules: RuleSet,
    fallback_year: i32,
}

impl Extractor {
    /// Creates an extractor using `rules`. Timestamps in documents that
    /// never mention a year are placed in the current (UTC) year.
    #[must_use]
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            fallback_year: chrono::Utc::now().year(),
        }
    }

    /// Creates an extractor using the built-in rule table.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(RuleSet::builtin())
    }

    /// Overrides the year used when a document mentions none.
    #[must_use]
    pub const fn with_fallback_year(mut self, year: i32) -> Self {
        self.fallback_year = year;
        self
    }

    /// The rule table in use.
    #[must_use]
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Applies the field rules to `text`, producing the summary record.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::EmptyDocument`] if `text` is blank.
    pub fn extract_record(&self, text: &str) -> Result<EventRecord, ExtractError> {
        if text.trim().is_empty() {
            return Err(ExtractError::EmptyDocument);
        }
        Ok(self.rules.apply(&unify_line_endings(text)))
    }

    /// Resolves the voyage ports of loading and discharge from `text`.
    #[must_use]
    pub fn extract_metadata(&self, text: &str) -> VoyageMetadata {
        self.rules.apply_metadata(&unify_line_endings(text))
    }

    /// Extracts the summary record and timeline from `document`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::EmptyDocument`] if the document text is
    /// blank. No partial result is produced in that case.
    pub fn extract(&self, document: &RawDocument) -> Result<Extraction, ExtractError> {
        if document.is_blank() {
            log::warn!("{}: no extractable text", document.filename());
            return Err(ExtractError::EmptyDocument);
        }

        let summary = self.extract_record(document.text())?;
        let metadata = self.extract_metadata(document.text());

        let normalized = normalize::normalize_text(document.text());
        let year = datetime::reference_year(&normalized).unwrap_or(self.fallback_year);
        let timeline: Vec<EventRecord> = timeline::extract_timeline(&normalized, year)
            .into_iter()
            .map(|event| event.into_record(&summary))
            .collect();

        let found = summary.iter().filter(|(_, v)| !v.is_absent()).count();
        log::info!(
            "{}: {found}/{} summary fields, {} timeline events",
            document.filename(),
            sof_events_document_models::EventField::all().len(),
            timeline.len()
        );

        Ok(Extraction {
            filename: document.filename().to_owned(),
            format: document.format(),
            summary,
            metadata,
            timeline,
            text: document.text().to_owned(),
        })
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Extracts `document` with the built-in rules.
///
/// # Errors
///
/// Returns [`ExtractError::EmptyDocument`] if the document text is blank.
pub fn extract(document: &RawDocument) -> Result<Extraction, ExtractError> {
    Extractor::builtin().extract(document)
}

fn unify_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
