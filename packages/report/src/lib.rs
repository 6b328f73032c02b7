#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report rendering for SoF event extractions.
//!
//! An [`Extraction`] is rendered three ways:
//!
//! - [`html::render`]: the human-readable report page
//! - [`json::to_json`]: the full extraction plus timeline statistics
//! - [`delimited::write_csv`]: one row per event for spreadsheets
//!
//! [`ReportWriter`] writes all three into the output directory under one
//! upload id.

pub mod delimited;
pub mod html;
pub mod json;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sof_events_document_models::{EventRecord, Extraction};

pub use delimited::{to_csv, write_csv};
pub use html::{Downloads, render, render_error};
pub use json::to_json;

/// Errors produced while rendering or writing reports.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rows exported to CSV: the timeline, or the summary alone when the
/// document has no dated events.
#[must_use]
pub fn export_rows(extraction: &Extraction) -> &[EventRecord] {
    if extraction.timeline.is_empty() {
        std::slice::from_ref(&extraction.summary)
    } else {
        &extraction.timeline
    }
}

/// Paths of the artifacts written for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub html: PathBuf,
    pub json: PathBuf,
    pub csv: PathBuf,
}

/// Writes report artifacts into an output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    download_base: String,
}

impl ReportWriter {
    /// Writes into `output_dir`. The HTML report links its JSON and CSV
    /// siblings by file name.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            download_base: String::new(),
        }
    }

    /// Prefixes the HTML report's download links with `base` (e.g. the
    /// URL path the output directory is served under).
    #[must_use]
    pub fn with_download_base(mut self, base: impl Into<String>) -> Self {
        self.download_base = base.into();
        self
    }

    /// Download links for the reports written under `id`.
    #[must_use]
    pub fn downloads(&self, id: &str) -> Downloads {
        Downloads::for_upload(&self.download_base, id)
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes `<id>.html`, `<id>.json` and `<id>.csv` for `extraction`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails or a file cannot be written.
    pub fn write_all(
        &self,
        id: &str,
        extraction: &Extraction,
        generated_at: DateTime<Utc>,
    ) -> Result<ReportPaths, ReportError> {
        let paths = ReportPaths {
            html: self.output_dir.join(format!("{id}.html")),
            json: self.output_dir.join(format!("{id}.json")),
            csv: self.output_dir.join(format!("{id}.csv")),
        };

        std::fs::write(&paths.html, render(extraction, Some(&self.downloads(id))))?;
        std::fs::write(&paths.json, to_json(extraction, generated_at)?)?;
        write_csv(
            std::io::BufWriter::new(std::fs::File::create(&paths.csv)?),
            export_rows(extraction),
        )?;

        log::debug!(
            "Wrote reports for {id} to {}",
            self.output_dir.display()
        );

        Ok(paths)
    }
}
