//! The synchronous upload pipeline.
//!
//! stage upload → convert to text → extract → render reports
//!
//! Runs to completion for one upload before returning. Handlers call it
//! through `web::block` so parsing never stalls the async workers.

use std::path::PathBuf;
use std::time::Duration;

use sof_events_document_models::Extraction;
use sof_events_extract::{ExtractError, Extractor, RuleSet};
use sof_events_intake::{Staging, UploadId};
use sof_events_report::{Downloads, ReportPaths, ReportWriter};

use crate::OUTPUTS_PATH;
use crate::config::ServerConfig;
use crate::error::ApiError;

/// Everything produced for one processed upload.
#[derive(Debug, Clone)]
pub struct Processed {
    pub id: UploadId,
    pub extraction: Extraction,
    pub paths: ReportPaths,
}

/// Upload processing shared by all request handlers.
#[derive(Debug, Clone)]
pub struct Pipeline {
    staging: Staging,
    extractor: Extractor,
    reports: ReportWriter,
    retention: Duration,
}

impl Pipeline {
    /// Builds the pipeline described by `config`, loading a custom rule
    /// table if one is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the custom rule table cannot be loaded.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ExtractError> {
        let rules = match &config.rules_path {
            Some(path) => RuleSet::from_file(path)?,
            None => RuleSet::builtin(),
        };
        Ok(Self::new(
            Staging::new(config.staging()),
            Extractor::new(rules),
            config.retention,
        ))
    }

    #[must_use]
    pub fn new(staging: Staging, extractor: Extractor, retention: Duration) -> Self {
        let reports = ReportWriter::new(staging.config().output_dir.clone())
            .with_download_base(format!("{OUTPUTS_PATH}/"));
        Self {
            staging,
            extractor,
            reports,
            retention,
        }
    }

    #[must_use]
    pub const fn staging(&self) -> &Staging {
        &self.staging
    }

    /// Processes one uploaded file end to end.
    ///
    /// Expired files are purged first. The raw upload is staged under a
    /// fresh [`UploadId`] and removed again whatever the outcome. The
    /// converted text is kept only for documents that extract, and stays
    /// with the rendered reports until they expire.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be converted, contains no text,
    /// or a staged file or report cannot be written.
    pub fn process(&self, filename: &str, bytes: &[u8]) -> Result<Processed, ApiError> {
        self.purge();

        let id = UploadId::generate();
        log::info!("Processing upload {id} ({filename}, {} bytes)", bytes.len());

        let staged = self.staging.stage_upload(&id, filename, bytes).map_err(|e| {
            ApiError::Internal(format!("failed to stage upload {id}: {e}"))
        })?;
        let document = sof_events_intake::extract_text(filename, bytes);
        self.staging.discard(&staged);
        let document = document?;

        let extraction = self.extractor.extract(&document)?;

        self.staging
            .write_processed(&id, document.text())
            .map_err(|e| ApiError::Internal(format!("failed to store text for {id}: {e}")))?;
        let paths = self
            .reports
            .write_all(id.as_str(), &extraction, chrono::Utc::now())?;

        log::info!(
            "Upload {id}: {} timeline events, reports in {}",
            extraction.timeline.len(),
            self.reports.output_dir().display()
        );

        Ok(Processed {
            id,
            extraction,
            paths,
        })
    }

    /// Download links for the JSON and CSV reports of `id`.
    #[must_use]
    pub fn downloads(&self, id: &UploadId) -> Downloads {
        self.reports.downloads(id.as_str())
    }

    /// Location of the stored HTML report for `id`, if one exists.
    #[must_use]
    pub fn html_report(&self, id: &UploadId) -> Option<PathBuf> {
        let path = self.staging.output_path(id, "html");
        path.is_file().then_some(path)
    }

    fn purge(&self) {
        match self.staging.purge_expired(self.retention) {
            Ok(0) => {}
            Ok(n) => log::info!("Purged {n} expired file(s)"),
            Err(e) => log::warn!("Failed to purge expired files: {e}"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use sof_events_document_models::EventField;
    use sof_events_intake::StagingConfig;

    use super::*;

    pub fn temp_pipeline() -> (PathBuf, Pipeline) {
        let base = std::env::temp_dir().join(format!(
            "sof_events_server_{}",
            uuid::Uuid::new_v4().simple()
        ));
        let staging = Staging::new(StagingConfig::under(&base));
        staging.ensure_dirs().unwrap();
        let pipeline = Pipeline::new(
            staging,
            Extractor::builtin().with_fallback_year(2023),
            Duration::from_secs(3600),
        );
        (base, pipeline)
    }

    fn file_count(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn processes_text_upload() {
        let (base, pipeline) = temp_pipeline();
        let config = pipeline.staging().config().clone();

        let processed = pipeline
            .process("sof.txt", b"Vessel: MV Example\nPort: Singapore\n")
            .unwrap();

        assert_eq!(
            processed.extraction.summary.get(EventField::Vessel).as_found(),
            Some("MV Example")
        );
        assert!(processed.paths.html.is_file());
        assert!(processed.paths.json.is_file());
        assert!(processed.paths.csv.is_file());
        assert_eq!(pipeline.html_report(&processed.id), Some(processed.paths.html.clone()));
        assert!(std::fs::read_to_string(&processed.paths.html)
            .unwrap()
            .contains(&format!("href=\"/outputs/{}.json\"", processed.id)));
        assert_eq!(file_count(&config.intake_dir), 0);
        assert_eq!(file_count(&config.processed_dir), 1);

        std::fs::remove_dir_all(base).unwrap();
    }

    #[test]
    fn failed_upload_leaves_no_staged_file() {
        let (base, pipeline) = temp_pipeline();
        let config = pipeline.staging().config().clone();

        let err = pipeline.process("blank.txt", b"   \n").unwrap_err();
        assert!(matches!(err, ApiError::Extract(ExtractError::EmptyDocument)));

        let err = pipeline.process("photo.png", b"\x89PNG").unwrap_err();
        assert!(matches!(err, ApiError::Intake(_)));

        assert_eq!(file_count(&config.intake_dir), 0);
        assert_eq!(file_count(&config.processed_dir), 0);
        assert_eq!(file_count(&config.output_dir), 0);

        std::fs::remove_dir_all(base).unwrap();
    }

    #[test]
    fn unknown_report_is_none() {
        let (base, pipeline) = temp_pipeline();
        let id = UploadId::parse("sof_missing").unwrap();
        assert_eq!(pipeline.html_report(&id), None);
        std::fs::remove_dir_all(base).unwrap();
    }
}
