//! JSON report document.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sof_events_document_models::{DocumentFormat, EventRecord, Extraction, VoyageMetadata};

use crate::ReportError;

/// Serialized shape of a JSON report.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub filename: &'a str,
    pub format: DocumentFormat,
    pub summary: &'a EventRecord,
    pub metadata: &'a VoyageMetadata,
    pub timeline: &'a [EventRecord],
    pub stats: ReportStats<'a>,
    pub raw_text: &'a str,
}

/// Aggregate counts over the timeline.
#[derive(Debug, Serialize)]
pub struct ReportStats<'a> {
    pub total_events: usize,
    pub event_types: Vec<&'a str>,
    pub extraction_date: String,
}

impl<'a> JsonReport<'a> {
    #[must_use]
    pub fn new(extraction: &'a Extraction, generated_at: DateTime<Utc>) -> Self {
        Self {
            filename: &extraction.filename,
            format: extraction.format,
            summary: &extraction.summary,
            metadata: &extraction.metadata,
            timeline: &extraction.timeline,
            stats: ReportStats {
                total_events: extraction.timeline.len(),
                event_types: extraction.event_types(),
                extraction_date: generated_at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            },
            raw_text: &extraction.text,
        }
    }
}

/// Renders `extraction` as a pretty-printed JSON report.
///
/// # Errors
///
/// Returns [`ReportError::Json`] if serialization fails.
pub fn to_json(extraction: &Extraction, generated_at: DateTime<Utc>) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(&JsonReport::new(
        extraction,
        generated_at,
    ))?)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use sof_events_document_models::EventField;

    use super::*;

    #[test]
    fn includes_stats_metadata_and_text() {
        let summary = EventRecord::from_pairs([(EventField::Vessel, "MV Example".into())]);
        let row = EventRecord::from_pairs([(EventField::Operation, "BERTHED".into())]);
        let extraction = Extraction {
            filename: "sof.txt".to_owned(),
            format: DocumentFormat::Text,
            summary,
            metadata: VoyageMetadata {
                voyage_from: "SINGAPORE".into(),
                voyage_to: sof_events_document_models::FieldValue::Absent,
            },
            timeline: vec![row.clone(), row],
            text: "Vessel: MV Example\n".to_owned(),
        };
        let at = Utc.with_ymd_and_hms(2024, 1, 5, 14, 30, 0).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&to_json(&extraction, at).unwrap()).unwrap();

        assert_eq!(json["filename"], "sof.txt");
        assert_eq!(json["format"], "text");
        assert_eq!(json["summary"]["vessel"], "MV Example");
        assert!(json["summary"]["port"].is_null());
        assert_eq!(json["timeline"].as_array().unwrap().len(), 2);
        assert_eq!(json["stats"]["total_events"], 2);
        assert_eq!(json["stats"]["event_types"], serde_json::json!(["BERTHED"]));
        assert_eq!(json["stats"]["extraction_date"], "2024-01-05T14:30:00Z");
        assert_eq!(json["metadata"]["voyage_from"], "SINGAPORE");
        assert!(json["metadata"]["voyage_to"].is_null());
        assert_eq!(json["raw_text"], "Vessel: MV Example\n");
    }
}
