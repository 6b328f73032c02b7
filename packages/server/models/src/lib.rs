#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the SoF event extractor server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the extraction types so the API contract can evolve on its own.

use serde::{Deserialize, Serialize};
use sof_events_document_models::{DocumentFormat, EventRecord, VoyageMetadata};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Download locations of the reports written for an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLinks {
    /// HTML report page.
    pub html: String,
    /// JSON report.
    pub json: String,
    /// CSV export.
    pub csv: String,
}

/// Response to a successful `POST /api/upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Identifier assigned to the upload.
    pub id: String,
    /// Sanitized name of the uploaded file.
    pub filename: String,
    /// Detected source format.
    pub format: DocumentFormat,
    /// Number of timeline events found.
    pub events_count: usize,
    /// Document-level field values (`null` for fields not found).
    pub summary: EventRecord,
    /// Ports of loading and discharge (`null` when not found).
    pub metadata: VoyageMetadata,
    /// Where the rendered reports can be fetched.
    pub links: ReportLinks,
}

/// JSON body returned with every error status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable description of the failure.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use sof_events_document_models::EventField;

    use super::*;

    #[test]
    fn upload_response_uses_camel_case() {
        let response = UploadResponse {
            id: "sof_1".to_owned(),
            filename: "sof.txt".to_owned(),
            format: DocumentFormat::Text,
            events_count: 3,
            summary: EventRecord::from_pairs([(EventField::Port, "Singapore".into())]),
            metadata: VoyageMetadata {
                voyage_from: "Singapore".into(),
                voyage_to: "Rotterdam".into(),
            },
            links: ReportLinks {
                html: "/results/sof_1".to_owned(),
                json: "/outputs/sof_1.json".to_owned(),
                csv: "/outputs/sof_1.csv".to_owned(),
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["eventsCount"], 3);
        assert_eq!(json["summary"]["port"], "Singapore");
        assert!(json["summary"]["vessel"].is_null());
        assert_eq!(json["links"]["csv"], "/outputs/sof_1.csv");
        assert_eq!(json["metadata"]["voyage_to"], "Rotterdam");
    }
}
