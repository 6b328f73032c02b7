#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Document and event record types for the SoF event extractor.
//!
//! This crate defines the shapes that flow through the whole pipeline:
//! the [`RawDocument`] produced by intake, the fixed [`EventField`] key set,
//! and the [`EventRecord`] / [`Extraction`] values produced by the extractor
//! and consumed by the report renderer.
//!
//! Every [`EventRecord`] carries every [`EventField`] key. Fields that the
//! extractor could not locate hold [`FieldValue::Absent`] rather than being
//! left out of the mapping.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Placeholder rendered in place of a field the extractor did not find.
pub const ABSENT_SENTINEL: &str = "N/A";

/// Source format of an uploaded document.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DocumentFormat {
    /// Portable Document Format with a text layer.
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
    /// Plain UTF-8 text.
    Text,
}

/// Plain text extracted from an uploaded file, plus its source metadata.
///
/// Created once per upload and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    filename: String,
    format: DocumentFormat,
    text: String,
}

impl RawDocument {
    /// Creates a new document from converted text.
    #[must_use]
    pub fn new(filename: impl Into<String>, format: DocumentFormat, text: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            format,
            text: text.into(),
        }
    }

    /// Original filename of the upload.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Detected source format.
    #[must_use]
    pub const fn format(&self) -> DocumentFormat {
        self.format
    }

    /// Extracted plain text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns `true` if the text contains nothing but whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// The fixed set of fields recognized by the extractor, in display order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EventField {
    /// Vessel name.
    Vessel,
    /// Port of call (or port of loading/discharge).
    Port,
    /// Cargo operation or event label.
    Operation,
    /// When the operation started.
    Start,
    /// When the operation ended.
    End,
    /// Free-form remarks.
    Remarks,
}

impl EventField {
    /// Returns all variants of this enum, in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Vessel,
            Self::Port,
            Self::Operation,
            Self::Start,
            Self::End,
            Self::Remarks,
        ]
    }

    /// Human-readable column heading.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Vessel => "Vessel",
            Self::Port => "Port",
            Self::Operation => "Operation",
            Self::Start => "Start",
            Self::End => "End",
            Self::Remarks => "Remarks",
        }
    }
}

/// An extracted value, or the sentinel for a field that was not found.
///
/// Serializes as a JSON string or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum FieldValue {
    /// The field was located and holds this text.
    Found(String),
    /// No rule matched the field.
    #[default]
    Absent,
}

impl FieldValue {
    /// Returns the found text, if any.
    #[must_use]
    pub fn as_found(&self) -> Option<&str> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent => None,
        }
    }

    /// Returns `true` for the sentinel.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_found().unwrap_or(ABSENT_SENTINEL))
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Absent, Self::Found)
    }
}

impl From<FieldValue> for Option<String> {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Found(value) => Some(value),
            FieldValue::Absent => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Found(value.to_owned())
    }
}

/// A complete mapping from every [`EventField`] to a [`FieldValue`].
///
/// There are no mutators: a record is built in one step and then only
/// read. Missing keys supplied to any constructor (including
/// deserialization) are filled with [`FieldValue::Absent`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EventRecord {
    fields: BTreeMap<EventField, FieldValue>,
}

impl EventRecord {
    /// Builds a record by asking `value_for` for each field in turn.
    #[must_use]
    pub fn from_fn(mut value_for: impl FnMut(EventField) -> FieldValue) -> Self {
        Self {
            fields: EventField::all()
                .iter()
                .map(|&field| (field, value_for(field)))
                .collect(),
        }
    }

    /// Builds a record from the given pairs, leaving the rest absent.
    ///
    /// Later pairs for the same field replace earlier ones.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (EventField, FieldValue)>) -> Self {
        let mut fields: BTreeMap<EventField, FieldValue> = pairs.into_iter().collect();
        for &field in EventField::all() {
            fields.entry(field).or_default();
        }
        Self { fields }
    }

    /// A record in which every field is absent.
    #[must_use]
    pub fn absent() -> Self {
        Self::from_fn(|_| FieldValue::Absent)
    }

    /// Returns the value held for `field`.
    #[must_use]
    pub fn get(&self, field: EventField) -> &FieldValue {
        // Every constructor populates every key.
        static ABSENT: FieldValue = FieldValue::Absent;
        self.fields.get(&field).unwrap_or(&ABSENT)
    }

    /// Iterates fields in display order.
    pub fn iter(&self) -> impl Iterator<Item = (EventField, &FieldValue)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }

    /// Returns `true` if no field was found.
    #[must_use]
    pub fn is_all_absent(&self) -> bool {
        self.fields.values().all(FieldValue::is_absent)
    }
}

impl Default for EventRecord {
    fn default() -> Self {
        Self::absent()
    }
}

impl<'de> Deserialize<'de> for EventRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::<EventField, FieldValue>::deserialize(deserializer).map(Self::from_pairs)
    }
}

/// Voyage-level values reported next to the summary record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MetadataField {
    /// Port of loading (POL).
    VoyageFrom,
    /// Port of discharge (POD).
    VoyageTo,
}

impl MetadataField {
    /// Returns all variants of this enum, in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::VoyageFrom, Self::VoyageTo]
    }

    /// Human-readable row heading.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::VoyageFrom => "Port of loading",
            Self::VoyageTo => "Port of discharge",
        }
    }
}

/// The voyage's ports of loading and discharge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VoyageMetadata {
    /// Port of loading.
    #[serde(default)]
    pub voyage_from: FieldValue,
    /// Port of discharge.
    #[serde(default)]
    pub voyage_to: FieldValue,
}

impl VoyageMetadata {
    /// Builds the metadata by asking `value_for` for each field in turn.
    #[must_use]
    pub fn from_fn(mut value_for: impl FnMut(MetadataField) -> FieldValue) -> Self {
        Self {
            voyage_from: value_for(MetadataField::VoyageFrom),
            voyage_to: value_for(MetadataField::VoyageTo),
        }
    }

    /// Returns the value held for `field`.
    #[must_use]
    pub const fn get(&self, field: MetadataField) -> &FieldValue {
        match field {
            MetadataField::VoyageFrom => &self.voyage_from,
            MetadataField::VoyageTo => &self.voyage_to,
        }
    }
}

/// Everything extracted from one [`RawDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    /// Original filename of the upload.
    pub filename: String,
    /// Detected source format.
    pub format: DocumentFormat,
    /// Document-level record produced by the field rule table.
    pub summary: EventRecord,
    /// Ports of loading and discharge.
    #[serde(default)]
    pub metadata: VoyageMetadata,
    /// Dated event rows in chronological order (undated rows last).
    pub timeline: Vec<EventRecord>,
    /// The converted document text the extraction ran on.
    #[serde(default)]
    pub text: String,
}

impl Extraction {
    /// Distinct operation labels present in the timeline, sorted.
    #[must_use]
    pub fn event_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self
            .timeline
            .iter()
            .filter_map(|record| record.get(EventField::Operation).as_found())
            .collect();
        types.sort_unstable();
        types.dedup();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_record_has_every_key() {
        let record = EventRecord::absent();
        assert_eq!(record.iter().count(), EventField::all().len());
        assert!(record.is_all_absent());
    }

    #[test]
    fn from_pairs_fills_missing_fields() {
        let record = EventRecord::from_pairs([(EventField::Vessel, "MV Example".into())]);
        assert_eq!(record.get(EventField::Vessel).as_found(), Some("MV Example"));
        assert!(record.get(EventField::Remarks).is_absent());
        assert_eq!(record.iter().count(), EventField::all().len());
    }

    #[test]
    fn deserializing_partial_map_keeps_invariant() {
        let record: EventRecord =
            serde_json::from_str(r#"{"port": "Singapore", "remarks": null}"#).unwrap();
        assert_eq!(record.get(EventField::Port).as_found(), Some("Singapore"));
        assert!(record.get(EventField::Vessel).is_absent());
        assert!(record.get(EventField::Remarks).is_absent());
        assert_eq!(record.iter().count(), EventField::all().len());
    }

    #[test]
    fn serializes_absent_as_null_in_field_order() {
        let record = EventRecord::from_pairs([(EventField::Operation, "Loading".into())]);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"vessel":null,"port":null,"operation":"Loading","start":null,"end":null,"remarks":null}"#
        );
    }

    #[test]
    fn absent_displays_sentinel() {
        assert_eq!(FieldValue::Absent.to_string(), ABSENT_SENTINEL);
        assert_eq!(FieldValue::from("Berthed").to_string(), "Berthed");
    }

    #[test]
    fn field_names_parse_case_insensitively() {
        assert_eq!("Vessel".parse::<EventField>().unwrap(), EventField::Vessel);
        assert_eq!("remarks".parse::<EventField>().unwrap(), EventField::Remarks);
        assert_eq!(EventField::Start.to_string(), "start");
        assert!("draft".parse::<EventField>().is_err());
    }

    #[test]
    fn event_types_are_distinct_and_sorted() {
        let row = |op: &str| EventRecord::from_pairs([(EventField::Operation, op.into())]);
        let extraction = Extraction {
            filename: "sof.txt".to_owned(),
            format: DocumentFormat::Text,
            summary: EventRecord::absent(),
            metadata: VoyageMetadata::default(),
            timeline: vec![row("VESSEL SAILED"), row("BERTHED"), row("VESSEL SAILED")],
            text: String::new(),
        };
        assert_eq!(extraction.event_types(), vec!["BERTHED", "VESSEL SAILED"]);
    }

    #[test]
    fn voyage_metadata_serializes_both_ports() {
        let metadata = VoyageMetadata::from_fn(|field| match field {
            MetadataField::VoyageFrom => "SINGAPORE".into(),
            MetadataField::VoyageTo => FieldValue::Absent,
        });
        assert_eq!(metadata.get(MetadataField::VoyageFrom).as_found(), Some("SINGAPORE"));
        assert_eq!(
            serde_json::to_string(&metadata).unwrap(),
            r#"{"voyage_from":"SINGAPORE","voyage_to":null}"#
        );
        assert_eq!("voyage_to".parse::<MetadataField>().unwrap(), MetadataField::VoyageTo);
    }
}
