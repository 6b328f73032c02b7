#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Upload intake for the SoF event extractor.
//!
//! Detects the format of an uploaded file, converts it to plain text
//! ([`pdf_extract`] for PDF text layers, [`docx_rs`] for Word documents,
//! UTF-8 decoding for everything else), and manages the three staging
//! directories an upload passes through (see [`staging`]).
//!
//! The primary entry point is [`extract_text`], which turns a filename and
//! its bytes into a [`RawDocument`].

pub mod docx;
pub mod pdf;
pub mod staging;

use std::ffi::OsStr;
use std::path::Path;

use sof_events_document_models::{DocumentFormat, RawDocument};

pub use staging::{Staging, StagingConfig, UploadId};

/// Default upload size limit (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const PDF_MAGIC: &[u8] = b"%PDF-";

const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "log", "csv", "md"];

/// Errors specific to upload intake.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    /// The file could not be converted to text.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The upload exceeds the configured size limit.
    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Bytes received so far.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejects uploads larger than `limit` bytes.
///
/// # Errors
///
/// Returns [`IntakeError::TooLarge`] if `size` exceeds `limit`.
pub const fn check_size(size: usize, limit: usize) -> Result<(), IntakeError> {
    if size > limit {
        return Err(IntakeError::TooLarge { size, limit });
    }
    Ok(())
}

/// Reduces a client-supplied filename to its final path component.
///
/// Browsers on some platforms send full paths; anything before the last
/// `/` or `\` is dropped. Returns `"upload"` if nothing usable remains.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        "upload".to_owned()
    } else {
        name.to_owned()
    }
}

/// Lower-cased extension of `filename`, if any.
#[must_use]
pub fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
}

/// Detects the format of an upload from its content and filename.
///
/// A `%PDF-` header always means PDF. Otherwise the extension decides;
/// files without an extension are accepted as text if they are valid
/// UTF-8.
///
/// # Errors
///
/// Returns [`IntakeError::UnsupportedFormat`] for any other file.
pub fn detect_format(filename: &str, bytes: &[u8]) -> Result<DocumentFormat, IntakeError> {
    if bytes.starts_with(PDF_MAGIC) {
        return Ok(DocumentFormat::Pdf);
    }

    match extension(filename).as_deref() {
        Some("pdf") => Ok(DocumentFormat::Pdf),
        Some("docx") => Ok(DocumentFormat::Docx),
        Some(ext) if TEXT_EXTENSIONS.contains(&ext) => Ok(DocumentFormat::Text),
        Some(ext) => Err(IntakeError::UnsupportedFormat(format!(
            "unsupported file type '.{ext}' (expected PDF, DOCX, or text)"
        ))),
        None if std::str::from_utf8(bytes).is_ok() => Ok(DocumentFormat::Text),
        None => Err(IntakeError::UnsupportedFormat(
            "file has no extension and is not UTF-8 text".to_owned(),
        )),
    }
}

/// Decodes a plain-text upload, dropping a UTF-8 byte-order mark.
///
/// # Errors
///
/// Returns [`IntakeError::UnsupportedFormat`] if the bytes are not UTF-8.
pub fn decode_text(bytes: &[u8]) -> Result<String, IntakeError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|e| {
        IntakeError::UnsupportedFormat(format!(
            "text is not valid UTF-8 (at byte {})",
            e.utf8_error().valid_up_to()
        ))
    })
}

/// Converts an uploaded file to a [`RawDocument`].
///
/// The returned document may be blank (e.g. a scanned PDF with no text
/// layer); the extractor decides what to do with that.
///
/// # Errors
///
/// Returns [`IntakeError::UnsupportedFormat`] if the format is not
/// recognized or the content cannot be converted to text.
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<RawDocument, IntakeError> {
    let filename = sanitize_filename(filename);
    let format = detect_format(&filename, bytes)?;

    let text = match format {
        DocumentFormat::Pdf => pdf::extract_text(bytes)?,
        DocumentFormat::Docx => docx::extract_text(bytes)?,
        DocumentFormat::Text => decode_text(bytes)?,
    };

    log::debug!(
        "Converted {filename} ({format}, {} bytes) to {} characters of text",
        bytes.len(),
        text.chars().count()
    );

    Ok(RawDocument::new(filename, format, text))
}

/// Reads `path` and converts it with [`extract_text`].
///
/// # Errors
///
/// Returns [`IntakeError::Io`] if the file cannot be read, or any error
/// from [`extract_text`].
pub fn extract_file(path: &Path) -> Result<RawDocument, IntakeError> {
    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or("upload");
    extract_text(filename, &bytes)
}
