//! PDF text-layer extraction.
//!
//! Uses pure-Rust extraction ([`pdf_extract`]). Scanned PDFs without a
//! text layer come back as blank text, not an error. Optical character
//! recognition is out of scope.

use crate::IntakeError;

/// Extracts the text layer of an in-memory PDF.
///
/// # Errors
///
/// Returns [`IntakeError::UnsupportedFormat`] if the bytes are not a
/// readable PDF. The parser panics on some malformed inputs; those panics
/// are caught and reported the same way.
pub fn extract_text(bytes: &[u8]) -> Result<String, IntakeError> {
    log::debug!("Extracting text layer from {} byte PDF", bytes.len());

    let text = match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            return Err(IntakeError::UnsupportedFormat(format!(
                "failed to extract text from PDF: {e}"
            )));
        }
        Err(_) => {
            return Err(IntakeError::UnsupportedFormat(
                "failed to extract text from PDF: malformed document".to_owned(),
            ));
        }
    };

    if text.trim().is_empty() {
        log::warn!("PDF has no text layer (scanned image?)");
    } else {
        log::debug!("Extracted {} characters of text from PDF", text.len());
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_pdf_bytes() {
        assert!(matches!(
            extract_text(b"definitely not a pdf"),
            Err(IntakeError::UnsupportedFormat(_))
        ));
    }
}
