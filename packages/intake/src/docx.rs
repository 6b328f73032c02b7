//! Word (`.docx`) text extraction.

use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild};

use crate::IntakeError;

/// Extracts the body text of a `.docx` file, one line per paragraph.
///
/// # Errors
///
/// Returns [`IntakeError::UnsupportedFormat`] if the bytes are not a
/// readable Word document.
pub fn extract_text(bytes: &[u8]) -> Result<String, IntakeError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| {
        IntakeError::UnsupportedFormat(format!("failed to read DOCX document: {e:?}"))
    })?;

    let lines: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(paragraph) => Some(paragraph_text(paragraph)),
            _ => None,
        })
        .collect();

    log::debug!("Read {} paragraphs from DOCX document", lines.len());

    Ok(lines.join("\n"))
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let text: String = paragraph
        .children
        .iter()
        .filter_map(|child| match child {
            ParagraphChild::Run(run) => Some(run),
            _ => None,
        })
        .flat_map(|run| run.children.iter())
        .filter_map(|child| match child {
            RunChild::Text(text) => Some(text.text.as_str()),
            RunChild::Tab(_) => Some("\t"),
            _ => None,
        })
        .collect();
    unescape_xml(&text)
}

/// Run text may still carry the XML entities it was stored with.
fn unescape_xml(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use docx_rs::{Docx, Run};

    use super::*;

    fn build(paragraphs: &[&str]) -> Vec<u8> {
        let mut docx = Docx::new();
        for text in paragraphs {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*text)));
        }
        let mut cursor = Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn reads_paragraphs_as_lines() {
        let bytes = build(&["Vessel: MV Example", "Port: Singapore"]);
        let text = extract_text(&bytes).unwrap();
        assert_eq!(text, "Vessel: MV Example\nPort: Singapore");
    }

    #[test]
    fn unescapes_entities() {
        assert_eq!(unescape_xml("A &amp; B &lt;1&gt;"), "A & B <1>");
        assert_eq!(unescape_xml("&amp;lt;"), "&lt;");
    }

    #[test]
    fn rejects_non_zip_bytes() {
        assert!(matches!(
            extract_text(b"plain text pretending to be docx"),
            Err(IntakeError::UnsupportedFormat(_))
        ));
    }
}
