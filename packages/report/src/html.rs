//! HTML report pages.
//!
//! Every value cell carries a `data-field` attribute naming its
//! [`EventField`]; cells for absent values also carry `data-absent`, so the
//! tables can be read back without confusing a literal `N/A` in the
//! document with the sentinel.

use std::fmt::{self, Write as _};

use sof_events_document_models::{
    EventField, EventRecord, Extraction, FieldValue, MetadataField, VoyageMetadata,
};

/// Characters of converted text shown in the report's raw-text section.
pub const RAW_TEXT_PREVIEW_CHARS: usize = 5000;

const STYLE: &str = r"
  body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 1100px; margin: 0 auto; padding: 24px; color: #222; }
  h1 { font-size: 24px; margin-bottom: 4px; }
  .meta { color: #666; margin-top: 0; }
  table { border-collapse: collapse; width: 100%; margin: 16px 0 32px; }
  th, td { border: 1px solid #ddd; padding: 8px 10px; text-align: left; vertical-align: top; }
  thead th { background: #f3f4f6; }
  td[data-absent] { color: #999; font-style: italic; }
  .error { background: #fef2f2; border: 1px solid #fecaca; color: #991b1b; padding: 16px; border-radius: 6px; }
  a.back { display: inline-block; margin-top: 16px; }
  .downloads a { margin-right: 12px; }
  details.raw-text pre { white-space: pre-wrap; background: #f9fafb; border: 1px solid #e5e7eb; padding: 12px; max-height: 400px; overflow: auto; }
";

/// Download locations of the JSON and CSV reports for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloads {
    /// JSON report URL.
    pub json: String,
    /// CSV export URL.
    pub csv: String,
}

impl Downloads {
    /// Links to `<base><id>.json` and `<base><id>.csv`.
    #[must_use]
    pub fn for_upload(base: &str, id: &str) -> Self {
        Self {
            json: format!("{base}{id}.json"),
            csv: format!("{base}{id}.csv"),
        }
    }
}

/// Escapes text for use in HTML element content and quoted attributes.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the full report page for an extraction, with links to the
/// stored JSON and CSV reports when `downloads` is given.
#[must_use]
pub fn render(extraction: &Extraction, downloads: Option<&Downloads>) -> String {
    let title = format!("SoF Events: {}", escape(&extraction.filename));
    let body = format!(
        r#"<h1>Statement of Facts Events</h1>
<p class="meta">Source: <strong>{filename}</strong> ({format}) &middot; {count} timeline event(s)</p>
{downloads}<h2>Summary</h2>
{summary}
<h2>Voyage</h2>
{voyage}
<h2>Timeline</h2>
{timeline}
{raw_text}
<a class="back" href="/">Upload another document</a>"#,
        filename = escape(&extraction.filename),
        format = extraction.format,
        count = extraction.timeline.len(),
        downloads = downloads.map(download_links).unwrap_or_default(),
        summary = summary_table(&extraction.summary),
        voyage = voyage_table(&extraction.metadata),
        timeline = timeline_table(&extraction.timeline),
        raw_text = raw_text_section(&extraction.text),
    );
    page(&title, &body)
}

/// Renders a page reporting that a document could not be processed.
#[must_use]
pub fn render_error(message: &str) -> String {
    let body = format!(
        r#"<h1>Could not process document</h1>
<div class="error">{message}</div>
<a class="back" href="/">Try another document</a>"#,
        message = escape(message),
    );
    page("SoF Events: error", &body)
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
{body}
</body>
</html>
"#
    )
}

fn download_links(downloads: &Downloads) -> String {
    format!(
        "<p class=\"downloads\">Download: <a href=\"{}\" download>JSON</a><a href=\"{}\" download>CSV</a></p>\n",
        escape(&downloads.json),
        escape(&downloads.csv),
    )
}

fn value_cell(out: &mut String, name: impl fmt::Display, value: &FieldValue) {
    let absent = if value.is_absent() { " data-absent" } else { "" };
    write!(
        out,
        r#"<td data-field="{name}"{absent}>{}</td>"#,
        escape(&value.to_string())
    )
    .unwrap();
}

fn summary_table(record: &EventRecord) -> String {
    let mut out = String::from(
        "<table class=\"summary\">\n<thead><tr><th>Field</th><th>Value</th></tr></thead>\n<tbody>\n",
    );
    for &field in EventField::all() {
        write!(out, "<tr><th scope=\"row\">{}</th>", field.label()).unwrap();
        value_cell(&mut out, field, record.get(field));
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>");
    out
}

fn voyage_table(metadata: &VoyageMetadata) -> String {
    let mut out = String::from("<table class=\"voyage\">\n<tbody>\n");
    for &field in MetadataField::all() {
        write!(out, "<tr><th scope=\"row\">{}</th>", field.label()).unwrap();
        value_cell(&mut out, field, metadata.get(field));
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>");
    out
}

fn raw_text_section(text: &str) -> String {
    let preview = match text.char_indices().nth(RAW_TEXT_PREVIEW_CHARS) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_owned(),
    };
    format!(
        "<details class=\"raw-text\">\n<summary>Extracted text</summary>\n<pre>{}</pre>\n</details>",
        escape(&preview)
    )
}

fn timeline_table(records: &[EventRecord]) -> String {
    if records.is_empty() {
        return "<p class=\"empty\">No dated events were found in this document.</p>".to_owned();
    }

    let mut out = String::from("<table class=\"timeline\">\n<thead><tr><th>#</th>");
    for field in EventField::all() {
        write!(out, "<th>{}</th>", field.label()).unwrap();
    }
    out.push_str("</tr></thead>\n<tbody>\n");

    for (i, record) in records.iter().enumerate() {
        write!(out, "<tr><td>{}</td>", i + 1).unwrap();
        for &field in EventField::all() {
            value_cell(&mut out, field, record.get(field));
        }
        out.push_str("</tr>\n");
    }

    out.push_str("</tbody>\n</table>");
    out
}

#[cfg(test)]
mod tests {
    use scraper::{ElementRef, Html, Selector};
    use sof_events_document_models::DocumentFormat;

    use super::*;

    fn read_cell(cell: ElementRef<'_>) -> (EventField, FieldValue) {
        let field = cell.value().attr("data-field").unwrap().parse().unwrap();
        let value = if cell.value().attr("data-absent").is_some() {
            FieldValue::Absent
        } else {
            FieldValue::Found(cell.text().collect())
        };
        (field, value)
    }

    fn parse_summary(html: &Html) -> EventRecord {
        let cells = Selector::parse("table.summary td[data-field]").unwrap();
        EventRecord::from_pairs(html.select(&cells).map(read_cell))
    }

    fn parse_timeline(html: &Html) -> Vec<EventRecord> {
        let rows = Selector::parse("table.timeline tbody tr").unwrap();
        let cells = Selector::parse("td[data-field]").unwrap();
        html.select(&rows)
            .map(|row| EventRecord::from_pairs(row.select(&cells).map(read_cell)))
            .collect()
    }

    fn sample() -> Extraction {
        let summary = EventRecord::from_pairs([
            (EventField::Vessel, "MV <Ocean> & \"Star\"".into()),
            (EventField::Port, "Singapore".into()),
            (EventField::Operation, "N/A".into()),
        ]);
        let row = EventRecord::from_pairs([
            (EventField::Vessel, "MV <Ocean> & \"Star\"".into()),
            (EventField::Operation, "LOADING COMMENCED".into()),
            (EventField::Start, "2023-11-05T07:00:00".into()),
            (EventField::Remarks, "Loading commenced: 5 NOV 0700 'pier'".into()),
        ]);
        Extraction {
            filename: "<sof>.pdf".to_owned(),
            format: DocumentFormat::Pdf,
            summary,
            metadata: VoyageMetadata {
                voyage_from: "SINGAPORE".into(),
                voyage_to: "ROTTERDAM".into(),
            },
            timeline: vec![row],
            text: "2. Vessel Name: MV <Ocean>\n3. Port: POL SINGAPORE".to_owned(),
        }
    }

    #[test]
    fn tables_round_trip() {
        let extraction = sample();
        let html = Html::parse_document(&render(&extraction, None));

        assert_eq!(parse_summary(&html), extraction.summary);
        assert_eq!(parse_timeline(&html), extraction.timeline);
    }

    #[test]
    fn literal_na_is_not_the_sentinel() {
        let html = render(&sample(), None);
        assert!(html.contains(r#"<td data-field="operation">N/A</td>"#));
        assert!(html.contains(r#"<td data-field="remarks" data-absent>N/A</td>"#));
    }

    #[test]
    fn escapes_untrusted_text() {
        let html = render(&sample(), None);
        assert!(!html.contains("<sof>"));
        assert!(html.contains("&lt;sof&gt;.pdf"));
        assert!(html.contains("MV &lt;Ocean&gt; &amp; &quot;Star&quot;"));
    }

    #[test]
    fn empty_timeline_has_message() {
        let mut extraction = sample();
        extraction.timeline.clear();
        let html = render(&extraction, None);
        assert!(html.contains("No dated events"));
        assert!(!html.contains("class=\"timeline\""));
    }

    #[test]
    fn voyage_ports_are_listed() {
        let html = Html::parse_document(&render(&sample(), None));
        let cells = Selector::parse("table.voyage td[data-field]").unwrap();
        let values: Vec<(String, String)> = html
            .select(&cells)
            .map(|cell| {
                (
                    cell.value().attr("data-field").unwrap().to_owned(),
                    cell.text().collect(),
                )
            })
            .collect();
        assert_eq!(
            values,
            vec![
                ("voyage_from".to_owned(), "SINGAPORE".to_owned()),
                ("voyage_to".to_owned(), "ROTTERDAM".to_owned()),
            ]
        );
    }

    #[test]
    fn raw_text_is_shown_escaped() {
        let html = Html::parse_document(&render(&sample(), None));
        let pre = Selector::parse("details.raw-text pre").unwrap();
        let text: String = html.select(&pre).next().unwrap().text().collect();
        assert_eq!(text, sample().text);
    }

    #[test]
    fn long_raw_text_is_truncated() {
        let mut extraction = sample();
        extraction.text = "é".repeat(RAW_TEXT_PREVIEW_CHARS + 10);
        let html = render(&extraction, None);
        let expected = format!("<pre>{}...</pre>", "é".repeat(RAW_TEXT_PREVIEW_CHARS));
        assert!(html.contains(&expected));
    }

    #[test]
    fn download_links_when_given() {
        let downloads = Downloads::for_upload("/outputs/", "sof_1");
        let html = render(&sample(), Some(&downloads));
        assert!(html.contains(r#"<a href="/outputs/sof_1.json" download>JSON</a>"#));
        assert!(html.contains(r#"<a href="/outputs/sof_1.csv" download>CSV</a>"#));
        assert!(!render(&sample(), None).contains("class=\"downloads\""));
    }

    #[test]
    fn error_page_escapes_message() {
        let html = render_error("bad <input>");
        assert!(html.contains("Could not process document"));
        assert!(html.contains("bad &lt;input&gt;"));
    }
}
