//! CSV export of event records.

use std::io::Write;

use sof_events_document_models::{EventField, EventRecord};

use crate::ReportError;

/// Writes `records` as CSV: a header row of field names, then one row per
/// record. Absent values are written as empty cells.
///
/// # Errors
///
/// Returns [`ReportError::Csv`] or [`ReportError::Io`] if writing fails.
pub fn write_csv<W: Write>(writer: W, records: &[EventRecord]) -> Result<(), ReportError> {
    let mut out = csv::Writer::from_writer(writer);

    out.write_record(EventField::all().iter().map(ToString::to_string))?;
    for record in records {
        out.write_record(
            record
                .iter()
                .map(|(_, value)| value.as_found().unwrap_or_default()),
        )?;
    }

    out.flush()?;
    Ok(())
}

/// Renders `records` as a CSV string.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn to_csv(records: &[EventRecord]) -> Result<String, ReportError> {
    let mut buf = Vec::new();
    write_csv(&mut buf, records)?;
    String::from_utf8(buf)
        .map_err(|e| ReportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_empty_cells_for_absent() {
        let record = EventRecord::from_pairs([
            (EventField::Vessel, "MV Example, II".into()),
            (EventField::Operation, "LOADING COMMENCED".into()),
        ]);

        let csv = to_csv(&[record]).unwrap();

        assert_eq!(
            csv,
            "vessel,port,operation,start,end,remarks\n\"MV Example, II\",,LOADING COMMENCED,,,\n"
        );
    }

    #[test]
    fn header_only_for_no_records() {
        assert_eq!(to_csv(&[]).unwrap(), "vessel,port,operation,start,end,remarks\n");
    }
}
