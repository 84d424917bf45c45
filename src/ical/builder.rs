//! A module to build ICal files back from their line model

use crate::ical::document::{ParsedDocument, PropertyRecord};

/// Properties whose rebuilt value must keep the shape (`DATE` or `DATE-TIME`) of their original value
const DATE_VALUED_KEYS: [&str; 5] = ["DTSTART", "DUE", "DTEND", "CREATED", "LAST-MODIFIED"];

/// Serialize a [`ParsedDocument`] back into an iCal file, with CRLF line endings.
///
/// Records marked for deletion are skipped, modified records are rebuilt, and every other record is written back as it was read.
pub fn serialize(doc: &ParsedDocument) -> String {
    doc.records().iter()
        .filter(|record| record.is_marked_for_deletion() == false)
        .map(|record| match record.is_modified() {
            true => build_line(record),
            false => record.original().to_string(),
        })
        .collect::<Vec<_>>()
        .join("\r\n")
}

/// Build a `KEY;PARAMETERS:VALUE` line from a record.
///
/// A date-valued property is truncated to the length of its original value, so that e.g. `20240106T090000Z`
/// becomes `20240106` when the original value was a `DATE`. \
/// A property with `VALUE=DATE` never gets a time part.
pub fn build_line(record: &PropertyRecord) -> String {
    let mut value = record.value().to_string();

    if DATE_VALUED_KEYS.contains(&record.key()) {
        if let Some(original) = record.original_value() {
            if original.is_empty() == false && value.len() > original.len() {
                truncate_at_char_boundary(&mut value, original.len());
            }
        }
    }

    if record.parameters() == "VALUE=DATE" {
        if let Some(pos) = value.find('T') {
            value.truncate(pos);
        }
    }

    match record.parameters() {
        "" => format!("{}:{}", record.key(), value),
        params => format!("{};{}:{}", record.key(), params, value),
    }
}

fn truncate_at_char_boundary(s: &mut String, mut len: usize) {
    while s.is_char_boundary(len) == false {
        len -= 1;
    }
    s.truncate(len);
}
