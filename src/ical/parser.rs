//! A module to parse ICal files into their line model

use crate::ical::document::{ParsedDocument, PropertyRecord};


/// Parse an iCal file into a [`ParsedDocument`].
///
/// This never fails: malformed input just produces records that are never matched, and that are written back untouched.
/// Both CRLF and bare LF line endings are accepted.
pub fn parse(content: &str) -> ParsedDocument {
    let mut records: Vec<PropertyRecord> = Vec::new();
    // Currently open blocks, with their instance numbers
    let mut stack: Vec<(String, usize)> = Vec::new();
    let mut n_blocks = 0;

    for physical_line in content.split('\n') {
        let line = physical_line.strip_suffix('\r').unwrap_or(physical_line);

        if is_continuation(line) {
            if let Some(previous) = records.last_mut() {
                previous.append_continuation(line);
                continue;
            }
        }

        let (component, block) = match stack.last() {
            Some((name, id)) => (Some(name.clone()), Some(*id)),
            None => (None, None),
        };
        let mut record = PropertyRecord::parsed(line, component, stack.len(), block);

        let key = record.key().to_string();
        match key.as_str() {
            "BEGIN" => {
                let opened = n_blocks;
                n_blocks += 1;
                record.set_delimits(opened);
                stack.push((record.value().to_string(), opened));
            },
            "END" => {
                match stack.iter().rposition(|(name, _)| name == record.value()) {
                    None => log::warn!("Ignoring unbalanced END:{}", record.value()),
                    Some(pos) => {
                        let closed = stack[pos].1;
                        stack.truncate(pos);
                        // An END line belongs to the enclosing block
                        let (component, block) = match stack.last() {
                            Some((name, id)) => (Some(name.clone()), Some(*id)),
                            None => (None, None),
                        };
                        record = PropertyRecord::parsed(line, component, stack.len(), block);
                        record.set_delimits(closed);
                    },
                }
            },
            _ => {},
        }

        records.push(record);
    }

    ParsedDocument::from_records(records)
}

/// Folded lines start with a single whitespace (RFC5545, section 3.1)
fn is_continuation(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::ical::serialize;

    const EXAMPLE_ICAL: &str = "BEGIN:VCALENDAR\r\n\
        VERSION:2.0\r\n\
        PRODID:-//Nextcloud Tasks v0.13.6\r\n\
        BEGIN:VTODO\r\n\
        UID:0633de27-8c32-42be-bcb8-63bc879c6185\r\n\
        CREATED:20210321T001600\r\n\
        LAST-MODIFIED:20210321T001600\r\n\
        DTSTAMP:20210321T001600\r\n\
        DUE;VALUE=DATE:20210325\r\n\
        SUMMARY:Do not forget to do this\r\n\
        X-FOO:bar\r\n\
        DESCRIPTION:A very long description that has been folded by the server be\r\n \
         cause it is longer than 75 octets\r\n\
        END:VTODO\r\n\
        END:VCALENDAR\r\n";

    #[test]
    fn test_records() {
        let doc = parse(EXAMPLE_ICAL);
        let keys: Vec<&str> = doc.records().iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec![
            "BEGIN", "VERSION", "PRODID",
            "BEGIN", "UID", "CREATED", "LAST-MODIFIED", "DTSTAMP", "DUE", "SUMMARY", "X-FOO", "DESCRIPTION", "END",
            "END", "",
        ]);

        let due = doc.find_property("VTODO", "DUE").unwrap();
        assert_eq!(due.parameters(), "VALUE=DATE");
        assert_eq!(due.value(), "20210325");
        assert_eq!(due.component(), Some("VTODO"));
        assert_eq!(due.depth(), 2);

        let prodid = doc.find_property("VCALENDAR", "PRODID").unwrap();
        assert_eq!(prodid.value(), "-//Nextcloud Tasks v0.13.6");
    }

    #[test]
    fn test_begin_end_belong_to_parent() {
        let doc = parse(EXAMPLE_ICAL);
        let records = doc.records();
        assert_eq!(records[0].component(), None);
        assert_eq!(records[3].key(), "BEGIN");
        assert_eq!(records[3].component(), Some("VCALENDAR"));
        assert_eq!(records[12].key(), "END");
        assert_eq!(records[12].value(), "VTODO");
        assert_eq!(records[12].component(), Some("VCALENDAR"));
        assert_eq!(records[13].component(), None);
    }

    #[test]
    fn test_folded_lines() {
        let doc = parse(EXAMPLE_ICAL);
        let description = doc.find_property("VTODO", "DESCRIPTION").unwrap();
        assert_eq!(description.value(),
            "A very long description that has been folded by the server because it is longer than 75 octets");
        assert!(description.original().contains("\r\n "));
    }

    #[test]
    fn test_round_trip() {
        let doc = parse(EXAMPLE_ICAL);
        assert_eq!(serialize(&doc), EXAMPLE_ICAL);
    }

    #[test]
    fn test_round_trip_bare_lf() {
        let lf = EXAMPLE_ICAL.replace("\r\n", "\n");
        let doc = parse(&lf);
        assert_eq!(serialize(&doc), EXAMPLE_ICAL);
    }

    #[test]
    fn test_malformed_input() {
        let garbage = "this is not\r\nEND:VTODO\r\n:no key\r\nBEGIN:VTODO\r\nSUMMARY:unterminated";
        let doc = parse(garbage);
        assert_eq!(doc.len(), 5);
        assert_eq!(doc.value_of("VTODO", "SUMMARY"), Some("unterminated"));
        assert_eq!(serialize(&doc), garbage);
    }
}
