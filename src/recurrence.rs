//! Finding the next occurrence of a recurring task

use chrono::{DateTime, Utc};
use rrule::RRuleSet;

use crate::clock::Clock;
use crate::error::CompletionError;
use crate::ical::{format_ics_date, parse_ics_date};

/// An `RRULE`, anchored at the `DTSTART` of its task
#[derive(Clone, Debug)]
pub struct Recurrence {
    rule_set: RRuleSet,
    source: String,
}

impl Recurrence {
    /// Build a recurrence from a task start and its `RRULE:...` line.
    ///
    /// The rule is always anchored at the start of the task, never at the completion date.
    /// Like `DTSTART`, an `UNTIL` date that is not in UTC is read as UTC.
    pub fn new(dtstart: &DateTime<Utc>, rrule_line: &str) -> Result<Self, CompletionError> {
        let source = format!("DTSTART:{}\n{}", format_ics_date(dtstart), with_utc_until(rrule_line.trim()));
        let rule_set: RRuleSet = source.parse()
            .map_err(|err| CompletionError::InvalidRecurrence(format!("{} ({})", err, source.replace('\n', " "))))?;

        Ok(Self { rule_set, source })
    }

    /// The `DTSTART` and `RRULE` lines this has been built from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The first occurrence that is strictly after `instant`
    pub fn first_after(&self, instant: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        // Whether `after` is inclusive or not, the second date is always enough to go past `instant`
        self.rule_set.clone()
            .after(instant.with_timezone(&rrule::Tz::UTC))
            .all(2)
            .dates
            .into_iter()
            .map(|dt| dt.with_timezone(&Utc))
            .find(|dt| dt > instant)
    }
}

/// Rewrite a floating or date-only `UNTIL` (e.g. `UNTIL=20240301`) as a UTC date-time.
///
/// The evaluator refuses an `UNTIL` that is not in UTC when `DTSTART` is.
fn with_utc_until(rrule_line: &str) -> String {
    let (name, body) = match rrule_line.split_once(':') {
        Some(parts) => parts,
        None => return rrule_line.to_string(),
    };

    let parts: Vec<String> = body.split(';')
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.eq_ignore_ascii_case("UNTIL") && value.ends_with('Z') == false => {
                match parse_ics_date(value) {
                    Ok(until) => format!("{}={}", key, format_ics_date(&until)),
                    Err(_) => part.to_string(),
                }
            },
            _ => part.to_string(),
        })
        .collect();

    format!("{}:{}", name, parts.join(";"))
}


/// The occurrences a completed recurring task could move to
#[derive(Clone, Debug, PartialEq)]
pub struct Candidates {
    /// The first occurrence after the current due date
    pub after_due: Option<DateTime<Utc>>,
    /// The first occurrence after the start of today
    pub after_today: Option<DateTime<Utc>>,
    /// The first occurrence after the start of the day following `after_today`
    pub after_tomorrow: Option<DateTime<Utc>>,
}

impl Candidates {
    pub fn compute<C: Clock>(recurrence: &Recurrence, due: Option<&DateTime<Utc>>, clock: &C) -> Self {
        let after_due = due.and_then(|due| recurrence.first_after(due));
        let after_today = recurrence.first_after(&clock.today_midnight());
        let after_tomorrow = after_today
            .and_then(|occurrence| recurrence.first_after(&clock.next_midnight_after(&occurrence)));

        Self { after_due, after_today, after_tomorrow }
    }

    /// Pick the occurrence the task should move to, or `None` in case the recurrence is over.
    ///
    /// This is the latest of `after_due` and `after_today`, unless it is the current due date itself
    /// (i.e. the occurrence that is being completed), in which case this is `after_tomorrow`.
    pub fn choose(&self, due: Option<&DateTime<Utc>>) -> Option<DateTime<Utc>> {
        let chosen = std::cmp::max(self.after_due, self.after_today);
        match (chosen, due) {
            (Some(chosen), Some(due)) if chosen == *due => self.after_tomorrow,
            _ => chosen,
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use crate::clock::FixedClock;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_first_after_is_exclusive() {
        let rec = Recurrence::new(&utc(2024, 1, 1, 9), "RRULE:FREQ=DAILY").unwrap();
        assert_eq!(rec.first_after(&utc(2024, 1, 2, 9)), Some(utc(2024, 1, 3, 9)));
        assert_eq!(rec.first_after(&utc(2024, 1, 2, 8)), Some(utc(2024, 1, 2, 9)));
        assert_eq!(rec.first_after(&utc(2023, 6, 1, 0)), Some(utc(2024, 1, 1, 9)));
        assert_eq!(rec.source(), "DTSTART:20240101T090000Z\nRRULE:FREQ=DAILY");
    }

    #[test]
    fn test_exhausted_rule() {
        let rec = Recurrence::new(&utc(2024, 1, 1, 9), "RRULE:FREQ=DAILY;COUNT=3").unwrap();
        assert_eq!(rec.first_after(&utc(2024, 1, 2, 12)), Some(utc(2024, 1, 3, 9)));
        assert_eq!(rec.first_after(&utc(2024, 1, 3, 9)), None);
    }

    #[test]
    fn test_until_is_read_as_utc() {
        let date_only = Recurrence::new(&utc(2024, 1, 1, 0), "RRULE:FREQ=WEEKLY;UNTIL=20240115").unwrap();
        assert_eq!(date_only.source(), "DTSTART:20240101T000000Z\nRRULE:FREQ=WEEKLY;UNTIL=20240115T000000Z");
        assert_eq!(date_only.first_after(&utc(2024, 1, 10, 0)), Some(utc(2024, 1, 15, 0)));
        assert_eq!(date_only.first_after(&utc(2024, 1, 15, 0)), None);

        let floating = Recurrence::new(&utc(2024, 1, 1, 9), "RRULE:FREQ=DAILY;UNTIL=20240103T090000;INTERVAL=1").unwrap();
        assert_eq!(floating.source(), "DTSTART:20240101T090000Z\nRRULE:FREQ=DAILY;UNTIL=20240103T090000Z;INTERVAL=1");
        assert_eq!(floating.first_after(&utc(2024, 1, 2, 12)), Some(utc(2024, 1, 3, 9)));
        assert_eq!(floating.first_after(&utc(2024, 1, 3, 9)), None);

        let already_utc = Recurrence::new(&utc(2024, 1, 1, 9), "RRULE:FREQ=DAILY;UNTIL=20240103T090000Z").unwrap();
        assert_eq!(already_utc.source(), "DTSTART:20240101T090000Z\nRRULE:FREQ=DAILY;UNTIL=20240103T090000Z");
    }

    #[test]
    fn test_invalid_rule() {
        let err = Recurrence::new(&utc(2024, 1, 1, 9), "RRULE:FREQ=SOMETIMES").unwrap_err();
        assert!(matches!(err, CompletionError::InvalidRecurrence(_)));
    }

    #[test]
    fn test_candidates_when_late() {
        let rec = Recurrence::new(&utc(2024, 1, 1, 9), "RRULE:FREQ=DAILY").unwrap();
        let due = utc(2024, 1, 2, 9);
        let clock = FixedClock::utc(utc(2024, 1, 5, 12));

        let candidates = Candidates::compute(&rec, Some(&due), &clock);
        assert_eq!(candidates, Candidates {
            after_due: Some(utc(2024, 1, 3, 9)),
            after_today: Some(utc(2024, 1, 5, 9)),
            after_tomorrow: Some(utc(2024, 1, 6, 9)),
        });
        assert_eq!(candidates.choose(Some(&due)), Some(utc(2024, 1, 5, 9)));
    }

    #[test]
    fn test_candidates_when_early() {
        let rec = Recurrence::new(&utc(2024, 1, 1, 9), "RRULE:FREQ=WEEKLY").unwrap();
        let due = utc(2024, 1, 15, 9);
        let clock = FixedClock::utc(utc(2024, 1, 10, 12));

        let candidates = Candidates::compute(&rec, Some(&due), &clock);
        assert_eq!(candidates.after_due, Some(utc(2024, 1, 22, 9)));
        assert_eq!(candidates.after_today, Some(utc(2024, 1, 15, 9)));
        assert_eq!(candidates.choose(Some(&due)), Some(utc(2024, 1, 22, 9)));
    }

    #[test]
    fn test_tie_with_due_date_moves_to_the_next_day() {
        let due = utc(2024, 1, 5, 9);
        let candidates = Candidates {
            after_due: None,
            after_today: Some(due),
            after_tomorrow: Some(utc(2024, 1, 6, 9)),
        };
        assert_eq!(candidates.choose(Some(&due)), Some(utc(2024, 1, 6, 9)));

        let over = Candidates { after_tomorrow: None, ..candidates };
        assert_eq!(over.choose(Some(&due)), None);
    }

    #[test]
    fn test_tie_on_last_occurrence() {
        // The due date is the last occurrence, and it is later today
        let rec = Recurrence::new(&utc(2024, 1, 1, 9), "RRULE:FREQ=DAILY;COUNT=5").unwrap();
        let due = utc(2024, 1, 5, 9);
        let clock = FixedClock::utc(utc(2024, 1, 5, 6));

        let candidates = Candidates::compute(&rec, Some(&due), &clock);
        assert_eq!(candidates.after_due, None);
        assert_eq!(candidates.after_today, Some(due));
        assert_eq!(candidates.after_tomorrow, None);
        assert_eq!(candidates.choose(Some(&due)), None);
    }

    #[test]
    fn test_without_due_date() {
        let rec = Recurrence::new(&utc(2024, 1, 1, 9), "RRULE:FREQ=DAILY").unwrap();
        let clock = FixedClock::utc(utc(2024, 1, 5, 12));
        let candidates = Candidates::compute(&rec, None, &clock);
        assert_eq!(candidates.after_due, None);
        assert_eq!(candidates.choose(None), Some(utc(2024, 1, 5, 9)));
    }

    #[test]
    fn test_nothing_to_choose() {
        let none = Candidates { after_due: None, after_today: None, after_tomorrow: None };
        assert_eq!(none.choose(Some(&utc(2024, 1, 1, 0))), None);
        assert_eq!(none.choose(None), None);
    }
}
