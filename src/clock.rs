//! Time sources
//!
//! Completing a recurring task depends on what "today" is, in the time zone of the user.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Tells the time, and where the days start
pub trait Clock {
    /// The current instant
    fn now(&self) -> DateTime<Utc>;
    /// The calendar date of `instant`, in the time zone of this clock
    fn local_date(&self, instant: &DateTime<Utc>) -> NaiveDate;
    /// The instant `date` starts at, in the time zone of this clock
    fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc>;

    /// The instant the current day started at
    fn today_midnight(&self) -> DateTime<Utc> {
        self.local_midnight(self.local_date(&self.now()))
    }

    /// The instant the day after the day of `instant` starts at
    fn next_midnight_after(&self, instant: &DateTime<Utc>) -> DateTime<Utc> {
        let date = self.local_date(instant);
        match date.succ_opt() {
            Some(next_day) => self.local_midnight(next_day),
            None => self.local_midnight(date),
        }
    }
}

/// The actual system time, in the local time zone (or in a given one)
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock {
    tz: Option<Tz>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_timezone(tz: Tz) -> Self {
        Self { tz: Some(tz) }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_date(&self, instant: &DateTime<Utc>) -> NaiveDate {
        match self.tz {
            Some(tz) => instant.with_timezone(&tz).date_naive(),
            None => instant.with_timezone(&Local).date_naive(),
        }
    }

    fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        match self.tz {
            Some(tz) => midnight_in(&tz, date),
            None => midnight_in(&Local, date),
        }
    }
}

/// A clock that is stopped at a given instant
#[derive(Clone, Copy, Debug)]
pub struct FixedClock {
    now: DateTime<Utc>,
    tz: Tz,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, tz: Tz) -> Self {
        Self { now, tz }
    }

    /// A clock stopped at `now`, whose days start at midnight UTC
    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::new(now, Tz::UTC)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn local_date(&self, instant: &DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        midnight_in(&self.tz, date)
    }
}

/// The first instant of `date` in `tz`.
///
/// In case midnight does not exist on that day (DST gap), this is the start of the day in UTC
fn midnight_in<T: TimeZone>(tz: &T, date: NaiveDate) -> DateTime<Utc> {
    let naive_midnight = date.and_time(chrono::NaiveTime::MIN);
    match tz.from_local_datetime(&naive_midnight).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => {
            log::warn!("Midnight does not exist on {}, using midnight UTC", date);
            Utc.from_utc_datetime(&naive_midnight)
        },
    }
}
