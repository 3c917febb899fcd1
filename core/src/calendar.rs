//! Calendar arithmetic for the program: day numbering and Sunday alignment.
//!
//! All dates are time-zone-naive local dates. Time of day never takes part
//! in day counting.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, Weekday};

/// Source of "now" for the tracker, so tests can pin the date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Fixed(NaiveDateTime),
}

impl Clock {
    /// A clock pinned to local midnight of the given date.
    #[must_use]
    pub fn fixed_date(date: NaiveDate) -> Self {
        Self::Fixed(date.and_time(chrono::NaiveTime::MIN))
    }

    #[must_use]
    pub fn now(&self) -> NaiveDateTime {
        match self {
            Self::System => Local::now().naive_local(),
            Self::Fixed(t) => *t,
        }
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Move a fixed clock forward. No effect on the system clock.
    pub fn advance(&mut self, delta: Duration) {
        if let Self::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Program day for `today` given day 1 on `start`. Never below 1, no upper clamp.
#[must_use]
pub fn current_day(start: NaiveDate, today: NaiveDate) -> u32 {
    let elapsed = (today - start).num_days();
    if elapsed < 0 {
        return 1;
    }
    u32::try_from(elapsed + 1).unwrap_or(u32::MAX)
}

#[must_use]
pub fn is_sunday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sun
}

/// The Sunday on or before `date`.
#[must_use]
pub fn previous_sunday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// The first Sunday strictly after `date`; a Sunday skips a full week.
#[must_use]
pub fn next_sunday(date: NaiveDate) -> NaiveDate {
    date + Duration::days(7 - i64::from(date.weekday().num_days_from_sunday()))
}

/// Days left until the next Sunday, 0 when `date` is a Sunday.
#[must_use]
pub fn days_until_sunday(date: NaiveDate) -> u32 {
    match date.weekday().num_days_from_sunday() {
        0 => 0,
        n => 7 - n,
    }
}
