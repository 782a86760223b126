//! Calendar-day arithmetic.
//!
//! Timestamps are stored in UTC; which day a session "belongs to" is
//! decided in a fixed local offset.

use crate::{Error, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};

/// Decides which calendar day a timestamp falls on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl Calendar {
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Build a calendar for a whole-minute offset east of UTC
    pub fn from_offset_minutes(minutes: i32) -> Result<Self> {
        if !(-1439..=1439).contains(&minutes) {
            return Err(Error::Config(format!(
                "utc_offset_minutes {} out of range (-1439..=1439)",
                minutes
            )));
        }
        let offset = FixedOffset::east_opt(minutes * 60)
            .ok_or_else(|| Error::Config(format!("invalid utc offset {} minutes", minutes)))?;
        Ok(Self { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Local calendar day of a timestamp
    pub fn day_of(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.offset).date_naive()
    }

    /// First instant of a local day, in UTC
    pub fn start_of(&self, day: NaiveDate) -> DateTime<Utc> {
        let midnight = day.and_time(NaiveTime::MIN);
        // Fixed offsets have no gaps, so the local midnight always exists
        (midnight - self.offset_duration()).and_utc()
    }

    /// Inclusive `[start, end]` bounds of the local day containing `ts`
    pub fn day_bounds(&self, ts: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        self.bounds_of(self.day_of(ts))
    }

    /// Inclusive `[start, end]` bounds of a local day
    pub fn bounds_of(&self, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.start_of(day);
        let end = start + Duration::days(1) - Duration::nanoseconds(1);
        (start, end)
    }

    pub fn same_day(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        self.day_of(a) == self.day_of(b)
    }

    fn offset_duration(&self) -> Duration {
        Duration::seconds(i64::from(self.offset.local_minus_utc()))
    }
}
