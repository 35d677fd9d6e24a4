// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Millisecond clock values
//
// A Timestamp counts milliseconds since the Unix epoch (UTC). Log lines store
// the difference to the previous record, so the same type doubles as a delta.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use std::fmt;
use std::ops::{Add, Sub};

/// Text layout of absolute times inside sync-marker payloads
pub const SYNC_TIME_FORMAT: &str = "%Y-%m-%d_%H:%M:%S%.3f";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn millis(self) -> i64 {
        self.0
    }

    pub fn now() -> Self {
        Self::from_datetime(Utc::now().naive_utc())
    }

    /// Truncates to whole milliseconds.
    pub fn from_datetime(time: NaiveDateTime) -> Self {
        Self(time.and_utc().timestamp_millis())
    }

    /// Civil UTC date/time, or `None` outside chrono's representable range.
    pub fn to_calendar(self) -> Option<NaiveDateTime> {
        DateTime::from_timestamp_millis(self.0).map(|t| t.naive_utc())
    }

    /// (year, month) the timestamp falls into
    pub fn year_month(self) -> Option<(i32, u32)> {
        self.to_calendar().map(|t| (t.year(), t.month()))
    }
}

impl Add for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Timestamp) -> Timestamp {
        Timestamp(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: Timestamp) -> Timestamp {
        Timestamp(self.0.wrapping_sub(rhs.0))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_delta_arithmetic() {
        let a = Timestamp::from_millis(1_000);
        let b = Timestamp::from_millis(1_250);
        assert_eq!((b - a).millis(), 250);
        assert_eq!((a - b).millis(), -250);
        assert_eq!(a + (b - a), b);
    }

    #[test]
    fn test_calendar_roundtrip() {
        let time = NaiveDate::from_ymd_opt(2015, 5, 6)
            .unwrap()
            .and_hms_milli_opt(13, 45, 2, 317)
            .unwrap();
        let ts = Timestamp::from_datetime(time);
        assert_eq!(ts.to_calendar(), Some(time));
        assert_eq!(ts.year_month(), Some((2015, 5)));
        assert_eq!(
            time.format(SYNC_TIME_FORMAT).to_string(),
            "2015-05-06_13:45:02.317"
        );
    }

    #[test]
    fn test_out_of_range_calendar() {
        assert_eq!(Timestamp::from_millis(i64::MAX).to_calendar(), None);
    }
}
