//! Connect timestamps
//!
//! The value is the local clock's `MMDDHHMMSS` read as a decimal integer, so
//! January dates have nine significant digits.

use std::fmt;

use chrono::{Datelike, Local, NaiveDateTime, Timelike};

/// `MMDDHHMMSS` timestamp carried in Connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u32);

impl Timestamp {
    /// Current local time
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(&Local::now().naive_local())
    }

    /// Encode a calendar time, dropping the year
    #[must_use]
    pub fn from_datetime(at: &NaiveDateTime) -> Self {
        Self(
            at.month() * 100_000_000
                + at.day() * 1_000_000
                + at.hour() * 10_000
                + at.minute() * 100
                + at.second(),
        )
    }

    /// Wrap a raw wire value
    #[must_use]
    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    /// Raw wire value
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:010}", self.0)
    }
}
