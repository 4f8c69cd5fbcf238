//! Inclusive time windows.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest day count accepted for windows and periods (about a century).
pub const MAX_DAYS: i64 = 36_500;

/// `days` as a duration, or `InvalidWindow` if chrono cannot represent it.
pub fn days_span(days: i64) -> Result<Duration> {
    Duration::try_days(days)
        .ok_or_else(|| Error::InvalidWindow(format!("{days} days is out of range")))
}

fn shift_back(instant: DateTime<Utc>, span: Duration) -> Result<DateTime<Utc>> {
    instant
        .checked_sub_signed(span)
        .ok_or_else(|| Error::InvalidWindow(format!("{span} before {instant} is out of range")))
}

/// Closed interval `[start, end]` of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `days`-long period ending at `end`.
    pub fn ending_at(end: DateTime<Utc>, days: i64) -> Result<Self> {
        Ok(Self {
            start: shift_back(end, days_span(days)?)?,
            end,
        })
    }

    /// True if `instant` falls inside the period, both ends included.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Split into the trailing `days`-long period and the one before it.
    ///
    /// Returns `(current, previous)` where current is `[end - days, end]`
    /// and previous is `[current.start - days, current.start - 1 day]`.
    /// The previous period does not touch the current one.
    pub fn split_trailing(&self, days: i64) -> Result<(Period, Period)> {
        let current = Period::ending_at(self.end, days)?;
        let previous = Period {
            start: shift_back(current.start, days_span(days)?)?,
            end: shift_back(current.start, Duration::days(1))?,
        };
        Ok((current, previous))
    }
}
