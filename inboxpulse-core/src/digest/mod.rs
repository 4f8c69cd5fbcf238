//! Period digests
//!
//! A digest compares the trailing period of an aggregation window with the
//! period just before it:
//!
//! ```text
//! window:    [─────────────── days ───────────────]
//!            [── previous ──]  [────── current ───]
//!            start          end+1d             end
//! ```
//!
//! Each call recomputes everything from the messages it is given; nothing is
//! carried between calls.

pub mod comparison;
pub mod followups;
pub mod report;
pub mod stats;

pub use comparison::{compute_comparison, Comparison};
pub use followups::{detect_follow_ups, FollowUp};
pub use report::{build_report_prompt, stats_summary};
pub use stats::{
    compute_stats, compute_stats_in, ChannelStat, ContactStat, DailyStat, DigestStats,
    TimeOfDayStats,
};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::aggregate::NormalizedMessage;
use crate::config::DigestConfig;
use crate::error::{Error, Result};
use crate::period::{days_span, Period};

/// Knobs for digest construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestOptions {
    /// Length of the current (and previous) period
    pub period_days: i64,
    /// Minimum age of an unread message before it becomes a follow-up
    pub follow_up_days: i64,
    pub follow_up_limit: usize,
    /// Entries kept in the contact and channel rankings
    pub top_n: usize,
}

impl Default for DigestOptions {
    fn default() -> Self {
        Self {
            period_days: 7,
            follow_up_days: 3,
            follow_up_limit: 10,
            top_n: 5,
        }
    }
}

impl From<&DigestConfig> for DigestOptions {
    fn from(config: &DigestConfig) -> Self {
        Self {
            period_days: config.period_days,
            follow_up_days: config.follow_up_days,
            follow_up_limit: config.follow_up_limit,
            top_n: config.top_n,
        }
    }
}

/// Current-vs-previous activity report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Digest {
    pub current_period: Period,
    pub previous_period: Period,
    pub current_stats: DigestStats,
    pub previous_stats: DigestStats,
    pub comparison: Comparison,
    /// Drawn from the current period only
    pub follow_ups: Vec<FollowUp>,
}

/// Build a digest in the local time zone.
pub fn build_digest(
    window: &Period,
    messages: &[NormalizedMessage],
    options: &DigestOptions,
    now: DateTime<Utc>,
) -> Result<Digest> {
    build_digest_in(window, messages, options, now, &chrono::Local)
}

/// Build a digest with calendar statistics computed in `tz`.
///
/// Fails with [`Error::InvalidWindow`] when the window is shorter than two
/// periods, since the previous period would be partially unfetched.
pub fn build_digest_in<Tz: TimeZone>(
    window: &Period,
    messages: &[NormalizedMessage],
    options: &DigestOptions,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<Digest> {
    if options.period_days <= 0 {
        return Err(Error::InvalidWindow(format!(
            "period must be at least one day, got {}",
            options.period_days
        )));
    }

    let needed = options
        .period_days
        .checked_mul(2)
        .ok_or_else(|| {
            Error::InvalidWindow(format!("period of {} days is out of range", options.period_days))
        })
        .and_then(days_span)?;
    if window.duration() < needed {
        return Err(Error::InvalidWindow(format!(
            "window of {} days cannot hold two {}-day periods",
            window.duration().num_days(),
            options.period_days
        )));
    }

    let (current_period, previous_period) = window.split_trailing(options.period_days)?;

    let current: Vec<NormalizedMessage> = messages
        .iter()
        .filter(|m| current_period.contains(m.timestamp))
        .cloned()
        .collect();
    let previous: Vec<NormalizedMessage> = messages
        .iter()
        .filter(|m| previous_period.contains(m.timestamp))
        .cloned()
        .collect();

    let current_stats = compute_stats_in(&current, options.top_n, tz);
    let previous_stats = compute_stats_in(&previous, options.top_n, tz);
    let comparison = compute_comparison(&current_stats, &previous_stats);
    let follow_ups = detect_follow_ups(
        &current,
        now,
        days_span(options.follow_up_days)?,
        options.follow_up_limit,
    );

    tracing::debug!(
        current = current_stats.total_messages,
        previous = previous_stats.total_messages,
        follow_ups = follow_ups.len(),
        "digest built"
    );

    Ok(Digest {
        current_period,
        previous_period,
        current_stats,
        previous_stats,
        comparison,
        follow_ups,
    })
}
