//! Period-over-period deltas.

use serde::Serialize;

use super::stats::DigestStats;

/// Change from the previous period to the current one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub message_delta: i64,
    /// Delta relative to the previous total, truncated toward zero.
    /// Computed against 1 when the previous period was empty.
    pub message_delta_percentage: i64,
    pub evening_delta: i64,
    pub weekend_delta: i64,
}

pub fn compute_comparison(current: &DigestStats, previous: &DigestStats) -> Comparison {
    let message_delta = current.total_messages as i64 - previous.total_messages as i64;
    let base = (previous.total_messages as i64).max(1);

    Comparison {
        message_delta,
        // Integer division truncates toward zero.
        message_delta_percentage: message_delta * 100 / base,
        evening_delta: current.time_of_day.evening_count as i64
            - previous.time_of_day.evening_count as i64,
        weekend_delta: current.time_of_day.weekend_count as i64
            - previous.time_of_day.weekend_count as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::stats::TimeOfDayStats;

    fn stats(total: usize, evening: usize, weekend: usize) -> DigestStats {
        DigestStats {
            total_messages: total,
            time_of_day: TimeOfDayStats {
                evening_count: evening,
                weekend_count: weekend,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_previous_period() {
        let c = compute_comparison(&stats(10, 0, 0), &stats(0, 0, 0));
        assert_eq!(c.message_delta, 10);
        assert_eq!(c.message_delta_percentage, 1000);
    }

    #[test]
    fn test_percentage_truncates_toward_zero() {
        assert_eq!(compute_comparison(&stats(4, 0, 0), &stats(3, 0, 0)).message_delta_percentage, 33);
        assert_eq!(compute_comparison(&stats(2, 0, 0), &stats(3, 0, 0)).message_delta_percentage, -33);
        assert_eq!(compute_comparison(&stats(0, 0, 0), &stats(0, 0, 0)).message_delta_percentage, 0);
    }

    #[test]
    fn test_time_of_day_deltas() {
        let c = compute_comparison(&stats(5, 1, 4), &stats(5, 3, 2));
        assert_eq!(c.message_delta, 0);
        assert_eq!(c.evening_delta, -2);
        assert_eq!(c.weekend_delta, 2);
    }
}
