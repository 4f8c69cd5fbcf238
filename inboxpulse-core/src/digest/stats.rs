//! Per-period activity statistics.
//!
//! Calendar-dependent figures (daily buckets, evening, weekend) are computed
//! in a caller-supplied time zone. [`compute_stats`] uses the local zone;
//! tests pass a fixed offset through [`compute_stats_in`].

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate, TimeZone, Timelike, Weekday};
use serde::Serialize;

use crate::aggregate::NormalizedMessage;

/// Local hour at which a message counts as sent in the evening.
pub const EVENING_START_HOUR: u32 = 18;

/// Message count for one sender on one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactStat {
    /// `senderId:platform`
    pub contact_id: String,
    pub contact_name: String,
    pub platform: String,
    pub message_count: usize,
}

/// Message count for one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStat {
    pub chat_id: String,
    pub chat_name: String,
    pub platform: String,
    pub message_count: usize,
}

/// Message count for one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    /// Short English weekday name ("Mon")
    pub weekday: String,
    pub message_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimeOfDayStats {
    pub evening_count: usize,
    pub weekend_count: usize,
}

/// Statistics for one period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DigestStats {
    pub total_messages: usize,
    /// Top contacts, most active first
    pub contacts: Vec<ContactStat>,
    /// Top conversations, most active first
    pub channels: Vec<ChannelStat>,
    /// Days with at least one message, oldest first
    pub daily: Vec<DailyStat>,
    pub busiest_day: Option<DailyStat>,
    pub time_of_day: TimeOfDayStats,
}

/// Compute statistics using the local time zone.
pub fn compute_stats(messages: &[NormalizedMessage], top_n: usize) -> DigestStats {
    compute_stats_in(messages, top_n, &chrono::Local)
}

/// Compute statistics with calendar figures taken in `tz`.
pub fn compute_stats_in<Tz: TimeZone>(
    messages: &[NormalizedMessage],
    top_n: usize,
    tz: &Tz,
) -> DigestStats {
    let mut contacts = Counter::default();
    let mut channels = Counter::default();
    let mut daily: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut time_of_day = TimeOfDayStats::default();

    for message in messages {
        let contact_key = format!("{}:{}", message.sender_id, message.platform);
        contacts.bump(contact_key, || (message.sender_name.clone(), message.platform.clone()));
        channels.bump(message.chat_id.clone(), || {
            (message.chat_name.clone(), message.platform.clone())
        });

        let local = message.timestamp.with_timezone(tz);
        *daily.entry(local.date_naive()).or_default() += 1;

        if local.hour() >= EVENING_START_HOUR {
            time_of_day.evening_count += 1;
        }
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            time_of_day.weekend_count += 1;
        }
    }

    let contacts = contacts
        .top(top_n)
        .into_iter()
        .map(|(contact_id, (contact_name, platform), message_count)| ContactStat {
            contact_id,
            contact_name,
            platform,
            message_count,
        })
        .collect();

    let channels = channels
        .top(top_n)
        .into_iter()
        .map(|(chat_id, (chat_name, platform), message_count)| ChannelStat {
            chat_id,
            chat_name,
            platform,
            message_count,
        })
        .collect();

    let daily: Vec<DailyStat> = daily
        .into_iter()
        .map(|(date, message_count)| DailyStat {
            weekday: date.format("%a").to_string(),
            date,
            message_count,
        })
        .collect();

    // First day reaching the maximum wins ties.
    let busiest_day = daily
        .iter()
        .fold(None::<&DailyStat>, |best, day| match best {
            Some(b) if b.message_count >= day.message_count => Some(b),
            _ => Some(day),
        })
        .cloned();

    DigestStats {
        total_messages: messages.len(),
        contacts,
        channels,
        daily,
        busiest_day,
        time_of_day,
    }
}

/// Insertion-ordered counter keeping the first-seen label for each key.
#[derive(Default)]
struct Counter {
    index: HashMap<String, usize>,
    entries: Vec<(String, (String, String), usize)>,
}

impl Counter {
    fn bump(&mut self, key: String, label: impl FnOnce() -> (String, String)) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].2 += 1,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, label(), 1));
            }
        }
    }

    /// Entries by descending count; equal counts keep first-seen order.
    fn top(mut self, n: usize) -> Vec<(String, (String, String), usize)> {
        self.entries.sort_by(|a, b| b.2.cmp(&a.2));
        self.entries.truncate(n);
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, Utc};

    fn msg(sender: &str, chat: &str, ts: &str) -> NormalizedMessage {
        NormalizedMessage {
            id: None,
            chat_id: chat.to_string(),
            chat_name: format!("chat {chat}"),
            platform: "WhatsApp".to_string(),
            sender_id: sender.to_string(),
            sender_name: sender.to_uppercase(),
            text: String::new(),
            attachments: Vec::new(),
            timestamp: DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc),
            is_from_self: false,
            is_unread: false,
        }
    }

    #[test]
    fn test_top_n_is_stable_on_ties() {
        // A(3) seen first, B(3) second, C(5): expected [C, A, B]
        let mut messages = Vec::new();
        for _ in 0..3 {
            messages.push(msg("a", "x", "2025-03-03T10:00:00Z"));
        }
        for _ in 0..3 {
            messages.push(msg("b", "x", "2025-03-03T10:00:00Z"));
        }
        for _ in 0..5 {
            messages.push(msg("c", "x", "2025-03-03T10:00:00Z"));
        }
        let stats = compute_stats_in(&messages, 5, &Utc);
        let names: Vec<_> = stats.contacts.iter().map(|c| c.contact_name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
        assert_eq!(stats.contacts[0].contact_id, "c:WhatsApp");
        assert_eq!(stats.total_messages, 11);
    }

    #[test]
    fn test_top_n_truncates() {
        let messages: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|s| msg(s, s, "2025-03-03T10:00:00Z"))
            .collect();
        let stats = compute_stats_in(&messages, 2, &Utc);
        assert_eq!(stats.contacts.len(), 2);
        assert_eq!(stats.channels.len(), 2);
        assert_eq!(stats.channels[0].chat_id, "a");
    }

    #[test]
    fn test_first_seen_names_kept() {
        let mut later = msg("a", "x", "2025-03-03T11:00:00Z");
        later.sender_name = "Renamed".to_string();
        later.chat_name = "Renamed chat".to_string();
        let messages = vec![msg("a", "x", "2025-03-03T10:00:00Z"), later];
        let stats = compute_stats_in(&messages, 5, &Utc);
        assert_eq!(stats.contacts[0].contact_name, "A");
        assert_eq!(stats.contacts[0].message_count, 2);
        assert_eq!(stats.channels[0].chat_name, "chat x");
    }

    #[test]
    fn test_daily_buckets_and_busiest_day() {
        let messages = vec![
            msg("a", "x", "2025-03-05T10:00:00Z"),
            msg("a", "x", "2025-03-03T10:00:00Z"),
            msg("a", "x", "2025-03-03T12:00:00Z"),
            msg("a", "x", "2025-03-05T12:00:00Z"),
            msg("a", "x", "2025-03-04T12:00:00Z"),
        ];
        let stats = compute_stats_in(&messages, 5, &Utc);
        let days: Vec<_> = stats
            .daily
            .iter()
            .map(|d| (d.date.to_string(), d.weekday.as_str(), d.message_count))
            .collect();
        assert_eq!(
            days,
            vec![
                ("2025-03-03".to_string(), "Mon", 2),
                ("2025-03-04".to_string(), "Tue", 1),
                ("2025-03-05".to_string(), "Wed", 2),
            ]
        );
        assert_eq!(stats.busiest_day.unwrap().date.to_string(), "2025-03-03");
    }

    #[test]
    fn test_time_of_day_uses_given_zone() {
        // 2025-03-07 is a Friday. 10:30 UTC is 19:30 at +09:00.
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let messages = vec![
            msg("a", "x", "2025-03-07T10:30:00Z"),
            // Friday 20:00 UTC is Saturday 05:00 in Tokyo
            msg("a", "x", "2025-03-07T20:00:00Z"),
        ];

        let utc = compute_stats_in(&messages, 5, &Utc);
        assert_eq!(utc.time_of_day, TimeOfDayStats { evening_count: 1, weekend_count: 0 });

        let local = compute_stats_in(&messages, 5, &tokyo);
        assert_eq!(local.time_of_day, TimeOfDayStats { evening_count: 1, weekend_count: 1 });
        assert_eq!(local.daily.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        let stats = compute_stats_in(&[], 5, &Utc);
        assert_eq!(stats, DigestStats::default());
    }
}
