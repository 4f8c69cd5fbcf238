//! Messages that probably need a reply.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::aggregate::NormalizedMessage;

/// Preview shown for messages without text.
pub const EMPTY_PREVIEW: &str = "(no text)";

/// An unread incoming message old enough to chase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowUp {
    pub chat_id: String,
    pub chat_name: String,
    pub sender_name: String,
    pub last_message_at: DateTime<Utc>,
    pub message_preview: String,
}

/// Select unread messages from others that are at least `min_age` old.
///
/// Oldest first, at most `limit` items.
pub fn detect_follow_ups(
    messages: &[NormalizedMessage],
    now: DateTime<Utc>,
    min_age: Duration,
    limit: usize,
) -> Vec<FollowUp> {
    let mut candidates: Vec<&NormalizedMessage> = messages
        .iter()
        .filter(|m| !m.is_from_self && m.is_unread && now - m.timestamp >= min_age)
        .collect();

    candidates.sort_by_key(|m| m.timestamp);

    candidates
        .into_iter()
        .take(limit)
        .map(|m| FollowUp {
            chat_id: m.chat_id.clone(),
            chat_name: m.chat_name.clone(),
            sender_name: m.sender_name.clone(),
            last_message_at: m.timestamp,
            message_preview: if m.text.is_empty() {
                EMPTY_PREVIEW.to_string()
            } else {
                m.text.clone()
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 20, 12, 0, 0).unwrap()
    }

    fn msg(age: Duration, unread: bool, from_self: bool, text: &str) -> NormalizedMessage {
        NormalizedMessage {
            id: None,
            chat_id: "c1".to_string(),
            chat_name: "Team".to_string(),
            platform: String::new(),
            sender_id: "u1".to_string(),
            sender_name: "Alice".to_string(),
            text: text.to_string(),
            attachments: Vec::new(),
            timestamp: now() - age,
            is_from_self: from_self,
            is_unread: unread,
        }
    }

    fn detect(messages: &[NormalizedMessage]) -> Vec<FollowUp> {
        detect_follow_ups(messages, now(), Duration::days(3), 10)
    }

    #[test]
    fn test_age_threshold() {
        let just_short = msg(Duration::days(3) - Duration::hours(1), true, false, "hi");
        let exactly = msg(Duration::days(3), true, false, "hi");
        assert!(detect(&[just_short]).is_empty());
        assert_eq!(detect(&[exactly]).len(), 1);
    }

    #[test]
    fn test_read_and_own_messages_excluded() {
        let read = msg(Duration::days(5), false, false, "hi");
        let own = msg(Duration::days(5), true, true, "hi");
        assert!(detect(&[read, own]).is_empty());
    }

    #[test]
    fn test_oldest_first_and_capped() {
        let messages: Vec<_> = (3..20)
            .map(|d| msg(Duration::days(d), true, false, &format!("day {d}")))
            .collect();
        let follow_ups = detect(&messages);
        assert_eq!(follow_ups.len(), 10);
        assert_eq!(follow_ups[0].message_preview, "day 19");
        assert!(follow_ups
            .windows(2)
            .all(|w| w[0].last_message_at <= w[1].last_message_at));
    }

    #[test]
    fn test_empty_text_preview() {
        let follow_ups = detect(&[msg(Duration::days(4), true, false, "")]);
        assert_eq!(follow_ups[0].message_preview, EMPTY_PREVIEW);
        assert_eq!(follow_ups[0].sender_name, "Alice");
    }
}
