//! Text renderings of a digest: a plain summary and an LLM report prompt.

use std::fmt::Write;

use serde::Serialize;
use serde_json::json;

use crate::aggregate::NormalizedMessage;

use super::Digest;

/// Most recent messages included as samples in the report prompt.
pub const SAMPLE_MESSAGES: usize = 40;

#[derive(Serialize)]
struct SampleMessage<'a> {
    chat: &'a str,
    sender: &'a str,
    text: &'a str,
    timestamp: String,
}

/// Prompt asking a summarizer for a Markdown report of `digest`.
///
/// The most recent messages are attached as samples so the report can name
/// topics, not just numbers.
pub fn build_report_prompt(digest: &Digest, messages: &[NormalizedMessage]) -> String {
    let mut recent: Vec<&NormalizedMessage> = messages.iter().collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let samples: Vec<SampleMessage> = recent
        .into_iter()
        .take(SAMPLE_MESSAGES)
        .map(|m| SampleMessage {
            chat: &m.chat_name,
            sender: &m.sender_name,
            text: &m.text,
            timestamp: m.timestamp.to_rfc3339(),
        })
        .collect();

    let payload = json!({
        "period": {
            "start": digest.current_period.start.to_rfc3339(),
            "end": digest.current_period.end.to_rfc3339(),
            "previousStart": digest.previous_period.start.to_rfc3339(),
            "previousEnd": digest.previous_period.end.to_rfc3339(),
        },
        "stats": digest.current_stats,
        "previousStats": digest.previous_stats,
        "comparison": digest.comparison,
        "followUps": digest.follow_ups,
        "sampleMessages": samples,
    });
    let data = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());

    [
        "You are writing a periodic digest of the user's chat conversations.",
        "Use the stats below to produce a concise, actionable report.",
        "Suggested sections:",
        "- Overview (total messages, change from the previous period)",
        "- Highlights (topics and outcomes)",
        "- Open issues and follow-ups",
        "- Communication patterns (evenings, weekends)",
        "Return the report as Markdown.",
        "Data:",
        data.as_str(),
    ]
    .join("\n")
}

/// Short plain-text summary of the current period.
pub fn stats_summary(digest: &Digest) -> String {
    let mut out = String::new();
    let stats = &digest.current_stats;
    let comparison = &digest.comparison;

    let _ = writeln!(
        out,
        "Period: {} - {}",
        digest.current_period.start.format("%Y-%m-%d"),
        digest.current_period.end.format("%Y-%m-%d")
    );
    let _ = writeln!(out, "Total messages: {}", stats.total_messages);
    let _ = writeln!(
        out,
        "Change from previous period: {:+} ({:+}%)",
        comparison.message_delta, comparison.message_delta_percentage
    );

    let _ = writeln!(out, "\nTop contacts:");
    for contact in &stats.contacts {
        let _ = writeln!(out, "- {}: {}", contact.contact_name, contact.message_count);
    }

    let _ = writeln!(out, "\nActive conversations:");
    for channel in &stats.channels {
        let _ = writeln!(out, "- {}: {}", channel.chat_name, channel.message_count);
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::{build_digest_in, DigestOptions};
    use crate::period::Period;
    use chrono::{Duration, TimeZone, Utc};

    fn sample_digest(messages: &[NormalizedMessage]) -> Digest {
        let end = Utc.with_ymd_and_hms(2025, 2, 15, 0, 0, 0).unwrap();
        let window = Period::ending_at(end, 14).unwrap();
        build_digest_in(&window, messages, &DigestOptions::default(), end, &Utc).unwrap()
    }

    fn msg(minutes_before_end: i64, text: &str) -> NormalizedMessage {
        let end = Utc.with_ymd_and_hms(2025, 2, 15, 0, 0, 0).unwrap();
        NormalizedMessage {
            id: None,
            chat_id: "c1".to_string(),
            chat_name: "Family".to_string(),
            platform: "iMessage".to_string(),
            sender_id: "u1".to_string(),
            sender_name: "Mom".to_string(),
            text: text.to_string(),
            attachments: Vec::new(),
            timestamp: end - Duration::minutes(minutes_before_end),
            is_from_self: false,
            is_unread: false,
        }
    }

    #[test]
    fn test_summary_lists_rankings() {
        let messages = vec![msg(10, "dinner?"), msg(5, "7pm")];
        let summary = stats_summary(&sample_digest(&messages));
        assert!(summary.starts_with("Period: 2025-02-08 - 2025-02-15"));
        assert!(summary.contains("Total messages: 2"));
        assert!(summary.contains("Change from previous period: +2 (+200%)"));
        assert!(summary.contains("- Mom: 2"));
        assert!(summary.contains("- Family: 2"));
    }

    #[test]
    fn test_prompt_samples_newest_first_and_capped() {
        let messages: Vec<_> = (0..50).map(|i| msg(i, &format!("m{i}"))).collect();
        let prompt = build_report_prompt(&sample_digest(&messages), &messages);

        let data = prompt.split_once("Data:\n").unwrap().1;
        let payload: serde_json::Value = serde_json::from_str(data).unwrap();
        let samples = payload["sampleMessages"].as_array().unwrap();
        assert_eq!(samples.len(), SAMPLE_MESSAGES);
        assert_eq!(samples[0]["text"], "m0");
        assert_eq!(payload["stats"]["total_messages"], 50);
    }
}
