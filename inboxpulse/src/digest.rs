//! `inboxpulse digest`: fetch a window of activity and compare periods.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use inboxpulse_core::digest::{
    build_digest, build_report_prompt, stats_summary, Digest, DigestOptions,
};
use inboxpulse_core::llm::LlmSummarizer;
use inboxpulse_core::period::MAX_DAYS;
use inboxpulse_core::{
    BeeperClient, Config, ConversationAggregator, ConversationFetchResult, FetchOptions,
    Summarizer,
};

pub struct DigestArgs {
    pub days: Option<i64>,
    pub json: bool,
    pub exclude_groups: bool,
    pub report: bool,
}

pub async fn cmd_digest(client: &BeeperClient, config: &Config, args: &DigestArgs) -> Result<()> {
    let mut fetch_options = FetchOptions::from(&config.digest);
    if let Some(days) = args.days {
        fetch_options.days = days;
    }
    if args.exclude_groups {
        fetch_options.exclude_groups = true;
    }
    let digest_options = DigestOptions::from(&config.digest);

    check_days(fetch_options.days, digest_options.period_days)?;

    // The report needs an LLM; fail before spending time on the fetch
    let summarizer = if args.report {
        let llm = config
            .llm
            .as_ref()
            .context("--report needs an [llm] section in the config")?;
        Some(LlmSummarizer::new(llm).context("failed to create LLM client")?)
    } else {
        None
    };

    let aggregator = ConversationAggregator::new(client, fetch_options);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!(
        "Fetching the last {} days of messages...",
        aggregator.options().days
    ));

    let fetched = aggregator.fetch().await;
    spinner.finish_and_clear();
    let result = fetched.context("failed to list conversations")?;

    for failure in &result.errors {
        eprintln!("warning: skipped {}: {}", failure.chat_id, failure.message);
    }

    let now = Utc::now();
    let digest = build_digest(&result.period, &result.messages, &digest_options, now)
        .context("failed to build digest")?;

    if let Some(summarizer) = summarizer {
        println!("{}", stats_summary(&digest));
        println!();
        let prompt = build_report_prompt(&digest, &result.messages);
        let report = summarizer
            .summarize(&prompt)
            .await
            .context("report generation failed")?;
        println!("{}", report.trim());
        return Ok(());
    }

    if args.json {
        print_json(&digest, &result)?;
    } else {
        print_terminal(&digest, &result);
    }
    Ok(())
}

/// Reject a window that cannot hold two periods or exceeds [`MAX_DAYS`].
fn check_days(days: i64, period_days: i64) -> Result<()> {
    if days > MAX_DAYS {
        anyhow::bail!("--days must be at most {MAX_DAYS}");
    }
    let needed = period_days.saturating_mul(2);
    if days < needed {
        anyhow::bail!(
            "--days must be at least {needed} to compare two {period_days}-day periods"
        );
    }
    Ok(())
}

fn print_json(digest: &Digest, result: &ConversationFetchResult) -> Result<()> {
    let output = serde_json::json!({
        "window": result.period,
        "chats": result.chats.len(),
        "messages": result.messages.len(),
        "errors": result.errors,
        "digest": digest,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_terminal(digest: &Digest, result: &ConversationFetchResult) {
    let current = &digest.current_period;
    let previous = &digest.previous_period;

    println!();
    println!(
        "INBOX DIGEST  {} to {}",
        current.start.with_timezone(&Local).format("%b %d"),
        current.end.with_timezone(&Local).format("%b %d")
    );
    println!(
        "   {} conversations, {} messages in the window",
        result.chats.len(),
        result.messages.len()
    );
    println!();

    let stats = &digest.current_stats;
    if stats.total_messages == 0 {
        println!("  No messages found for this period.");
        println!();
        return;
    }

    println!("SUMMARY");
    println!(
        "   Messages: {:<10} Previous: {:<10} Change: {}",
        stats.total_messages,
        digest.previous_stats.total_messages,
        signed_change(
            digest.comparison.message_delta,
            Some(digest.comparison.message_delta_percentage)
        )
    );
    println!(
        "   Evenings: {:<10} Weekends: {:<10}",
        stats.time_of_day.evening_count, stats.time_of_day.weekend_count
    );
    println!(
        "   Evening change: {}   Weekend change: {}",
        signed_change(digest.comparison.evening_delta, None),
        signed_change(digest.comparison.weekend_delta, None)
    );
    println!(
        "   Previous period: {} to {}",
        previous.start.with_timezone(&Local).format("%b %d"),
        previous.end.with_timezone(&Local).format("%b %d")
    );
    println!();

    if !stats.contacts.is_empty() {
        println!("TOP CONTACTS");
        for (i, contact) in stats.contacts.iter().enumerate() {
            println!(
                "   {}. {:<24} {:<12} {:>5}",
                i + 1,
                truncate(&contact.contact_name, 24),
                contact.platform,
                contact.message_count
            );
        }
        println!();
    }

    if !stats.channels.is_empty() {
        println!("TOP CONVERSATIONS");
        for (i, channel) in stats.channels.iter().enumerate() {
            println!(
                "   {}. {:<24} {:<12} {:>5}",
                i + 1,
                truncate(&channel.chat_name, 24),
                channel.platform,
                channel.message_count
            );
        }
        println!();
    }

    if !stats.daily.is_empty() {
        println!("DAILY ACTIVITY");
        let max = stats
            .daily
            .iter()
            .map(|d| d.message_count)
            .max()
            .unwrap_or(1)
            .max(1);
        for day in &stats.daily {
            let width = day.message_count * 30 / max;
            println!(
                "   {} {} {:<30} {}",
                day.weekday,
                day.date.format("%m-%d"),
                "#".repeat(width),
                day.message_count
            );
        }
        if let Some(busiest) = &stats.busiest_day {
            println!(
                "   Busiest: {} {} ({} messages)",
                busiest.weekday, busiest.date, busiest.message_count
            );
        }
        println!();
    }

    if !digest.follow_ups.is_empty() {
        println!("WAITING ON YOU");
        for follow_up in &digest.follow_ups {
            println!(
                "   {:<20} {:<16} {}  \"{}\"",
                truncate(&follow_up.chat_name, 20),
                truncate(&follow_up.sender_name, 16),
                follow_up
                    .last_message_at
                    .with_timezone(&Local)
                    .format("%b %d %H:%M"),
                truncate(&follow_up.message_preview, 40)
            );
        }
        println!();
    }
}

fn signed_change(delta: i64, percentage: Option<i64>) -> String {
    match percentage {
        Some(pct) => format!("{delta:+} ({pct:+}%)"),
        None => format!("{delta:+}"),
    }
}

/// Cut `text` to at most `max` characters, marking the cut with "...".
pub fn truncate(text: &str, max: usize) -> String {
    let text = text.replace('\n', " ");
    if text.chars().count() <= max {
        return text;
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
