//! `inboxpulse unread`: LLM summaries of unread conversations.

use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use inboxpulse_core::llm::LlmSummarizer;
use inboxpulse_core::summary::{summarize_unread, UnreadOptions, UnreadSummary};
use inboxpulse_core::{BeeperClient, Config};

use crate::digest::truncate;

pub async fn cmd_unread(
    client: &BeeperClient,
    config: &Config,
    max_chats: usize,
    json: bool,
) -> Result<()> {
    let llm = config
        .llm
        .as_ref()
        .context("unread summaries need an [llm] section in the config")?;
    let summarizer = LlmSummarizer::new(llm).context("failed to create LLM client")?;

    let options = UnreadOptions {
        max_chats,
        ..Default::default()
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message("Summarizing unread conversations...");

    let summaries = summarize_unread(client, &summarizer, &options).await;
    spinner.finish_and_clear();
    let summaries = summaries.context("failed to list unread conversations")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print_terminal(&summaries);
    }
    Ok(())
}

fn print_terminal(summaries: &[UnreadSummary]) {
    if summaries.is_empty() {
        println!("No unread conversations.");
        return;
    }

    for item in summaries {
        let network = item.chat.network.as_deref().unwrap_or("unknown");
        println!();
        println!(
            "{} [{}]  {} unread, {} fetched",
            item.chat.display_title(),
            network,
            item.chat.unread_count,
            item.message_count
        );

        if let Some(error) = &item.error {
            println!("   error: {error}");
            continue;
        }
        let Some(summary) = &item.summary else {
            continue;
        };

        println!("   {}", summary.summary);
        if !summary.highlights.is_empty() {
            println!("   Highlights:");
            for highlight in &summary.highlights {
                println!("     - {highlight}");
            }
        }
        if !summary.next_actions.is_empty() {
            println!("   Next actions:");
            for action in &summary.next_actions {
                println!("     - {action}");
            }
        }
        for snippet in &summary.snippets {
            println!(
                "     > {}: \"{}\"",
                snippet.sender,
                truncate(&snippet.text, 60)
            );
        }
    }
    println!();
}
