//! `inboxpulse timeline`, `send` and `chats`.

use anyhow::{Context, Result};
use chrono::Local;
use inboxpulse_core::api::list_direct_conversations;
use inboxpulse_core::summary::message_body;
use inboxpulse_core::timeline::TimelineSnapshot;
use inboxpulse_core::{BeeperClient, Config, LoadOutcome, Message, SendOutcome, TimelineSync};

use crate::digest::truncate;

pub async fn cmd_timeline(
    client: BeeperClient,
    config: &Config,
    chat_id: &str,
    older: usize,
    json: bool,
) -> Result<()> {
    let sync = TimelineSync::new(client, config.timeline.page_size);

    if let LoadOutcome::Failed { message } = sync.load_recent(chat_id, false).await {
        anyhow::bail!("failed to load {chat_id}: {message}");
    }

    for page in 0..older {
        match sync.load_older(chat_id).await {
            LoadOutcome::Loaded { fetched, .. } => {
                tracing::debug!(chat_id, page = page + 1, fetched, "loaded older page");
            }
            LoadOutcome::Failed { message } => {
                eprintln!("warning: older history unavailable: {message}");
                break;
            }
            other => {
                eprintln!("note: {}", older_note(&other));
                break;
            }
        }
    }

    let snapshot = sync.snapshot(chat_id).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_timeline(&sync, chat_id, &snapshot).await;
    }
    Ok(())
}

pub async fn cmd_send(
    client: BeeperClient,
    config: &Config,
    chat_id: &str,
    text: &str,
    reply_to: Option<&str>,
) -> Result<()> {
    let sync = TimelineSync::new(client, config.timeline.page_size);

    let outcome = sync
        .send_message(chat_id, text, reply_to)
        .await
        .with_context(|| format!("failed to send to {chat_id}"))?;

    match outcome {
        SendOutcome::EmptyText => {
            anyhow::bail!("message text is empty");
        }
        SendOutcome::Sent { receipt, refresh } => {
            println!("Sent (pending id {})", receipt.pending_message_id);
            match refresh {
                LoadOutcome::Failed { message } => {
                    eprintln!("warning: could not refresh conversation: {message}");
                }
                _ => {
                    let snapshot = sync.snapshot(chat_id).await;
                    print_timeline(&sync, chat_id, &snapshot).await;
                }
            }
        }
    }
    Ok(())
}

pub async fn cmd_chats(client: &BeeperClient, limit: usize, json: bool) -> Result<()> {
    let chats = list_direct_conversations(client, limit)
        .await
        .context("failed to list conversations")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chats)?);
        return Ok(());
    }

    if chats.is_empty() {
        println!("No direct conversations.");
        return Ok(());
    }

    println!(
        "{:<28} {:<12} {:>6}  {:<16}  ID",
        "CONVERSATION", "NETWORK", "UNREAD", "LAST ACTIVITY"
    );
    for chat in &chats {
        let last = chat
            .last_activity_at()
            .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<28} {:<12} {:>6}  {:<16}  {}",
            truncate(chat.display_title(), 28),
            chat.network.as_deref().unwrap_or("-"),
            chat.unread_count,
            last,
            chat.id
        );
    }
    Ok(())
}

async fn print_timeline(
    sync: &TimelineSync<BeeperClient>,
    chat_id: &str,
    snapshot: &TimelineSnapshot,
) {
    if snapshot.messages.is_empty() {
        println!("No messages.");
        return;
    }
    if snapshot.has_more {
        println!("(older messages available, use --older N)");
    }
    for message in &snapshot.messages {
        let sender = sender_label(sync, chat_id, message).await;
        println!("{} {}: {}", time_label(message), sender, message_body(message));
    }
}

async fn sender_label(
    sync: &TimelineSync<BeeperClient>,
    chat_id: &str,
    message: &Message,
) -> String {
    if message.is_sender {
        return "you".to_string();
    }
    if let Some(name) = message.sender_name.as_deref().filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    sync.sender_name(chat_id, &message.sender_id)
        .await
        .unwrap_or_else(|| message.sender_id.clone())
}

/// Why paging back stopped, for outcomes that made no request.
fn older_note(outcome: &LoadOutcome) -> &'static str {
    match outcome {
        LoadOutcome::NoMoreHistory => "no older messages to load",
        LoadOutcome::NoCursor => "no cursor to page back from yet",
        LoadOutcome::AlreadyLoading => "an older page is already loading",
        _ => "nothing further to load",
    }
}

fn time_label(message: &Message) -> String {
    match message.timestamp_at() {
        Some(at) => at.with_timezone(&Local).format("[%Y-%m-%d %H:%M]").to_string(),
        None => "[unknown time]".to_string(),
    }
}
