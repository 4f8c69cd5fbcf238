//! inboxpulse - timelines, unread summaries and activity digests
//!
//! Talks to the local chat-aggregator API configured in
//! `~/.config/inboxpulse/config.toml`. `BEEPER_AUTH_TOKEN` overrides the
//! configured API token.
//!
//! Commands:
//! - `digest`: compare this period's activity with the previous one
//! - `unread`: summarize conversations with unread messages
//! - `timeline`: print a conversation, optionally paging back
//! - `send`: send a message and show the refreshed conversation
//! - `chats`: list direct conversations by recent activity
//! - `check`: verify the service is reachable

mod conversations;
mod digest;
mod unread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inboxpulse_core::{BeeperClient, Config};

#[derive(Parser)]
#[command(name = "inboxpulse")]
#[command(about = "Timelines and activity digests for your chat inbox")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare recent activity with the period before it
    Digest {
        /// Days of history to fetch (default: from config)
        #[arg(long)]
        days: Option<i64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Leave group conversations out
        #[arg(long)]
        exclude_groups: bool,

        /// Ask the configured LLM for a written report
        #[arg(long)]
        report: bool,
    },

    /// Summarize conversations with unread messages
    Unread {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Maximum conversations to summarize
        #[arg(long, default_value_t = 5)]
        max_chats: usize,
    },

    /// Show a conversation's messages
    Timeline {
        /// Conversation id
        chat_id: String,

        /// Older pages to load after the most recent one
        #[arg(long, default_value_t = 0)]
        older: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send a message to a conversation
    Send {
        /// Conversation id
        chat_id: String,

        /// Message text
        text: String,

        /// Message id to reply to
        #[arg(long)]
        reply_to: Option<String>,
    },

    /// List direct conversations, most recently active first
    Chats {
        /// Maximum conversations to request
        #[arg(long, default_value_t = 50)]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the service is reachable
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = inboxpulse_core::logging::init(&config.logging).ok();

    let client = BeeperClient::new(&config.api).context("failed to create API client")?;

    match args.command {
        Command::Digest {
            days,
            json,
            exclude_groups,
            report,
        } => {
            let opts = digest::DigestArgs {
                days,
                json,
                exclude_groups,
                report,
            };
            digest::cmd_digest(&client, &config, &opts).await
        }
        Command::Unread { json, max_chats } => {
            unread::cmd_unread(&client, &config, max_chats, json).await
        }
        Command::Timeline {
            chat_id,
            older,
            json,
        } => conversations::cmd_timeline(client, &config, &chat_id, older, json).await,
        Command::Send {
            chat_id,
            text,
            reply_to,
        } => conversations::cmd_send(client, &config, &chat_id, &text, reply_to.as_deref()).await,
        Command::Chats { limit, json } => conversations::cmd_chats(&client, limit, json).await,
        Command::Check => cmd_check(&client, &config).await,
    }
}

async fn cmd_check(client: &BeeperClient, config: &Config) -> Result<()> {
    println!("Service: {}", config.api.base_url);
    println!(
        "Token:   {}",
        if config.api.token().is_some() {
            "configured"
        } else {
            "missing"
        }
    );

    match client.check_connection().await {
        Ok(()) => {
            println!("Status:  reachable");
            Ok(())
        }
        Err(e) => {
            println!("Status:  {}", e.user_message());
            Err(e).context("connection check failed")
        }
    }
}
