//! # inboxpulse-core
//!
//! Core library for inboxpulse - timelines and activity digests over a
//! local chat-aggregator API.
//!
//! This library provides:
//! - Domain types for conversations, messages and pages
//! - Per-conversation timelines with cursor-based paging and merge
//! - Windowed aggregation of messages across conversations
//! - Period digests (rankings, daily activity, deltas, follow-ups)
//! - Unread conversation summaries through an LLM
//! - Configuration and logging
//!
//! ## Architecture
//!
//! Two flows share the same [`api::ConversationSource`]:
//! - **Timeline:** [`timeline::TimelineSync`] loads recent and older pages on
//!   request and keeps each conversation's messages ordered and deduplicated.
//! - **Digest:** [`aggregate::ConversationAggregator`] collects a window of
//!   normalized messages, then [`digest::build_digest`] splits it into the
//!   current and previous period and compares them.
//!
//! ## Example
//!
//! ```rust,no_run
//! use inboxpulse_core::{BeeperClient, Config, ConversationAggregator, FetchOptions};
//! use inboxpulse_core::digest::{build_digest, DigestOptions};
//!
//! # async fn run() -> inboxpulse_core::Result<()> {
//! let config = Config::load()?;
//! let client = BeeperClient::new(&config.api)?;
//!
//! let result = ConversationAggregator::new(&client, FetchOptions::from(&config.digest))
//!     .fetch()
//!     .await?;
//! let digest = build_digest(
//!     &result.period,
//!     &result.messages,
//!     &DigestOptions::from(&config.digest),
//!     chrono::Utc::now(),
//! )?;
//! println!("{} messages this period", digest.current_stats.total_messages);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use aggregate::{ConversationAggregator, ConversationFetchResult, FetchOptions, NormalizedMessage};
pub use api::{BeeperClient, ConversationSource, Summarizer};
pub use config::Config;
pub use digest::Digest;
pub use error::{Error, Result};
pub use period::Period;
pub use timeline::{LoadOutcome, SendOutcome, TimelineSync};
pub use types::*;

// Public modules
pub mod aggregate;
pub mod api;
pub mod config;
pub mod digest;
pub mod error;
pub mod llm;
pub mod logging;
pub mod period;
pub mod summary;
pub mod timeline;
pub mod types;
