//! Windowed message collection across conversations
//!
//! The aggregator lists conversations once, then pulls each conversation's
//! messages for the requested window and flattens them into
//! [`NormalizedMessage`] records.
//!
//! ```text
//! list_conversations ──► [chat 1, chat 2, ... chat N]
//!                              │
//!                              ▼  (at most `concurrency` fetches in flight)
//!                        list_messages(chat_i, dateAfter = window.start)
//!                              │
//!                  ┌───────────┴───────────┐
//!                  ▼                       ▼
//!        normalize + window filter   ConversationError
//! ```
//!
//! A failing conversation never aborts the pass. Only a failure to list
//! conversations is returned as an error.

mod normalize;

pub use normalize::{normalize_page, resolve_sender_name, AttachmentSummary, NormalizedMessage};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::api::ConversationSource;
use crate::config::DigestConfig;
use crate::error::Result;
use crate::period::Period;
use crate::types::{Chat, ChatDirection, ChatFilter, ChatType, MessageDirection, MessageQuery};

const DEFAULT_DAYS: i64 = 14;
const DEFAULT_CHAT_LIMIT: usize = 50;
const DEFAULT_MESSAGE_LIMIT: usize = 200;

/// What to fetch and how hard to hit the service.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// Window length when `start` is not given
    pub days: i64,
    /// Explicit window start
    pub start: Option<DateTime<Utc>>,
    /// Explicit window end (defaults to now)
    pub end: Option<DateTime<Utc>>,
    pub include_muted: bool,
    pub chat_limit: usize,
    pub message_limit_per_chat: usize,
    /// Drop group conversations before fetching messages
    pub exclude_groups: bool,
    /// Maximum message fetches in flight
    pub concurrency: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            days: DEFAULT_DAYS,
            start: None,
            end: None,
            include_muted: true,
            chat_limit: DEFAULT_CHAT_LIMIT,
            message_limit_per_chat: DEFAULT_MESSAGE_LIMIT,
            exclude_groups: false,
            concurrency: 1,
        }
    }
}

impl From<&DigestConfig> for FetchOptions {
    fn from(config: &DigestConfig) -> Self {
        Self {
            days: config.days,
            include_muted: config.include_muted,
            chat_limit: config.chat_limit,
            message_limit_per_chat: config.message_limit_per_chat,
            exclude_groups: config.exclude_groups,
            concurrency: config.concurrency,
            ..Default::default()
        }
    }
}

impl FetchOptions {
    /// Window to fetch, resolving defaults against `now`.
    ///
    /// Fails with [`crate::Error::InvalidWindow`] when `days` cannot be
    /// subtracted from the end instant.
    pub fn window(&self, now: DateTime<Utc>) -> Result<Period> {
        let end = self.end.unwrap_or(now);
        match self.start {
            Some(start) => Ok(Period::new(start, end)),
            None => Period::ending_at(end, self.days),
        }
    }
}

/// A conversation whose messages could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationError {
    pub chat_id: String,
    pub message: String,
}

/// Outcome of one aggregation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationFetchResult {
    /// Conversations considered, in listing order
    pub chats: Vec<Chat>,
    /// Window the messages were filtered to
    pub period: Period,
    /// Messages inside the window, grouped by conversation in listing order
    pub messages: Vec<NormalizedMessage>,
    pub errors: Vec<ConversationError>,
}

impl ConversationFetchResult {
    /// Number of conversations that produced messages without error.
    pub fn succeeded(&self) -> usize {
        self.chats.len() - self.errors.len()
    }
}

/// Collects windowed messages across conversations.
pub struct ConversationAggregator<'a, S: ?Sized> {
    source: &'a S,
    options: FetchOptions,
}

impl<'a, S: ConversationSource + ?Sized> ConversationAggregator<'a, S> {
    pub fn new(source: &'a S, options: FetchOptions) -> Self {
        Self { source, options }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Run a pass with the window ending now (or at the configured end).
    pub async fn fetch(&self) -> Result<ConversationFetchResult> {
        self.fetch_at(Utc::now()).await
    }

    /// Run a pass resolving the default window against `now`.
    pub async fn fetch_at(&self, now: DateTime<Utc>) -> Result<ConversationFetchResult> {
        let window = self.options.window(now)?;

        let filter = ChatFilter {
            include_muted: Some(self.options.include_muted),
            limit: Some(self.options.chat_limit),
            direction: Some(ChatDirection::Before),
            ..Default::default()
        };
        let listing = self.source.list_conversations(&filter).await?;

        let chats: Vec<Chat> = listing
            .items
            .into_iter()
            .filter(|chat| !(self.options.exclude_groups && chat.chat_type == ChatType::Group))
            .collect();

        tracing::info!(
            chats = chats.len(),
            start = %window.start,
            end = %window.end,
            concurrency = self.options.concurrency,
            "aggregating conversations"
        );

        let query = MessageQuery {
            direction: Some(MessageDirection::Backward),
            limit: Some(self.options.message_limit_per_chat),
            date_after: Some(window.start),
            ..Default::default()
        };

        let source = self.source;
        let query = &query;
        let fetched: Vec<_> = stream::iter(chats.iter())
            .map(|chat| async move { (chat, source.list_messages(&chat.id, query).await) })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut result = ConversationFetchResult {
            chats: Vec::new(),
            period: window,
            messages: Vec::new(),
            errors: Vec::new(),
        };

        for (chat, outcome) in fetched {
            match outcome {
                Ok(page) => {
                    let normalized = normalize_page(chat, &page, &window);
                    tracing::debug!(
                        chat_id = %chat.id,
                        fetched = page.messages.len(),
                        in_window = normalized.len(),
                        "conversation fetched"
                    );
                    result.messages.extend(normalized);
                }
                Err(e) => {
                    tracing::warn!(chat_id = %chat.id, error = %e, "conversation fetch failed");
                    result.errors.push(ConversationError {
                        chat_id: chat.id.clone(),
                        message: e.user_message(),
                    });
                }
            }
        }

        result.chats = chats;

        tracing::info!(
            messages = result.messages.len(),
            errors = result.errors.len(),
            "aggregation complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{ChatPage, Message, MessagePage, OutgoingMessage, SendReceipt};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    struct FakeSource {
        chats: Vec<Chat>,
        failing: Vec<&'static str>,
        filters: Mutex<Vec<ChatFilter>>,
        queries: Mutex<Vec<(String, MessageQuery)>>,
    }

    impl FakeSource {
        fn new(chats: Vec<Chat>, failing: Vec<&'static str>) -> Self {
            Self {
                chats,
                failing,
                filters: Mutex::new(Vec::new()),
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ConversationSource for FakeSource {
        async fn list_conversations(&self, filter: &ChatFilter) -> Result<ChatPage> {
            self.filters.lock().unwrap().push(filter.clone());
            Ok(ChatPage {
                items: self.chats.clone(),
                ..Default::default()
            })
        }

        async fn list_messages(&self, chat_id: &str, query: &MessageQuery) -> Result<MessagePage> {
            self.queries
                .lock()
                .unwrap()
                .push((chat_id.to_string(), query.clone()));
            if self.failing.iter().any(|id| *id == chat_id) {
                return Err(Error::Source(format!("{chat_id} unavailable")));
            }
            Ok(MessagePage {
                messages: vec![
                    Message {
                        id: Some(format!("{chat_id}-new")),
                        chat_id: chat_id.to_string(),
                        sender_id: "u1".to_string(),
                        timestamp: Some("2025-06-10T12:00:00Z".to_string()),
                        ..Default::default()
                    },
                    Message {
                        id: Some(format!("{chat_id}-old")),
                        chat_id: chat_id.to_string(),
                        sender_id: "u1".to_string(),
                        timestamp: Some("2025-01-01T00:00:00Z".to_string()),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            })
        }

        async fn send_message(&self, _: &str, _: &OutgoingMessage) -> Result<SendReceipt> {
            Err(Error::Source("read only".to_string()))
        }
    }

    fn chat(id: &str, chat_type: ChatType) -> Chat {
        Chat {
            id: id.to_string(),
            chat_type,
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 14, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let source = FakeSource::new(
            vec![
                chat("c1", ChatType::Single),
                chat("c2", ChatType::Single),
                chat("c3", ChatType::Single),
            ],
            vec!["c2"],
        );
        let aggregator = ConversationAggregator::new(&source, FetchOptions::default());
        let result = aggregator.fetch_at(now()).await.unwrap();

        let ids: Vec<_> = result.messages.iter().filter_map(|m| m.id.as_deref()).collect();
        assert_eq!(ids, vec!["c1-new", "c3-new"]);
        assert_eq!(
            result.errors,
            vec![ConversationError {
                chat_id: "c2".to_string(),
                message: "c2 unavailable".to_string(),
            }]
        );
        assert_eq!(result.succeeded(), 2);
        assert_eq!(result.period, Period::ending_at(now(), 14).unwrap());
    }

    #[tokio::test]
    async fn test_requests_carry_window_and_limits() {
        let source = FakeSource::new(vec![chat("c1", ChatType::Single)], vec![]);
        let options = FetchOptions {
            chat_limit: 25,
            message_limit_per_chat: 80,
            include_muted: false,
            ..Default::default()
        };
        ConversationAggregator::new(&source, options)
            .fetch_at(now())
            .await
            .unwrap();

        let filters = source.filters.lock().unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].limit, Some(25));
        assert_eq!(filters[0].include_muted, Some(false));
        assert_eq!(filters[0].direction, Some(ChatDirection::Before));

        let queries = source.queries.lock().unwrap();
        let (_, query) = &queries[0];
        assert_eq!(query.direction, Some(MessageDirection::Backward));
        assert_eq!(query.limit, Some(80));
        assert_eq!(query.date_after, Some(now() - Duration::days(14)));
    }

    #[tokio::test]
    async fn test_exclude_groups_and_concurrency_keep_order() {
        let source = FakeSource::new(
            vec![
                chat("c1", ChatType::Single),
                chat("g1", ChatType::Group),
                chat("c2", ChatType::Single),
                chat("c3", ChatType::Single),
            ],
            vec![],
        );
        let options = FetchOptions {
            exclude_groups: true,
            concurrency: 3,
            ..Default::default()
        };
        let result = ConversationAggregator::new(&source, options)
            .fetch_at(now())
            .await
            .unwrap();

        let chat_ids: Vec<_> = result.chats.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(chat_ids, vec!["c1", "c2", "c3"]);
        let message_chats: Vec<_> = result.messages.iter().map(|m| m.chat_id.as_str()).collect();
        assert_eq!(message_chats, vec!["c1", "c2", "c3"]);
        assert!(source.queries.lock().unwrap().iter().all(|(id, _)| id != "g1"));
    }

    #[test]
    fn test_explicit_window() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let options = FetchOptions {
            start: Some(start),
            end: Some(now()),
            ..Default::default()
        };
        let window = options.window(Utc::now()).unwrap();
        assert_eq!(window, Period::new(start, now()));
    }

    #[tokio::test]
    async fn test_out_of_range_days_fail_before_listing() {
        let source = FakeSource::new(vec![chat("c1", ChatType::Single)], vec![]);
        let options = FetchOptions {
            days: 10_000_000_000_000,
            ..Default::default()
        };
        assert!(matches!(
            options.window(now()),
            Err(Error::InvalidWindow(_))
        ));

        let aggregator = ConversationAggregator::new(&source, options);
        let result = aggregator.fetch_at(now()).await;
        assert!(matches!(result, Err(Error::InvalidWindow(_))));
        assert!(source.filters.lock().unwrap().is_empty());
        assert_eq!(aggregator.options().days, 10_000_000_000_000);
    }
}
