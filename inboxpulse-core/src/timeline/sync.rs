//! Fetch-driven timeline updates.
//!
//! [`TimelineSync`] owns a [`TimelineStore`] and a [`ConversationSource`].
//! Every load marks the conversation as loading, releases the store lock,
//! awaits the fetch, then installs the result. The lock is never held across
//! the fetch, and the loading flag keeps a second fetch for the same
//! conversation from starting.

use serde::Serialize;
use tokio::sync::Mutex;

use crate::api::ConversationSource;
use crate::error::{Error, Result};
use crate::types::{MessageQuery, OutgoingMessage, SendIntent, SendReceipt};

use super::store::{ExtendBlocked, Timeline, TimelineSnapshot, TimelineStore};

/// Result of a load request.
///
/// Only `Loaded` reflects a completed fetch. The other variants are
/// informational: nothing changed, and for all but `Failed` no request was
/// made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    Loaded { fetched: usize, total: usize, has_more: bool },
    AlreadyLoaded,
    AlreadyLoading,
    NoMoreHistory,
    NoCursor,
    /// The fetch failed; the previous content is still visible
    Failed { message: String },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }
}

impl From<ExtendBlocked> for LoadOutcome {
    fn from(blocked: ExtendBlocked) -> Self {
        match blocked {
            ExtendBlocked::Loading => LoadOutcome::AlreadyLoading,
            ExtendBlocked::NoMoreHistory => LoadOutcome::NoMoreHistory,
            ExtendBlocked::NoCursor => LoadOutcome::NoCursor,
        }
    }
}

/// Result of a send request.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Text was empty after trimming; nothing was sent
    EmptyText,
    Sent {
        receipt: SendReceipt,
        refresh: LoadOutcome,
    },
}

/// Timeline store driven by a conversation source.
pub struct TimelineSync<S> {
    source: S,
    store: Mutex<TimelineStore>,
    page_size: usize,
}

impl<S: ConversationSource> TimelineSync<S> {
    pub fn new(source: S, page_size: usize) -> Self {
        Self {
            source,
            store: Mutex::new(TimelineStore::new()),
            page_size: page_size.max(1),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Load the most recent page of a conversation.
    ///
    /// Without `force`, a conversation that already shows messages is left
    /// alone. With `force`, the visible set is replaced by the fresh page.
    pub async fn load_recent(&self, chat_id: &str, force: bool) -> LoadOutcome {
        let previous = {
            let mut store = self.store.lock().await;
            let current = store.current(chat_id);
            if current.is_loading() {
                return LoadOutcome::AlreadyLoading;
            }
            if !force && !current.is_empty() {
                return LoadOutcome::AlreadyLoaded;
            }
            store.set(chat_id, current.with_loading(true));
            current
        };

        tracing::debug!(chat_id, force, page_size = self.page_size, "loading recent messages");

        let query = MessageQuery::latest(self.page_size);
        match self.source.list_messages(chat_id, &query).await {
            Ok(page) => {
                let mut store = self.store.lock().await;
                let timeline = store.replace_with(chat_id, &page);
                Self::loaded(page.messages.len(), timeline)
            }
            Err(e) => self.restore(chat_id, previous, e).await,
        }
    }

    /// Load the page just older than what is visible and merge it in.
    pub async fn load_older(&self, chat_id: &str) -> LoadOutcome {
        let (previous, cursor) = {
            let mut store = self.store.lock().await;
            let current = store.current(chat_id);
            let cursor = match current.extend_cursor() {
                Ok(cursor) => cursor.to_string(),
                Err(blocked) => {
                    tracing::debug!(chat_id, ?blocked, "not loading older messages");
                    return blocked.into();
                }
            };
            store.set(chat_id, current.with_loading(true));
            (current, cursor)
        };

        tracing::debug!(chat_id, %cursor, "loading older messages");

        let query = MessageQuery::older_than(cursor, self.page_size);
        match self.source.list_messages(chat_id, &query).await {
            Ok(page) => {
                let mut store = self.store.lock().await;
                let timeline = store.extend_older(chat_id, &page);
                Self::loaded(page.messages.len(), timeline)
            }
            Err(e) => self.restore(chat_id, previous, e).await,
        }
    }

    /// Send a message, then force-reload the conversation.
    ///
    /// Send failures are returned as errors. A failed refresh after a
    /// successful send is reported in [`SendOutcome::Sent::refresh`].
    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SendOutcome::EmptyText);
        }

        let message = OutgoingMessage {
            text: text.to_string(),
            reply_to_message_id: reply_to.map(str::to_string),
            intent: SendIntent::Outgoing,
        };
        let receipt = self.source.send_message(chat_id, &message).await?;
        tracing::info!(chat_id, pending_id = %receipt.pending_message_id, "message sent");

        let refresh = self.load_recent(chat_id, true).await;
        Ok(SendOutcome::Sent { receipt, refresh })
    }

    /// Current view of a conversation (empty if never loaded).
    pub async fn snapshot(&self, chat_id: &str) -> TimelineSnapshot {
        self.store.lock().await.current(chat_id).snapshot()
    }

    /// Display name for a sender, as learned from loaded pages.
    pub async fn sender_name(&self, chat_id: &str, sender_id: &str) -> Option<String> {
        let store = self.store.lock().await;
        store
            .get(chat_id)
            .and_then(|timeline| timeline.sender_name(sender_id))
            .map(str::to_string)
    }

    fn loaded(fetched: usize, timeline: &Timeline) -> LoadOutcome {
        LoadOutcome::Loaded {
            fetched,
            total: timeline.messages().len(),
            has_more: timeline.has_more(),
        }
    }

    async fn restore(&self, chat_id: &str, previous: Timeline, error: Error) -> LoadOutcome {
        tracing::warn!(chat_id, error = %error, "timeline fetch failed");
        self.store.lock().await.set(chat_id, previous.with_loading(false));
        LoadOutcome::Failed {
            message: error.user_message(),
        }
    }
}
