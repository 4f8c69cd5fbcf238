//! In-memory conversation source backed by a JSON fixture.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use inboxpulse_core::timeline::{derive_sort_key, SortKey};
use inboxpulse_core::{
    Chat, ChatFilter, ChatPage, ConversationSource, Error, Message, MessagePage, MessageQuery,
    OutgoingMessage, Result, SendReceipt, UserSummary,
};
use serde::Deserialize;

#[derive(Deserialize)]
struct Fixture {
    chats: Vec<Chat>,
    messages: HashMap<String, Vec<Message>>,
    #[serde(default)]
    users: HashMap<String, HashMap<String, UserSummary>>,
    #[serde(default)]
    failing: Vec<String>,
}

/// Serves conversations from a fixture file.
///
/// Message pages run newest first. A cursor is the sort key of the oldest
/// message of the previous page and is inclusive, so consecutive pages
/// overlap by one message the way the real service can.
pub struct FixtureSource {
    fixture: Mutex<Fixture>,
    pub message_requests: Mutex<Vec<(String, MessageQuery)>>,
    pub chat_requests: Mutex<Vec<ChatFilter>>,
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

impl FixtureSource {
    pub fn load(name: &str) -> Self {
        let raw = std::fs::read_to_string(fixture_path(name)).unwrap();
        let fixture: Fixture = serde_json::from_str(&raw).unwrap();
        Self {
            fixture: Mutex::new(fixture),
            message_requests: Mutex::new(Vec::new()),
            chat_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn message_request_count(&self) -> usize {
        self.message_requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ConversationSource for FixtureSource {
    async fn list_conversations(&self, filter: &ChatFilter) -> Result<ChatPage> {
        self.chat_requests.lock().unwrap().push(filter.clone());
        let fixture = self.fixture.lock().unwrap();
        let mut items: Vec<Chat> = fixture
            .chats
            .iter()
            .filter(|chat| !filter.unread_only || chat.unread_count > 0)
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            items.truncate(limit);
        }
        Ok(ChatPage {
            items,
            ..Default::default()
        })
    }

    async fn list_messages(&self, chat_id: &str, query: &MessageQuery) -> Result<MessagePage> {
        self.message_requests
            .lock()
            .unwrap()
            .push((chat_id.to_string(), query.clone()));

        let fixture = self.fixture.lock().unwrap();
        if fixture.failing.iter().any(|id| id == chat_id) {
            return Err(Error::Api {
                status: 500,
                status_text: "Internal Server Error".to_string(),
                details: None,
            });
        }

        let mut messages: Vec<Message> = fixture
            .messages
            .get(chat_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|m| match (query.date_after, m.timestamp_at()) {
                (Some(after), Some(at)) => at >= after,
                _ => true,
            })
            .collect();
        messages.sort_by_key(|m| std::cmp::Reverse(SortKey::of(m)));

        if let Some(cursor) = &query.cursor {
            let cursor = SortKey::parse(cursor);
            messages.retain(|m| SortKey::of(m) <= cursor);
        }

        let limit = query.limit.unwrap_or(messages.len());
        let has_more = messages.len() > limit;
        messages.truncate(limit);

        Ok(MessagePage {
            oldest_cursor: messages.last().map(derive_sort_key),
            messages,
            has_more,
            users: fixture.users.get(chat_id).cloned().unwrap_or_default(),
            ..Default::default()
        })
    }

    async fn send_message(&self, chat_id: &str, message: &OutgoingMessage) -> Result<SendReceipt> {
        let mut fixture = self.fixture.lock().unwrap();
        let thread = fixture.messages.entry(chat_id.to_string()).or_default();
        let next_key = thread
            .iter()
            .map(SortKey::of)
            .max()
            .map(|key| match key {
                SortKey::Numeric(digits) => digits.parse::<u64>().unwrap() + 1,
                SortKey::Text(_) => 1,
            })
            .unwrap_or(1);
        let id = format!("sent-{next_key}");
        thread.push(Message {
            id: Some(id.clone()),
            chat_id: chat_id.to_string(),
            sender_id: "me".to_string(),
            sort_key: Some(serde_json::json!(next_key.to_string())),
            timestamp: Some("2025-06-15T00:00:00Z".to_string()),
            text: Some(message.text.clone()),
            is_sender: true,
            ..Default::default()
        });
        Ok(SendReceipt {
            chat_id: chat_id.to_string(),
            pending_message_id: id,
            message: None,
        })
    }
}
