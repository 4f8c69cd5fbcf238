//! Core domain types for inboxpulse
//!
//! These types mirror the wire model of the conversation service (chats,
//! messages, users) plus the request/response envelopes exchanged with it.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Conversation** | A chat on some network (called `chat` on the wire) |
//! | **Network** | The platform a conversation lives on (WhatsApp, Signal, ...) |
//! | **Sort key** | Server-assigned ordering token for a message |
//! | **Cursor** | Opaque pagination token marking a page boundary |
//! | **Self** | The account owner; messages flagged `isSender` are from self |

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================
// Users
// ============================================

/// A user as described by the conversation service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub is_self: bool,
}

impl UserSummary {
    /// Best available human-facing name: full name, username, phone, email, id.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.username.as_deref())
            .or(self.phone_number.as_deref())
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

// ============================================
// Conversations
// ============================================

/// Kind of conversation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    /// One-to-one direct message
    #[default]
    Single,
    /// Multi-party conversation
    Group,
    #[serde(other)]
    Unknown,
}

/// Participant list attached to a conversation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participants {
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub items: Vec<UserSummary>,
    #[serde(default)]
    pub total: u64,
}

/// A conversation (chat) on one network
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    #[serde(rename = "accountID", default)]
    pub account_id: String,
    /// Platform label (e.g., "WhatsApp")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default)]
    pub participants: Participants,
    #[serde(rename = "type", default)]
    pub chat_type: ChatType,
    #[serde(default)]
    pub unread_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub is_muted: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_pinned: bool,
    /// ISO-8601 timestamp of the most recent activity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
}

impl Chat {
    /// Title shown for conversations that have none.
    pub const UNTITLED: &'static str = "Untitled";

    /// Display name of the conversation.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(Self::UNTITLED)
    }

    /// Last activity as an instant, if present and parseable.
    pub fn last_activity_at(&self) -> Option<DateTime<Utc>> {
        self.last_activity.as_deref().and_then(parse_timestamp)
    }

    /// Find a participant by user id.
    pub fn participant(&self, user_id: &str) -> Option<&UserSummary> {
        self.participants.items.iter().find(|p| p.id == user_id)
    }
}

/// Sort conversations by last activity, most recent first.
///
/// Conversations without a parseable last activity go last, keeping their
/// relative order.
pub fn sort_chats_by_last_activity(chats: &mut [Chat]) {
    chats.sort_by_key(|chat| std::cmp::Reverse(chat.last_activity_at()));
}

// ============================================
// Messages
// ============================================

/// Attachment metadata on a message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// "img", "video", "audio" or "unknown"
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(rename = "srcURL", default, skip_serializing_if = "Option::is_none")]
    pub src_url: Option<String>,
}

/// A message as returned by the conversation service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Absent for pending (not yet acknowledged) messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "chatID", default)]
    pub chat_id: String,
    #[serde(rename = "senderID", default)]
    pub sender_id: String,
    /// Usually a string, but some networks send numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Sent by self
    #[serde(default)]
    pub is_sender: bool,
    #[serde(default)]
    pub is_unread: bool,
}

impl Message {
    /// Timestamp as an instant, if present and parseable.
    pub fn timestamp_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

/// Parse an ISO-8601 timestamp into UTC.
///
/// RFC 3339 is tried first. Date-times without an offset
/// (`2025-06-01T10:00:00`, optionally with a space separator) and bare
/// dates (`2025-06-01`, read as midnight) are taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

// ============================================
// Requests
// ============================================

/// Paging direction for conversation listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatDirection {
    After,
    Before,
}

impl ChatDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatDirection::After => "after",
            ChatDirection::Before => "before",
        }
    }
}

/// Type restriction for conversation listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatTypeFilter {
    Single,
    Group,
    Any,
}

impl ChatTypeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatTypeFilter::Single => "single",
            ChatTypeFilter::Group => "group",
            ChatTypeFilter::Any => "any",
        }
    }
}

/// Filter for listing conversations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatFilter {
    pub unread_only: bool,
    pub include_muted: Option<bool>,
    pub chat_type: Option<ChatTypeFilter>,
    pub query: Option<String>,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
    pub direction: Option<ChatDirection>,
}

impl ChatFilter {
    /// Query-string pairs for this filter; unset fields are omitted.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if self.unread_only {
            query.push(("unreadOnly".to_string(), "true".to_string()));
        }
        if let Some(include_muted) = self.include_muted {
            query.push(("includeMuted".to_string(), include_muted.to_string()));
        }
        if let Some(chat_type) = self.chat_type {
            query.push(("type".to_string(), chat_type.as_str().to_string()));
        }
        if let Some(q) = &self.query {
            query.push(("query".to_string(), q.clone()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(cursor) = &self.cursor {
            query.push(("cursor".to_string(), cursor.clone()));
        }
        if let Some(direction) = self.direction {
            query.push(("direction".to_string(), direction.as_str().to_string()));
        }
        query
    }
}

/// Paging direction for message listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Forward,
    Backward,
}

impl MessageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageDirection::Forward => "forward",
            MessageDirection::Backward => "backward",
        }
    }
}

/// Parameters for listing one conversation's messages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageQuery {
    pub cursor: Option<String>,
    pub direction: Option<MessageDirection>,
    pub limit: Option<usize>,
    pub date_after: Option<DateTime<Utc>>,
    pub date_before: Option<DateTime<Utc>>,
}

impl MessageQuery {
    /// Most recent page of `limit` messages.
    pub fn latest(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Default::default()
        }
    }

    /// Page of `limit` messages older than `cursor`.
    pub fn older_than(cursor: impl Into<String>, limit: usize) -> Self {
        Self {
            cursor: Some(cursor.into()),
            direction: Some(MessageDirection::Backward),
            limit: Some(limit),
            ..Default::default()
        }
    }

    /// Query-string pairs for this query; unset fields are omitted.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(cursor) = &self.cursor {
            query.push(("cursor".to_string(), cursor.clone()));
        }
        if let Some(direction) = self.direction {
            query.push(("direction".to_string(), direction.as_str().to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(after) = self.date_after {
            query.push(("dateAfter".to_string(), after.to_rfc3339()));
        }
        if let Some(before) = self.date_before {
            query.push(("dateBefore".to_string(), before.to_rfc3339()));
        }
        query
    }
}

/// Why a message is being sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendIntent {
    #[default]
    Auto,
    Incoming,
    Outgoing,
}

/// A message to send
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutgoingMessage {
    pub text: String,
    pub reply_to_message_id: Option<String>,
    pub intent: SendIntent,
}

// ============================================
// Responses
// ============================================

/// One page of conversations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPage {
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub items: Vec<Chat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newest_cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldest_cursor: Option<String>,
}

/// One page of messages for a single conversation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub has_more: bool,
    pub cursor: Option<String>,
    pub oldest_cursor: Option<String>,
    pub newest_cursor: Option<String>,
    /// Users referenced by the page, keyed by user id
    pub users: HashMap<String, UserSummary>,
}

impl MessagePage {
    /// Cursor marking the oldest end of this page.
    pub fn older_cursor(&self) -> Option<&str> {
        self.oldest_cursor.as_deref().or(self.cursor.as_deref())
    }
}

/// Acknowledgement of a sent message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendReceipt {
    #[serde(rename = "chatID")]
    pub chat_id: String,
    #[serde(rename = "pendingMessageID")]
    pub pending_message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}
