//! Raw message to [`NormalizedMessage`] conversion.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::period::Period;
use crate::types::{Chat, Message, MessagePage, UserSummary};

/// Attachment reduced to what digests and reports show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentSummary {
    /// Attachment type, "unknown" when the service sent none
    #[serde(rename = "type")]
    pub kind: String,
    /// File name, or MIME type when there is no file name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A message with its conversation context resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedMessage {
    pub id: Option<String>,
    pub chat_id: String,
    pub chat_name: String,
    /// Network label, empty when unknown
    pub platform: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentSummary>,
    pub timestamp: DateTime<Utc>,
    pub is_from_self: bool,
    pub is_unread: bool,
}

/// Normalize every message of `page` that falls inside `window`.
///
/// Messages without a parseable timestamp are dropped.
pub fn normalize_page(chat: &Chat, page: &MessagePage, window: &Period) -> Vec<NormalizedMessage> {
    page.messages
        .iter()
        .filter_map(|message| {
            let timestamp = message.timestamp_at()?;
            window
                .contains(timestamp)
                .then(|| normalize(chat, message, &page.users, timestamp))
        })
        .collect()
}

fn normalize(
    chat: &Chat,
    message: &Message,
    users: &HashMap<String, UserSummary>,
    timestamp: DateTime<Utc>,
) -> NormalizedMessage {
    NormalizedMessage {
        id: message.id.clone(),
        chat_id: chat.id.clone(),
        chat_name: chat.display_title().to_string(),
        platform: chat.network.clone().unwrap_or_default(),
        sender_id: message.sender_id.clone(),
        sender_name: resolve_sender_name(message, chat, users),
        text: message.text.clone().unwrap_or_default(),
        attachments: message.attachments.iter().map(summarize_attachment).collect(),
        timestamp,
        is_from_self: message.is_sender,
        is_unread: message.is_unread,
    }
}

/// Best available name for a message's sender.
///
/// Order: name embedded in the message, the page's users map, the
/// conversation's participant list, then the raw sender id.
pub fn resolve_sender_name(
    message: &Message,
    chat: &Chat,
    users: &HashMap<String, UserSummary>,
) -> String {
    if let Some(name) = message.sender_name.as_deref().filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    users
        .get(&message.sender_id)
        .or_else(|| chat.participant(&message.sender_id))
        .map(|user| user.display_name().to_string())
        .unwrap_or_else(|| message.sender_id.clone())
}

fn summarize_attachment(attachment: &crate::types::Attachment) -> AttachmentSummary {
    AttachmentSummary {
        kind: attachment
            .kind
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        name: attachment
            .file_name
            .clone()
            .or_else(|| attachment.mime_type.clone()),
        url: attachment.src_url.clone(),
    }
}
