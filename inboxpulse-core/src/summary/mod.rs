//! Unread conversation summaries
//!
//! For each conversation with unread messages, fetch its recent history,
//! render a transcript, and ask a [`Summarizer`] for a structured summary.
//! Conversations are processed one at a time. A conversation that fails
//! becomes an item carrying the error instead of aborting the run.

mod parse;
mod transcript;

pub use parse::{
    escape_newlines_in_strings, extract_json, parse_summary_response, Snippet, SummaryResponse,
    MAX_SNIPPETS,
};
pub use transcript::{
    build_summary_prompt, build_transcript, message_body, participant_names, SELF_MARKER,
};

use serde::Serialize;

use crate::api::{ConversationSource, Summarizer};
use crate::error::Result;
use crate::timeline::sort_ascending;
use crate::types::{
    parse_timestamp, Chat, ChatFilter, ChatTypeFilter, MessageDirection, MessageQuery,
};

/// Summary text used when a conversation returned no messages.
pub const NO_MESSAGES_SUMMARY: &str = "No unread messages could be fetched.";

/// Limits for an unread-summary run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnreadOptions {
    /// Conversations requested from the listing
    pub chat_limit: usize,
    /// Conversations actually summarized
    pub max_chats: usize,
    /// Messages fetched per conversation
    pub message_limit: usize,
}

impl Default for UnreadOptions {
    fn default() -> Self {
        Self {
            chat_limit: 30,
            max_chats: 5,
            message_limit: 40,
        }
    }
}

/// Summary (or failure) for one unread conversation.
#[derive(Debug, Clone, Serialize)]
pub struct UnreadSummary {
    pub chat: Chat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message_count: usize,
    /// Timestamp of the newest fetched message, else the conversation's
    /// last activity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<String>,
}

impl UnreadSummary {
    fn failed(chat: Chat, error: String) -> Self {
        let last_message_at = chat.last_activity.clone();
        Self {
            chat,
            summary: None,
            error: Some(error),
            message_count: 0,
            last_message_at,
        }
    }
}

/// Summarize conversations with unread messages.
///
/// Only the conversation listing can fail the whole call. Results are
/// ordered by last activity, newest first.
pub async fn summarize_unread<S, M>(
    source: &S,
    summarizer: &M,
    options: &UnreadOptions,
) -> Result<Vec<UnreadSummary>>
where
    S: ConversationSource + ?Sized,
    M: Summarizer + ?Sized,
{
    let filter = ChatFilter {
        unread_only: true,
        include_muted: Some(true),
        chat_type: Some(ChatTypeFilter::Any),
        limit: Some(options.chat_limit),
        ..Default::default()
    };
    let listing = source.list_conversations(&filter).await?;

    let unread: Vec<Chat> = listing
        .items
        .into_iter()
        .filter(|chat| chat.unread_count > 0)
        .take(options.max_chats)
        .collect();

    tracing::info!(chats = unread.len(), "summarizing unread conversations");

    let mut results = Vec::with_capacity(unread.len());
    for (index, chat) in unread.into_iter().enumerate() {
        tracing::debug!(chat_id = %chat.id, position = index + 1, "summarizing conversation");
        match summarize_chat(source, summarizer, &chat, options.message_limit).await {
            Ok(item) => results.push(item),
            Err(e) => {
                tracing::warn!(chat_id = %chat.id, error = %e, "summary failed");
                results.push(UnreadSummary::failed(chat, e.user_message()));
            }
        }
    }

    results.sort_by_key(|item| {
        std::cmp::Reverse(item.last_message_at.as_deref().and_then(parse_timestamp))
    });

    Ok(results)
}

async fn summarize_chat<S, M>(
    source: &S,
    summarizer: &M,
    chat: &Chat,
    message_limit: usize,
) -> Result<UnreadSummary>
where
    S: ConversationSource + ?Sized,
    M: Summarizer + ?Sized,
{
    let query = MessageQuery {
        direction: Some(MessageDirection::Backward),
        limit: Some(message_limit),
        ..Default::default()
    };
    let page = source.list_messages(&chat.id, &query).await?;

    let mut messages = page.messages;
    sort_ascending(&mut messages);

    if messages.is_empty() {
        return Ok(UnreadSummary {
            chat: chat.clone(),
            summary: Some(SummaryResponse {
                summary: NO_MESSAGES_SUMMARY.to_string(),
                highlights: Vec::new(),
                next_actions: Vec::new(),
                snippets: Vec::new(),
            }),
            error: None,
            message_count: 0,
            last_message_at: chat.last_activity.clone(),
        });
    }

    let names = participant_names(chat, &page.users);
    let transcript = build_transcript(&messages, &names);
    let prompt = build_summary_prompt(chat, messages.len(), &transcript);

    let raw = summarizer.summarize(&prompt).await?;
    let summary = parse_summary_response(&raw)?;

    let last_message_at = messages
        .last()
        .and_then(|m| m.timestamp.clone())
        .or_else(|| chat.last_activity.clone());

    Ok(UnreadSummary {
        chat: chat.clone(),
        summary: Some(summary),
        error: None,
        message_count: messages.len(),
        last_message_at,
    })
}
