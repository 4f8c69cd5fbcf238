//! Conversation service access
//!
//! Everything that talks to the outside world goes through two traits:
//!
//! - [`ConversationSource`]: lists conversations, pages through messages and
//!   sends messages. [`BeeperClient`] implements it over the local HTTP API;
//!   tests implement it in memory.
//! - [`Summarizer`]: turns a prompt into generated text.
//!   [`crate::llm::LlmSummarizer`] implements it against an LLM provider.
//!
//! Neither trait retries. A failed call is reported once and the caller
//! decides what to do with it.

mod client;

pub use client::BeeperClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    sort_chats_by_last_activity, Chat, ChatDirection, ChatFilter, ChatPage, ChatType,
    ChatTypeFilter, MessagePage, MessageQuery, OutgoingMessage, SendReceipt,
};

/// Remote conversation service.
#[async_trait]
pub trait ConversationSource: Send + Sync {
    /// List conversations matching `filter` (one page).
    async fn list_conversations(&self, filter: &ChatFilter) -> Result<ChatPage>;

    /// List one page of messages for a conversation.
    async fn list_messages(&self, chat_id: &str, query: &MessageQuery) -> Result<MessagePage>;

    /// Send a message to a conversation.
    async fn send_message(&self, chat_id: &str, message: &OutgoingMessage) -> Result<SendReceipt>;
}

/// Free-form text generation used for summaries.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn summarize(&self, prompt: &str) -> Result<String>;
}

/// Direct-message conversations, most recently active first.
///
/// The listing is requested with a `single` type filter, and anything else
/// the service returns anyway is dropped.
pub async fn list_direct_conversations<S>(source: &S, limit: usize) -> Result<Vec<Chat>>
where
    S: ConversationSource + ?Sized,
{
    let filter = ChatFilter {
        include_muted: Some(true),
        chat_type: Some(ChatTypeFilter::Single),
        limit: Some(limit),
        direction: Some(ChatDirection::Before),
        ..Default::default()
    };
    let page = source.list_conversations(&filter).await?;

    let mut chats: Vec<Chat> = page
        .items
        .into_iter()
        .filter(|chat| chat.chat_type == ChatType::Single)
        .collect();
    sort_chats_by_last_activity(&mut chats);
    Ok(chats)
}
