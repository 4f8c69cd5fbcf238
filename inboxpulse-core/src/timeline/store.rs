//! Per-conversation timeline snapshots and the map that holds them.
//!
//! A [`Timeline`] is a plain value. Operations on it return a new value
//! instead of mutating in place, so a failed fetch can put the previous
//! snapshot back untouched.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::{Message, MessagePage};

use super::sort_key::{identity_key, sort_ascending};

/// Visible state of one conversation's message history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    messages: Vec<Message>,
    has_more: bool,
    oldest_cursor: Option<String>,
    loading: bool,
    sender_names: HashMap<String, String>,
}

/// Serializable view of a [`Timeline`] handed to presentation code.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimelineSnapshot {
    pub messages: Vec<Message>,
    pub has_more: bool,
    pub oldest_cursor: Option<String>,
    pub loading: bool,
}

/// Why an older page cannot be requested right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendBlocked {
    /// A fetch for this conversation is in flight
    Loading,
    /// The server reported no older messages
    NoMoreHistory,
    /// No cursor is known yet (nothing loaded)
    NoCursor,
}

impl Timeline {
    /// Messages in ascending sort-key order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn oldest_cursor(&self) -> Option<&str> {
        self.oldest_cursor.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Display name for a sender seen in any loaded page.
    pub fn sender_name(&self, sender_id: &str) -> Option<&str> {
        self.sender_names.get(sender_id).map(String::as_str)
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            messages: self.messages.clone(),
            has_more: self.has_more,
            oldest_cursor: self.oldest_cursor.clone(),
            loading: self.loading,
        }
    }

    /// Copy of this timeline with the loading flag set to `loading`.
    pub fn with_loading(&self, loading: bool) -> Timeline {
        Timeline {
            loading,
            ..self.clone()
        }
    }

    /// Cursor to request the next older page with, if allowed.
    ///
    /// A timeline that was never loaded has neither messages nor a cursor and
    /// reports [`ExtendBlocked::NoCursor`], not the end of history.
    pub fn extend_cursor(&self) -> Result<&str, ExtendBlocked> {
        if self.loading {
            return Err(ExtendBlocked::Loading);
        }
        if self.oldest_cursor.is_none() && self.messages.is_empty() {
            return Err(ExtendBlocked::NoCursor);
        }
        if !self.has_more {
            return Err(ExtendBlocked::NoMoreHistory);
        }
        self.oldest_cursor.as_deref().ok_or(ExtendBlocked::NoCursor)
    }

    /// Replace the visible set with `page`.
    ///
    /// The cursor falls back to the previous one when the page carries none.
    pub fn replaced_with(&self, page: &MessagePage) -> Timeline {
        let mut messages = page.messages.clone();
        sort_ascending(&mut messages);

        Timeline {
            messages,
            has_more: page.has_more,
            oldest_cursor: page
                .older_cursor()
                .map(str::to_string)
                .or_else(|| self.oldest_cursor.clone()),
            loading: false,
            sender_names: self.merged_names(page),
        }
    }

    /// Merge an older `page` into the visible set.
    pub fn extended_with(&self, page: &MessagePage) -> Timeline {
        Timeline {
            messages: merge_messages(&self.messages, &page.messages),
            has_more: page.has_more,
            oldest_cursor: page
                .older_cursor()
                .map(str::to_string)
                .or_else(|| self.oldest_cursor.clone()),
            loading: false,
            sender_names: self.merged_names(page),
        }
    }

    fn merged_names(&self, page: &MessagePage) -> HashMap<String, String> {
        let mut names = self.sender_names.clone();
        for (id, user) in &page.users {
            names.insert(id.clone(), user.display_name().to_string());
        }
        names
    }
}

/// Union of `current` and `incoming`, deduplicated by identity key and sorted
/// ascending. Incoming messages replace current ones with the same key.
pub fn merge_messages(current: &[Message], incoming: &[Message]) -> Vec<Message> {
    let mut by_key: HashMap<String, Message> =
        HashMap::with_capacity(current.len() + incoming.len());

    for message in current.iter().chain(incoming) {
        by_key.insert(identity_key(message), message.clone());
    }

    let mut merged: Vec<Message> = by_key.into_values().collect();
    // HashMap order is arbitrary; break sort-key ties on identity so the
    // result does not depend on it.
    merged.sort_by_cached_key(|m| (super::sort_key::SortKey::of(m), identity_key(m)));
    merged
}

/// Timelines keyed by conversation id.
///
/// Entries are created on first access and live as long as the store.
#[derive(Debug, Default)]
pub struct TimelineStore {
    timelines: HashMap<String, Timeline>,
}

impl TimelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeline for a conversation, if it has been touched.
    pub fn get(&self, chat_id: &str) -> Option<&Timeline> {
        self.timelines.get(chat_id)
    }

    /// Current timeline for a conversation, empty if never loaded.
    pub fn current(&self, chat_id: &str) -> Timeline {
        self.timelines.get(chat_id).cloned().unwrap_or_default()
    }

    /// Install a new snapshot for a conversation.
    pub fn set(&mut self, chat_id: &str, timeline: Timeline) {
        self.timelines.insert(chat_id.to_string(), timeline);
    }

    /// Replace a conversation's visible set with `page`.
    pub fn replace_with(&mut self, chat_id: &str, page: &MessagePage) -> &Timeline {
        let next = self.current(chat_id).replaced_with(page);
        self.timelines.insert(chat_id.to_string(), next);
        &self.timelines[chat_id]
    }

    /// Merge an older page into a conversation's visible set.
    pub fn extend_older(&mut self, chat_id: &str, page: &MessagePage) -> &Timeline {
        let next = self.current(chat_id).extended_with(page);
        self.timelines.insert(chat_id.to_string(), next);
        &self.timelines[chat_id]
    }

    /// Conversation ids with a timeline.
    pub fn len(&self) -> usize {
        self.timelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserSummary;
    use serde_json::json;

    fn msg(id: &str, key: &str, text: &str) -> Message {
        Message {
            id: Some(id.to_string()),
            chat_id: "c1".to_string(),
            sort_key: Some(json!(key)),
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    fn page(messages: Vec<Message>, has_more: bool, cursor: Option<&str>) -> MessagePage {
        MessagePage {
            messages,
            has_more,
            oldest_cursor: cursor.map(str::to_string),
            ..Default::default()
        }
    }

    fn ids(messages: &[Message]) -> Vec<&str> {
        messages.iter().filter_map(|m| m.id.as_deref()).collect()
    }

    #[test]
    fn test_replace_sorts_and_sets_cursor() {
        let timeline = Timeline::default().replaced_with(&page(
            vec![msg("b", "20", ""), msg("a", "10", "")],
            true,
            Some("cur-10"),
        ));
        assert_eq!(ids(timeline.messages()), vec!["a", "b"]);
        assert!(timeline.has_more());
        assert_eq!(timeline.oldest_cursor(), Some("cur-10"));
        assert!(!timeline.is_loading());
    }

    #[test]
    fn test_replace_discards_old_content() {
        let first = Timeline::default().replaced_with(&page(vec![msg("a", "1", "")], true, Some("x")));
        let second = first.replaced_with(&page(vec![msg("z", "9", "")], false, None));
        assert_eq!(ids(second.messages()), vec!["z"]);
        // Cursor falls back to the previous one
        assert_eq!(second.oldest_cursor(), Some("x"));
    }

    #[test]
    fn test_merge_idempotent() {
        let base = vec![msg("c", "30", ""), msg("d", "40", "")];
        let incoming = vec![msg("a", "10", ""), msg("b", "20", "")];
        let once = merge_messages(&base, &incoming);
        let twice = merge_messages(&once, &incoming);
        assert_eq!(once, twice);
        assert_eq!(ids(&once), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_merge_order_independent() {
        let p1 = vec![msg("a", "10", ""), msg("c", "30", "")];
        let p2 = vec![msg("b", "20", ""), msg("c", "30", ""), msg("d", "40", "")];
        let left = merge_messages(&merge_messages(&[], &p1), &p2);
        let right = merge_messages(&merge_messages(&[], &p2), &p1);
        assert_eq!(ids(&left), vec!["a", "b", "c", "d"]);
        assert_eq!(ids(&left), ids(&right));
    }

    #[test]
    fn test_merge_incoming_wins() {
        let current = vec![msg("a", "10", "old")];
        let incoming = vec![msg("a", "10", "edited")];
        let merged = merge_messages(&current, &incoming);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text.as_deref(), Some("edited"));
    }

    #[test]
    fn test_merge_pending_messages_by_sort_key() {
        let pending = Message {
            id: None,
            sort_key: Some(json!("50")),
            ..Default::default()
        };
        let merged = merge_messages(&[pending.clone()], &[pending]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_extend_cursor_preconditions() {
        let empty = Timeline::default();
        assert_eq!(empty.extend_cursor(), Err(ExtendBlocked::NoCursor));

        let exhausted = Timeline::default().replaced_with(&page(vec![msg("a", "1", "")], false, None));
        assert_eq!(exhausted.extend_cursor(), Err(ExtendBlocked::NoMoreHistory));

        let no_cursor = Timeline::default().replaced_with(&page(vec![msg("a", "1", "")], true, None));
        assert_eq!(no_cursor.extend_cursor(), Err(ExtendBlocked::NoCursor));

        let ready = Timeline::default().replaced_with(&page(vec![], true, Some("c")));
        assert_eq!(ready.extend_cursor(), Ok("c"));
        assert_eq!(
            ready.with_loading(true).extend_cursor(),
            Err(ExtendBlocked::Loading)
        );
    }

    #[test]
    fn test_sender_names_merge_incoming_wins() {
        let mut first = page(vec![], true, None);
        first.users.insert(
            "u1".to_string(),
            UserSummary {
                id: "u1".to_string(),
                username: Some("al".to_string()),
                ..Default::default()
            },
        );
        let mut second = page(vec![], true, None);
        second.users.insert(
            "u1".to_string(),
            UserSummary {
                id: "u1".to_string(),
                full_name: Some("Alice".to_string()),
                ..Default::default()
            },
        );
        let timeline = Timeline::default().replaced_with(&first);
        assert_eq!(timeline.sender_name("u1"), Some("al"));
        let timeline = timeline.extended_with(&second);
        assert_eq!(timeline.sender_name("u1"), Some("Alice"));
        assert_eq!(timeline.sender_name("nobody"), None);
    }

    #[test]
    fn test_store_keeps_conversations_apart() {
        let mut store = TimelineStore::new();
        store.replace_with("c1", &page(vec![msg("a", "1", "")], true, Some("x")));
        store.replace_with("c2", &page(vec![msg("b", "2", "")], false, None));
        store.extend_older("c1", &page(vec![msg("z", "0", "")], false, None));

        assert_eq!(store.len(), 2);
        assert_eq!(ids(store.get("c1").unwrap().messages()), vec!["z", "a"]);
        assert_eq!(ids(store.get("c2").unwrap().messages()), vec!["b"]);
        assert!(store.get("c3").is_none());
        assert!(store.current("c3").is_empty());
    }
}
