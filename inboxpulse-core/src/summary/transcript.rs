//! Transcript and prompt construction for conversation summaries.

use std::collections::HashMap;

use crate::types::{Chat, Message, UserSummary};

/// Suffix appended to the account owner's name in transcripts.
pub const SELF_MARKER: &str = " (you)";

const NO_TEXT: &str = "(no text)";
const UNKNOWN_TIME: &str = "unknown time";

/// Map sender ids to display names.
///
/// Conversation participants come first; the page's users map only fills in
/// ids the participant list did not cover. The account owner is marked.
pub fn participant_names(chat: &Chat, users: &HashMap<String, UserSummary>) -> HashMap<String, String> {
    let mut names = HashMap::new();

    for participant in &chat.participants.items {
        names.insert(participant.id.clone(), labelled(participant));
    }
    for (id, user) in users {
        names.entry(id.clone()).or_insert_with(|| labelled(user));
    }

    names
}

fn labelled(user: &UserSummary) -> String {
    if user.is_self {
        format!("{}{}", user.display_name(), SELF_MARKER)
    } else {
        user.display_name().to_string()
    }
}

/// One line per message: `[timestamp] sender: body`.
pub fn build_transcript(messages: &[Message], names: &HashMap<String, String>) -> String {
    messages
        .iter()
        .map(|message| {
            let sender = names
                .get(&message.sender_id)
                .map(String::as_str)
                .unwrap_or(&message.sender_id);
            format!("[{}] {}: {}", format_time(message), sender, message_body(message))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_time(message: &Message) -> String {
    match message.timestamp_at() {
        Some(at) => at.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => UNKNOWN_TIME.to_string(),
    }
}

/// Trimmed text, or a description of the attachments when there is none.
pub fn message_body(message: &Message) -> String {
    let text = message.text.as_deref().map(str::trim).unwrap_or_default();
    if !text.is_empty() {
        return text.to_string();
    }
    if message.attachments.is_empty() {
        return NO_TEXT.to_string();
    }
    message
        .attachments
        .iter()
        .map(|a| {
            let kind = a.kind.as_deref().unwrap_or("file");
            let name = a
                .file_name
                .as_deref()
                .or(a.mime_type.as_deref())
                .unwrap_or("unnamed attachment");
            format!("({kind}) {name}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Prompt asking for a JSON summary of `transcript`.
pub fn build_summary_prompt(chat: &Chat, message_count: usize, transcript: &str) -> String {
    let platform = chat.network.as_deref().unwrap_or("Unknown");
    [
        "You are summarizing unread messages from a chat conversation.".to_string(),
        format!("Conversation: {}", chat.display_title()),
        format!("Platform: {platform}"),
        format!("Unread message count: {message_count}"),
        String::new(),
        "Output a pure JSON object with the shape:".to_string(),
        r#"{ "summary": "text", "highlights": ["..."], "next_actions": ["..."], "snippets": [{ "sender": "...", "text": "...", "timestamp": "ISO", "url": "..." }] }"#.to_string(),
        "Rules:".to_string(),
        "- Keep the summary to one or two sentences.".to_string(),
        "- Provide up to 5 highlights.".to_string(),
        "- Provide up to 3 next_actions; omit if not needed.".to_string(),
        "- Provide up to 3 snippets from the transcript.".to_string(),
        "- Do not wrap the JSON in markdown fences. Do not add explanations.".to_string(),
        String::new(),
        "Transcript of unread messages:".to_string(),
        transcript.to_string(),
    ]
    .join("\n")
}
