//! Lenient parsing of summarizer output.
//!
//! Models asked for "pure JSON" still wrap it in code fences, add a sentence
//! before it, or put raw line breaks inside string values. The helpers here
//! undo those habits before handing the text to `serde_json`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Snippets kept from a summary response.
pub const MAX_SNIPPETS: usize = 3;

const UNKNOWN_SENDER: &str = "Unknown sender";

/// A representative message quoted by the summarizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub sender: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Structured summary of one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
    pub highlights: Vec<String>,
    pub next_actions: Vec<String>,
    /// At most [`MAX_SNIPPETS`] entries
    pub snippets: Vec<Snippet>,
}

#[derive(Deserialize)]
struct RawSnippet {
    sender: Option<String>,
    text: Option<String>,
    timestamp: Option<String>,
    url: Option<String>,
}

#[derive(Deserialize)]
struct RawSummary {
    summary: Option<String>,
    highlights: Option<Vec<String>>,
    next_actions: Option<Vec<String>>,
    snippets: Option<Vec<RawSnippet>>,
}

/// Parse summarizer output into a [`SummaryResponse`].
///
/// Fails with [`Error::Summary`] when no JSON object can be read or the
/// `summary` field is missing or empty.
pub fn parse_summary_response(raw: &str) -> Result<SummaryResponse> {
    let text = escape_newlines_in_strings(extract_json(raw));

    let parsed: RawSummary = serde_json::from_str(&text).map_err(|e| {
        tracing::debug!(error = %e, raw, "summary response is not valid JSON");
        Error::Summary(e.to_string())
    })?;

    let summary = parsed
        .summary
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::Summary("summary field is missing".to_string()))?;

    let snippets = parsed
        .snippets
        .unwrap_or_default()
        .into_iter()
        .take(MAX_SNIPPETS)
        .map(|s| Snippet {
            sender: s.sender.unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
            text: s.text.unwrap_or_default(),
            timestamp: s.timestamp,
            url: s.url,
        })
        .collect();

    Ok(SummaryResponse {
        summary,
        highlights: parsed.highlights.unwrap_or_default(),
        next_actions: parsed.next_actions.unwrap_or_default(),
        snippets,
    })
}

/// Pull the JSON payload out of free-form model output.
///
/// Tries, in order: a ```` ```json ```` fence (any case), any ```` ``` ````
/// fence, the span from the first `{` to the last `}`, the trimmed input.
pub fn extract_json(raw: &str) -> &str {
    const FENCE: &str = "```";

    let lower = raw.to_ascii_lowercase();
    if let Some(open) = lower.find("```json") {
        let body_start = open + "```json".len();
        if let Some(close) = raw[body_start..].find(FENCE) {
            return raw[body_start..body_start + close].trim();
        }
    }

    if let Some(open) = raw.find(FENCE) {
        let body_start = open + FENCE.len();
        if let Some(close) = raw[body_start..].find(FENCE) {
            return raw[body_start..body_start + close].trim();
        }
    }

    if let (Some(open), Some(close)) = (raw.find('{'), raw.rfind('}')) {
        if open < close {
            return raw[open..=close].trim();
        }
    }

    raw.trim()
}

/// Replace raw CR/LF inside JSON string literals with `\n` escapes.
///
/// A quote toggles the in-string state unless the character before it is a
/// backslash. CRLF collapses to a single escape.
pub fn escape_newlines_in_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut prev: Option<char> = None;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' && prev != Some('\\') {
            in_string = !in_string;
        }
        if in_string && (c == '\n' || c == '\r') {
            if c == '\r' && chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push_str("\\n");
        } else {
            out.push(c);
        }
        prev = Some(c);
    }

    out
}
