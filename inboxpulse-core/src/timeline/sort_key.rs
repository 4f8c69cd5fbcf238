//! Canonical message ordering.
//!
//! The service hands out sort keys in several shapes: decimal strings of
//! varying width, JSON numbers, occasionally nothing at all. Comparing those
//! as raw text puts `"999"` after `"1000"`, so every key is normalized into a
//! [`SortKey`] before it is compared.

use std::cmp::Ordering;
use std::fmt;

use crate::types::Message;

/// Normalized ordering token for a message.
///
/// Pure-digit keys compare numerically at any width. Everything else compares
/// as text. Numeric keys order before textual ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Decimal digits with leading zeros stripped ("0" for all-zero input)
    Numeric(String),
    /// Any other non-numeric key, compared byte-wise
    Text(String),
}

impl SortKey {
    /// Normalize a derived key string.
    pub fn parse(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            let trimmed = raw.trim_start_matches('0');
            let digits = if trimmed.is_empty() { "0" } else { trimmed };
            SortKey::Numeric(digits.to_string())
        } else {
            SortKey::Text(raw.to_string())
        }
    }

    /// Key for a message, via [`derive_sort_key`].
    pub fn of(message: &Message) -> Self {
        Self::parse(&derive_sort_key(message))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Numeric(a), SortKey::Numeric(b)) => {
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (SortKey::Numeric(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Numeric(_)) => Ordering::Greater,
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Numeric(s) | SortKey::Text(s) => f.write_str(s),
        }
    }
}

/// Derive the raw sort key string for a message.
///
/// Fallback chain: non-empty string sort key, any other non-null sort key
/// stringified, timestamp as epoch milliseconds, raw timestamp, message id,
/// empty string.
pub fn derive_sort_key(message: &Message) -> String {
    match &message.sort_key {
        Some(serde_json::Value::String(s)) => return s.clone(),
        Some(serde_json::Value::Null) | None => {}
        Some(other) => return other.to_string(),
    }

    if let Some(ts) = message.timestamp.as_deref().filter(|ts| !ts.is_empty()) {
        return match message.timestamp_at() {
            Some(parsed) => parsed.timestamp_millis().to_string(),
            None => ts.to_string(),
        };
    }

    match message.id.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => String::new(),
    }
}

/// Key used to deduplicate messages across pages.
///
/// The message id when present, otherwise a synthetic key built from the
/// derived sort key.
pub fn identity_key(message: &Message) -> String {
    match &message.id {
        Some(id) => id.clone(),
        None => format!("sortKey:{}", derive_sort_key(message)),
    }
}

/// Sort messages ascending by canonical key. Stable for equal keys.
pub fn sort_ascending(messages: &mut [Message]) {
    messages.sort_by_cached_key(SortKey::of);
}
