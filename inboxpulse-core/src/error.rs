//! Error types for inboxpulse-core

use thiserror::Error;

/// Main error type for the inboxpulse-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Non-success HTTP response from the conversation service
    #[error("{}", api_message(.status, .status_text))]
    Api {
        status: u16,
        status_text: String,
        /// Response body, parsed as JSON when possible
        details: Option<serde_json::Value>,
    },

    /// Transport failure (connection refused, timeout, bad body)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// The summarizer returned text that is not the expected JSON shape
    #[error("could not parse summary response: {0}")]
    Summary(String),

    /// Requested time window cannot support the digest periods
    #[error("invalid window: {0}")]
    InvalidWindow(String),

    /// Generic failure reported by a conversation source
    #[error("{0}")]
    Source(String),
}

fn api_message(status: &u16, status_text: &str) -> String {
    if status_text.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {} {}", status, status_text)
    }
}

impl Error {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Text suitable for showing to a person.
    ///
    /// Unauthorized responses get a hint about the token setting; other API
    /// errors prefer the server-provided details over the bare status line.
    pub fn user_message(&self) -> String {
        match self {
            Error::Api { status: 401, .. } => {
                "HTTP 401 Unauthorized: set api.auth_token (or BEEPER_AUTH_TOKEN) to a valid Beeper Desktop API token".to_string()
            }
            Error::Api {
                details: Some(details),
                ..
            } => match details {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            },
            other => other.to_string(),
        }
    }
}

/// Result type alias for inboxpulse-core
pub type Result<T> = std::result::Result<T, Error>;
