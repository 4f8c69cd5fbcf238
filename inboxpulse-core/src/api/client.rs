//! HTTP client for the Beeper Desktop local API
//!
//! Endpoints used:
//! - `GET /search-chats` for conversation listings
//! - `GET /search-messages` scoped to one chat for message pages
//! - `POST /send-message` for outgoing messages
//! - `GET /get-chat` for a single conversation with all participants

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::{
    Chat, ChatFilter, ChatPage, Message, MessagePage, MessageQuery, OutgoingMessage, SendReceipt,
    UserSummary,
};

use super::ConversationSource;

/// Response from GET /search-messages
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchMessagesResponse {
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    items: Vec<Message>,
    #[serde(default)]
    newest_cursor: Option<String>,
    #[serde(default)]
    oldest_cursor: Option<String>,
    #[serde(default)]
    users: HashMap<String, UserSummary>,
}

impl From<SearchMessagesResponse> for MessagePage {
    fn from(response: SearchMessagesResponse) -> Self {
        MessagePage {
            messages: response.items,
            has_more: response.has_more,
            cursor: None,
            oldest_cursor: response.oldest_cursor,
            newest_cursor: response.newest_cursor,
            users: response.users,
        }
    }
}

/// HTTP client for the conversation service
pub struct BeeperClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl BeeperClient {
    /// Create a new client from configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Config("api.base_url is required".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = config.token() {
            let auth_value = format!("Bearer {}", token);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid auth_token: {}", e)))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Fetch a single conversation with its full participant list.
    pub async fn get_chat(&self, chat_id: &str) -> Result<Chat> {
        let request = self.http_client.get(self.url("get-chat")).query(&[
            ("chatID", chat_id),
            ("maxParticipantCount", "-1"),
        ]);
        self.execute(request).await
    }

    /// Check that the service is reachable and the token is accepted.
    pub async fn check_connection(&self) -> Result<()> {
        let filter = ChatFilter {
            limit: Some(1),
            ..Default::default()
        };
        self.list_conversations(&filter).await.map(|_| ())
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Map non-success responses to [`Error::Api`].
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let details = if text.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<serde_json::Value>(&text)
                    .unwrap_or(serde_json::Value::String(text)),
            )
        };

        tracing::debug!(status = status.as_u16(), details = ?details, "API error response");

        Err(Error::Api {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            details,
        })
    }
}

#[async_trait]
impl ConversationSource for BeeperClient {
    async fn list_conversations(&self, filter: &ChatFilter) -> Result<ChatPage> {
        let request = self
            .http_client
            .get(self.url("search-chats"))
            .query(&filter.to_query());
        self.execute(request).await
    }

    async fn list_messages(&self, chat_id: &str, query: &MessageQuery) -> Result<MessagePage> {
        let mut params = vec![("chatIDs[]".to_string(), chat_id.to_string())];
        params.extend(query.to_query());

        let request = self
            .http_client
            .get(self.url("search-messages"))
            .query(&params);
        let response: SearchMessagesResponse = self.execute(request).await?;
        Ok(response.into())
    }

    async fn send_message(&self, chat_id: &str, message: &OutgoingMessage) -> Result<SendReceipt> {
        let payload = serde_json::json!({
            "chatID": chat_id,
            "text": message.text,
            "replyToMessageID": message.reply_to_message_id,
            "intent": message.intent,
        });

        let request = self
            .http_client
            .post(self.url("send-message"))
            .json(&payload);
        self.execute(request).await
    }
}
