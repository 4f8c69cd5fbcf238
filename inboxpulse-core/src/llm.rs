//! HTTP-backed [`Summarizer`] for Ollama, Claude and OpenAI-compatible APIs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;

use crate::api::Summarizer;
use crate::config::{LlmConfig, LlmProvider};
use crate::error::{Error, Result};

const SYSTEM_PROMPT: &str =
    "You summarize chat conversations. Follow the output format requested in the prompt exactly.";
const MAX_TOKENS: u32 = 1024;

/// Summarizer that calls a configured LLM provider.
pub struct LlmSummarizer {
    model: String,
    provider: LlmProvider,
    endpoint: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl LlmSummarizer {
    /// Create a summarizer from configuration.
    ///
    /// Hosted providers require an API key, either in config or in the
    /// provider's environment variable.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| config.provider.default_endpoint().to_string())
            .trim_end_matches('/')
            .to_string();

        let api_key = config.api_key.clone().or_else(|| {
            config
                .provider
                .api_key_env()
                .and_then(|var| std::env::var(var).ok())
        });

        if config.provider != LlmProvider::Ollama && api_key.is_none() {
            return Err(Error::Config(
                "llm.api_key (or provider env var) is required".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| Error::Llm(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            model: config.model.clone(),
            provider: config.provider,
            endpoint,
            api_key,
            http,
        })
    }

    async fn post(&self, url: String, headers: HeaderMap, body: serde_json::Value) -> Result<serde_json::Value> {
        let provider = self.provider_name();
        let resp = self
            .http
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("{provider} request failed: {e}")))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::Llm(format!("{provider} read body failed: {e}")))?;
        if !status.is_success() {
            return Err(Error::Llm(format!(
                "{provider} returned {}: {}",
                status.as_u16(),
                text
            )));
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn provider_name(&self) -> &'static str {
        match self.provider {
            LlmProvider::Ollama => "ollama",
            LlmProvider::Claude => "claude",
            LlmProvider::OpenAI => "openai",
        }
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let key = self.api_key.as_deref().unwrap_or_default();
        match self.provider {
            LlmProvider::Ollama => {}
            LlmProvider::Claude => {
                headers.insert(
                    "x-api-key",
                    HeaderValue::from_str(key)
                        .map_err(|e| Error::Llm(format!("invalid claude api key header: {e}")))?,
                );
                headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
            }
            LlmProvider::OpenAI => {
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {key}"))
                        .map_err(|e| Error::Llm(format!("invalid auth header: {e}")))?,
                );
            }
        }
        Ok(headers)
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String> {
        let headers = self.auth_headers()?;
        let (url, body, pointer) = match self.provider {
            LlmProvider::Ollama => (
                format!("{}/api/generate", self.endpoint),
                json!({
                    "model": self.model,
                    "system": SYSTEM_PROMPT,
                    "prompt": prompt,
                    "stream": false,
                    "options": { "temperature": 0.1 },
                }),
                "/response",
            ),
            LlmProvider::Claude => (
                format!("{}/v1/messages", self.endpoint),
                json!({
                    "model": self.model,
                    "max_tokens": MAX_TOKENS,
                    "temperature": 0.1,
                    "system": SYSTEM_PROMPT,
                    "messages": [{ "role": "user", "content": prompt }],
                }),
                "/content/0/text",
            ),
            LlmProvider::OpenAI => (
                format!("{}/v1/chat/completions", self.endpoint),
                json!({
                    "model": self.model,
                    "temperature": 0.1,
                    "messages": [
                        { "role": "system", "content": SYSTEM_PROMPT },
                        { "role": "user", "content": prompt }
                    ]
                }),
                "/choices/0/message/content",
            ),
        };

        tracing::debug!(provider = self.provider_name(), model = %self.model, "Requesting summary");

        let response = self.post(url, headers, body).await?;
        response
            .pointer(pointer)
            .and_then(|v| v.as_str())
            .map(ToString::to_string)
            .ok_or_else(|| {
                Error::Llm(format!(
                    "{} response missing string at {}",
                    self.provider_name(),
                    pointer
                ))
            })
    }
}
