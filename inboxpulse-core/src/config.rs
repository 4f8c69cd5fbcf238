//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/inboxpulse/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/inboxpulse/` (~/.config/inboxpulse/)
//! - State/Logs: `$XDG_STATE_HOME/inboxpulse/` (~/.local/state/inboxpulse/)
//!
//! Nothing is persisted between runs; the state directory only holds logs.

use crate::error::{Error, Result};
use crate::period::MAX_DAYS;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `api.auth_token`.
pub const AUTH_TOKEN_ENV: &str = "BEEPER_AUTH_TOKEN";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Conversation service connection
    #[serde(default)]
    pub api: ApiConfig,

    /// LLM used for summaries (optional)
    #[serde(default)]
    pub llm: Option<LlmConfig>,

    /// Digest and aggregation settings
    #[serde(default)]
    pub digest: DigestConfig,

    /// Timeline paging settings
    #[serde(default)]
    pub timeline: TimelineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection settings for the conversation service
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL of the local API (e.g., `http://localhost:23373/v0`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token issued by the desktop app
    pub auth_token: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// The token to send, trimmed; empty strings count as unset.
    pub fn token(&self) -> Option<&str> {
        self.auth_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

fn default_base_url() -> String {
    "http://localhost:23373/v0".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// LLM provider configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Provider type
    pub provider: LlmProvider,
    /// Model to use
    pub model: String,
    /// API endpoint (optional, uses default for provider)
    pub endpoint: Option<String>,
    /// API key (can also use env var)
    pub api_key: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

/// Supported LLM providers
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Ollama,
    Claude,
    OpenAI,
}

impl LlmProvider {
    /// Returns the default endpoint for this provider
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "http://localhost:11434",
            LlmProvider::Claude => "https://api.anthropic.com",
            LlmProvider::OpenAI => "https://api.openai.com",
        }
    }

    /// Environment variable consulted when `api_key` is unset
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Ollama => None,
            LlmProvider::Claude => Some("ANTHROPIC_API_KEY"),
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
        }
    }
}

fn default_llm_timeout_secs() -> u64 {
    120
}

/// Aggregation and digest configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DigestConfig {
    /// Days of raw history to fetch
    #[serde(default = "default_days")]
    pub days: i64,

    /// Maximum conversations to scan
    #[serde(default = "default_chat_limit")]
    pub chat_limit: usize,

    /// Maximum messages fetched per conversation
    #[serde(default = "default_message_limit")]
    pub message_limit_per_chat: usize,

    /// Include muted conversations
    #[serde(default = "default_true")]
    pub include_muted: bool,

    /// Skip group conversations
    #[serde(default)]
    pub exclude_groups: bool,

    /// Number of conversations fetched at once (1 = sequential)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Length of the current and previous comparison periods, in days
    #[serde(default = "default_period_days")]
    pub period_days: i64,

    /// Age at which an unread message needs a reply, in days
    #[serde(default = "default_follow_up_days")]
    pub follow_up_days: i64,

    /// Maximum follow-ups reported
    #[serde(default = "default_follow_up_limit")]
    pub follow_up_limit: usize,

    /// Number of contacts/channels in the top lists
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            chat_limit: default_chat_limit(),
            message_limit_per_chat: default_message_limit(),
            include_muted: true,
            exclude_groups: false,
            concurrency: default_concurrency(),
            period_days: default_period_days(),
            follow_up_days: default_follow_up_days(),
            follow_up_limit: default_follow_up_limit(),
            top_n: default_top_n(),
        }
    }
}

impl DigestConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.period_days <= 0 {
            return Err(Error::Config(
                "digest.period_days must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("days", self.days),
            ("period_days", self.period_days),
            ("follow_up_days", self.follow_up_days),
        ] {
            if value > MAX_DAYS {
                return Err(Error::Config(format!(
                    "digest.{name} ({value}) must be at most {MAX_DAYS}"
                )));
            }
        }
        if self.days < 2 * self.period_days {
            return Err(Error::Config(format!(
                "digest.days ({}) must cover two periods of {} days",
                self.days, self.period_days
            )));
        }
        if self.chat_limit == 0 || self.message_limit_per_chat == 0 {
            return Err(Error::Config(
                "digest.chat_limit and digest.message_limit_per_chat must be at least 1"
                    .to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(Error::Config(
                "digest.concurrency must be at least 1".to_string(),
            ));
        }
        if self.follow_up_days < 0 {
            return Err(Error::Config(
                "digest.follow_up_days must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_days() -> i64 {
    14
}

fn default_chat_limit() -> usize {
    25
}

fn default_message_limit() -> usize {
    200
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    1
}

fn default_period_days() -> i64 {
    7
}

fn default_follow_up_days() -> i64 {
    3
}

fn default_follow_up_limit() -> usize {
    10
}

fn default_top_n() -> usize {
    5
}

/// Timeline paging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TimelineConfig {
    /// Messages requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    20
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also print warnings and errors to stderr
    #[serde(default)]
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            stderr: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Config::default()
        };

        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.digest.validate()?;
        Ok(config)
    }

    /// Apply environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(AUTH_TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.api.auth_token = Some(token);
            }
        }
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/inboxpulse/config.toml` (~/.config/inboxpulse/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("inboxpulse").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/inboxpulse/` (~/.local/state/inboxpulse/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("inboxpulse")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("inboxpulse.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:23373/v0");
        assert!(config.api.token().is_none());
        assert_eq!(config.digest.days, 14);
        assert_eq!(config.digest.chat_limit, 25);
        assert_eq!(config.digest.message_limit_per_chat, 200);
        assert_eq!(config.digest.concurrency, 1);
        assert_eq!(config.digest.period_days, 7);
        assert_eq!(config.timeline.page_size, 20);
        assert!(config.llm.is_none());
        assert!(config.digest.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[api]
base_url = "http://127.0.0.1:9999/v0"
auth_token = "  secret  "

[llm]
provider = "ollama"
model = "llama3.2"

[digest]
days = 28
period_days = 14
concurrency = 4
exclude_groups = true

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.api.base_url, "http://127.0.0.1:9999/v0");
        assert_eq!(config.api.token(), Some("secret"));
        let llm = config.llm.unwrap();
        assert_eq!(llm.provider, LlmProvider::Ollama);
        assert_eq!(llm.model, "llama3.2");
        assert_eq!(llm.timeout_secs, 120);
        assert_eq!(config.digest.days, 28);
        assert_eq!(config.digest.period_days, 14);
        assert_eq!(config.digest.concurrency, 4);
        assert!(config.digest.exclude_groups);
        assert!(config.digest.include_muted);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_llm_provider_endpoints() {
        assert_eq!(
            LlmProvider::Ollama.default_endpoint(),
            "http://localhost:11434"
        );
        assert_eq!(LlmProvider::Ollama.api_key_env(), None);
        assert_eq!(LlmProvider::OpenAI.api_key_env(), Some("OPENAI_API_KEY"));
    }

    #[test]
    fn test_digest_validation() {
        let short = DigestConfig {
            days: 10,
            ..Default::default()
        };
        assert!(short.validate().is_err());

        let sequential = DigestConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert!(sequential.validate().is_err());

        let custom = DigestConfig {
            days: 6,
            period_days: 3,
            ..Default::default()
        };
        assert!(custom.validate().is_ok());
    }

    #[test]
    fn test_digest_day_counts_are_bounded() {
        let huge_window = DigestConfig {
            days: 10_000_000_000_000,
            ..Default::default()
        };
        assert!(matches!(huge_window.validate(), Err(Error::Config(_))));

        // Would overflow when doubled
        let huge_period = DigestConfig {
            days: i64::MAX,
            period_days: i64::MAX,
            ..Default::default()
        };
        assert!(matches!(huge_period.validate(), Err(Error::Config(_))));

        let huge_follow_up = DigestConfig {
            follow_up_days: MAX_DAYS + 1,
            ..Default::default()
        };
        assert!(huge_follow_up.validate().is_err());

        let widest = DigestConfig {
            days: MAX_DAYS,
            period_days: MAX_DAYS / 2,
            ..Default::default()
        };
        assert!(widest.validate().is_ok());
    }

    #[test]
    fn test_blank_token_is_unset() {
        let api = ApiConfig {
            auth_token: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(api.token().is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timeline]\npage_size = 50").unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.timeline.page_size, 50);
    }

    #[test]
    fn test_load_from_rejects_invalid_digest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[digest]\ndays = 3").unwrap();

        assert!(matches!(
            Config::load_from(file.path()),
            Err(Error::Config(_))
        ));
    }
}
