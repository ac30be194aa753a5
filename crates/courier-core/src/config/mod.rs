mod defaults;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::CourierError;
use defaults::*;

/// Environment variable that overrides `bot.token`.
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Top-level Courier configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Credentials and transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub token: String,
    /// API base URL, without trailing slash.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Timeout for one-shot calls (send, getFile, getMe).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for daily log files. Empty = stdout only.
    #[serde(default)]
    pub log_dir: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
            log_level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

impl BotConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Long-poll settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Server-side wait for `getUpdates`, in seconds.
    #[serde(default = "default_poll_timeout")]
    pub timeout_secs: u64,
    /// Maximum updates per batch (1-100).
    #[serde(default = "default_poll_limit")]
    pub limit: u32,
    /// Update kinds to receive. Empty = server default.
    #[serde(default)]
    pub allowed_updates: Vec<String>,
    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_poll_timeout(),
            limit: default_poll_limit(),
            allowed_updates: Vec::new(),
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_secs: default_backoff_max_secs(),
        }
    }
}

/// How the dispatcher orders handler work.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// One update at a time, in global arrival order.
    Sequential,
    /// Arrival order within a conversation, conversations in parallel.
    #[default]
    PerChat,
    /// Every update in its own task, no ordering.
    Concurrent,
}

/// Dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Capacity of the bounded update channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default)]
    pub mode: DispatchMode,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            mode: DispatchMode::default(),
        }
    }
}

/// Persisted offset store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            db_path: default_db_path(),
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Check that a token looks like `<bot id>:<secret>`.
pub fn validate_token(token: &str) -> Result<(), CourierError> {
    let Some((id, secret)) = token.split_once(':') else {
        return Err(CourierError::Config(
            "bot token must look like <id>:<secret>".into(),
        ));
    };
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(CourierError::Config("bot token id must be numeric".into()));
    }
    let secret_ok = !secret.is_empty()
        && secret
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !secret_ok {
        return Err(CourierError::Config(
            "bot token secret contains invalid characters".into(),
        ));
    }
    Ok(())
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist. A non-empty
/// `TELEGRAM_BOT_TOKEN` environment variable overrides `bot.token`.
pub fn load(path: &str) -> Result<Config, CourierError> {
    let path = Path::new(path);
    let mut config = if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    } else {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CourierError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| CourierError::Config(format!("failed to parse config: {}", e)))?
    };

    if let Ok(token) = std::env::var(TOKEN_ENV) {
        if !token.is_empty() {
            config.bot.token = token;
        }
    }

    Ok(config)
}
