//! Configuration for the Herald notification engine.
//!
//! Settings come from a TOML file, with `HERALD_`-prefixed environment
//! variables overriding individual fields. Every field has a default, so an
//! empty file (or no file at all) yields a usable configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use herald_core::{DeliveryTier, Severity};

/// Error types for configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level Herald configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeraldConfig {
    pub notifications: NotifyConfig,
    pub transport: TransportConfig,
}

/// Settings for the routing and digest engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Minutes between scheduled digest flushes.
    pub flush_interval_minutes: u64,

    /// Minimum severity a CriticalOnly subscriber receives immediately.
    pub critical_level: Severity,

    /// Tier applied when a subscriber record has no explicit tier.
    pub default_tier: DeliveryTier,

    /// Maximum size of one outgoing message; longer digests are split.
    pub max_message_len: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            flush_interval_minutes: 60,
            critical_level: Severity::Error,
            default_tier: DeliveryTier::Realtime,
            max_message_len: 4096,
        }
    }
}

impl NotifyConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_minutes * 60)
    }
}

/// Settings for the outgoing transport adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Telegram bot token; empty means no Telegram transport is configured.
    pub bot_token: String,

    /// API base, overridable for tests.
    pub api_base: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

impl HeraldConfig {
    /// Load configuration from a TOML file, then apply environment
    /// overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::from_toml(&raw)?;
        config.apply_env_overrides()?;
        config.validate()?;
        debug!(
            flush_interval_minutes = config.notifications.flush_interval_minutes,
            critical_level = %config.notifications.critical_level,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parse configuration from a TOML string (no env overrides).
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| ConfigError::parse(e.to_string()))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("HERALD_FLUSH_INTERVAL_MINUTES") {
            self.notifications.flush_interval_minutes = value
                .parse()
                .map_err(|_| ConfigError::parse(format!("HERALD_FLUSH_INTERVAL_MINUTES: {value}")))?;
        }
        if let Ok(value) = std::env::var("HERALD_CRITICAL_LEVEL") {
            self.notifications.critical_level = value
                .parse()
                .map_err(|_| ConfigError::parse(format!("HERALD_CRITICAL_LEVEL: {value}")))?;
        }
        if let Ok(value) = std::env::var("HERALD_DEFAULT_TIER") {
            self.notifications.default_tier = value
                .parse()
                .map_err(|_| ConfigError::parse(format!("HERALD_DEFAULT_TIER: {value}")))?;
        }
        if let Ok(value) = std::env::var("HERALD_MAX_MESSAGE_LEN") {
            self.notifications.max_message_len = value
                .parse()
                .map_err(|_| ConfigError::parse(format!("HERALD_MAX_MESSAGE_LEN: {value}")))?;
        }
        if let Ok(value) = std::env::var("HERALD_BOT_TOKEN") {
            self.transport.bot_token = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.notifications.flush_interval_minutes == 0 {
            return Err(ConfigError::validation("flush_interval_minutes must be positive"));
        }
        if self.notifications.max_message_len == 0 {
            return Err(ConfigError::validation("max_message_len must be positive"));
        }
        Ok(())
    }
}
