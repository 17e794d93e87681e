//! Configuration types for the Discord adapter.
//!
//! Loaded from the `adapters.discord` table of `retort.toml`:
//!
//! ```toml
//! [adapters.discord]
//! token = "${DISCORD_TOKEN}"
//! intents = 37376
//!
//! [adapters.discord.reconnect]
//! auto_reconnect = true
//! initial_delay_ms = 1000
//! max_delay_ms = 60000
//! ```
//!
//! The token can also be supplied with `RETORT_ADAPTERS__DISCORD__TOKEN` or
//! the `--token` command-line flag.

use std::time::Duration;

use retort_core::ClientConfig;
use serde::{Deserialize, Serialize};

/// Gateway intent bits.
pub mod intents {
    /// Messages in guild channels.
    pub const GUILD_MESSAGES: u64 = 1 << 9;
    /// Direct messages.
    pub const DIRECT_MESSAGES: u64 = 1 << 12;
    /// Message content (privileged).
    pub const MESSAGE_CONTENT: u64 = 1 << 15;

    /// What the auto-responder needs to see message text everywhere.
    pub const DEFAULT: u64 = GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT;
}

/// Discord adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token, with or without the `Bot ` prefix.
    pub token: String,

    /// Gateway WebSocket URL.
    pub gateway_url: String,

    /// REST API base URL.
    pub api_base: String,

    /// Gateway intents bitfield.
    pub intents: u64,

    /// Reconnection policy for the gateway connection.
    pub reconnect: ReconnectConfig,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            gateway_url: "wss://gateway.discord.gg/?v=10&encoding=json".to_string(),
            api_base: "https://discord.com/api/v10".to_string(),
            intents: intents::DEFAULT,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl DiscordConfig {
    /// Returns the token without any `Bot ` prefix.
    pub fn bare_token(&self) -> &str {
        let token = self.token.trim();
        token.strip_prefix("Bot ").unwrap_or(token)
    }

    /// Returns the `Authorization` header value for REST calls.
    pub fn authorization(&self) -> String {
        format!("Bot {}", self.bare_token())
    }

    /// Returns whether a token has been configured.
    pub fn has_token(&self) -> bool {
        !self.bare_token().is_empty()
    }
}

/// Reconnection policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Reconnect after the gateway drops the connection.
    pub auto_reconnect: bool,

    /// Maximum consecutive attempts (unset = retry forever).
    pub max_retries: Option<u32>,

    /// Delay before the first attempt, in milliseconds.
    pub initial_delay_ms: u64,

    /// Upper bound on the delay, in milliseconds.
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier.
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_retries: None,
            initial_delay_ms: 1000,
            max_delay_ms: 60_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Checks that the backoff can be computed.
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_delay_ms == 0 {
            return Err("reconnect.initial_delay_ms must be greater than 0".into());
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err("reconnect.max_delay_ms must be at least initial_delay_ms".into());
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(format!(
                "reconnect.backoff_multiplier must be a finite number of at least 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        Ok(())
    }

    /// Converts to the transport's client config.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            auto_reconnect: self.auto_reconnect,
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DiscordConfig::default();
        assert!(!config.has_token());
        assert_eq!(config.intents, 37376);
        assert!(config.gateway_url.starts_with("wss://"));
    }

    #[test]
    fn test_token_prefix_is_normalized() {
        let plain = DiscordConfig {
            token: "abc".into(),
            ..Default::default()
        };
        let prefixed = DiscordConfig {
            token: "Bot abc".into(),
            ..Default::default()
        };
        assert_eq!(plain.authorization(), "Bot abc");
        assert_eq!(prefixed.authorization(), "Bot abc");
        assert_eq!(prefixed.bare_token(), "abc");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: DiscordConfig =
            serde_json::from_str(r#"{"token": "t", "reconnect": {"max_retries": 3}}"#).unwrap();
        assert_eq!(config.bare_token(), "t");
        assert_eq!(config.reconnect.max_retries, Some(3));
        assert_eq!(config.reconnect.initial_delay_ms, 1000);
        assert_eq!(config.api_base, "https://discord.com/api/v10");
    }

    #[test]
    fn test_reconnect_validation() {
        assert!(ReconnectConfig::default().validate().is_ok());

        for multiplier in [-1.0, 0.5, f64::NAN, f64::INFINITY] {
            let config = ReconnectConfig {
                backoff_multiplier: multiplier,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{multiplier} accepted");
        }

        let inverted = ReconnectConfig {
            initial_delay_ms: 10_000,
            max_delay_ms: 1_000,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let zero = ReconnectConfig {
            initial_delay_ms: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }
}
