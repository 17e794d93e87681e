//! Discord bot session.
//!
//! `DiscordBot` is the [`Bot`] handed to the dispatcher with every message.
//! Its identity is filled in when the gateway sends `READY`; replies go out
//! through the REST API rather than the gateway connection.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Value, json};
use tracing::{debug, trace, warn};

use retort_core::{ApiError, ApiResult, Bot, HttpClientCapability, TransportError};

use crate::config::DiscordConfig;

// =============================================================================
// DiscordBot
// =============================================================================

/// A Discord bot session.
pub struct DiscordBot {
    /// Own user id, set on `READY`.
    self_id: RwLock<Option<String>>,
    /// Gateway session id, set on `READY`.
    session_id: RwLock<Option<String>>,
    http: Arc<dyn HttpClientCapability>,
    api_base: String,
    authorization: String,
}

impl DiscordBot {
    /// Creates a session that is not yet identified.
    pub fn new(config: &DiscordConfig, http: Arc<dyn HttpClientCapability>) -> Self {
        Self {
            self_id: RwLock::new(None),
            session_id: RwLock::new(None),
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            authorization: config.authorization(),
        }
    }

    /// Records the identity reported by `READY`.
    pub(crate) fn identify_as(&self, user_id: &str, session_id: &str) {
        *self.self_id.write() = Some(user_id.to_string());
        *self.session_id.write() = Some(session_id.to_string());
    }

    /// Returns the current gateway session id.
    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    fn messages_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{}/messages", self.api_base, channel_id)
    }
}

// =============================================================================
// Bot Trait Implementation
// =============================================================================

#[async_trait]
impl Bot for DiscordBot {
    fn self_id(&self) -> Option<String> {
        self.self_id.read().clone()
    }

    fn adapter_name(&self) -> &str {
        "discord"
    }

    async fn send_message(&self, channel_id: &str, text: &str) -> ApiResult<String> {
        let url = self.messages_url(channel_id);
        debug!(channel_id = %channel_id, "Creating message");

        let response = self
            .http
            .post_json(&url, Some(&self.authorization), json!({ "content": text }))
            .await
            .map_err(rejection)?;
        trace!(response = %response, "Create message response");

        // Discord accepted the message even if the body is not what we expect.
        match response.get("id").and_then(Value::as_str) {
            Some(id) => Ok(id.to_string()),
            None => {
                warn!(channel_id = %channel_id, "Message created but the response carried no id");
                Ok(String::new())
            }
        }
    }
}

/// Maps an HTTP error status onto Discord's `{code, message}` error body.
fn rejection(err: TransportError) -> ApiError {
    match err {
        TransportError::Status { status, body } => {
            let parsed: Option<Value> = serde_json::from_str(&body).ok();
            let code = parsed
                .as_ref()
                .and_then(|v| v.get("code"))
                .and_then(Value::as_i64)
                .unwrap_or(i64::from(status));
            let message = parsed
                .as_ref()
                .and_then(|v| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(body);
            ApiError::Rejected { code, message }
        }
        other => ApiError::Transport(other),
    }
}
