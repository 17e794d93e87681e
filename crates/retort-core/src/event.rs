//! Platform-neutral inbound message events.

use serde::{Deserialize, Serialize};

/// A message received by the bot.
///
/// Adapters convert their platform's message payloads into this shape before
/// handing them to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Platform identifier of the message.
    pub message_id: String,
    /// Channel or conversation a reply is addressed to.
    pub channel_id: String,
    /// Identity of the author.
    pub author_id: String,
    /// Whether the author is an automated account.
    #[serde(default)]
    pub author_is_bot: bool,
    /// Text content.
    pub content: String,
}

impl MessageEvent {
    /// Creates a message event.
    pub fn new(
        message_id: impl Into<String>,
        channel_id: impl Into<String>,
        author_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            channel_id: channel_id.into(),
            author_id: author_id.into(),
            author_is_bot: false,
            content: content.into(),
        }
    }

    /// Returns whether `self_id` authored this message.
    pub fn is_from(&self, self_id: &str) -> bool {
        self.author_id == self_id
    }
}
