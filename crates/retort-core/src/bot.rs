//! Bot trait.
//!
//! A [`Bot`] is the connected session as seen by the dispatcher: it knows
//! its own identity and can send a text message to a channel.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ApiResult;

/// An active bot session.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Returns the session's own user identity.
    ///
    /// `None` until the platform has identified the session.
    fn self_id(&self) -> Option<String>;

    /// Returns the adapter name (e.g. `"discord"`).
    fn adapter_name(&self) -> &str;

    /// Sends `text` to `channel_id`, returning the new message's identifier
    /// (empty when the platform accepted the message without reporting one).
    async fn send_message(&self, channel_id: &str, text: &str) -> ApiResult<String>;
}

/// Shared, type-erased bot handle.
pub type BoxedBot = Arc<dyn Bot>;
