//! Connection handling and lifecycle types.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

use crate::error::{TransportError, TransportResult};

// =============================================================================
// Connection Handler
// =============================================================================

/// A handler for connection lifecycle events.
///
/// Implemented by adapters; driven by a transport capability.
#[async_trait]
pub trait ConnectionHandler: Send + Sync {
    /// Called after every successful (re)connection.
    async fn on_connect(&self, info: ConnectionInfo, connection: ConnectionHandle);

    /// Called when a frame is received.
    async fn on_message(&self, data: &[u8]);

    /// Called once the connection is closed for good.
    async fn on_disconnect(&self);
}

/// Boxed connection handler.
pub type BoxedConnectionHandler = Arc<dyn ConnectionHandler>;

/// Information about a connection.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// Connection protocol (ws, http, etc.).
    pub protocol: String,
    /// Additional metadata.
    pub metadata: HashMap<String, String>,
}

impl ConnectionInfo {
    /// Creates new connection info.
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            metadata: HashMap::new(),
        }
    }

    /// Adds metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Connection Handle
// =============================================================================

/// Handle to a client connection.
///
/// Cloning is cheap; all clones drive the same connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Sender for outgoing frames.
    message_tx: mpsc::Sender<Vec<u8>>,
    /// Asks the connection loop to drop and re-establish the connection.
    reconnect: Arc<Notify>,
    /// Cancelled when the connection should close for good.
    shutdown: CancellationToken,
}

impl ConnectionHandle {
    /// Creates a new connection handle.
    pub fn new(
        message_tx: mpsc::Sender<Vec<u8>>,
        reconnect: Arc<Notify>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            message_tx,
            reconnect,
            shutdown,
        }
    }

    /// Sends a frame through this connection.
    pub async fn send(&self, data: Vec<u8>) -> TransportResult<()> {
        self.message_tx
            .send(data)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    /// Sends a JSON frame.
    pub async fn send_json(&self, value: &Value) -> TransportResult<()> {
        let data = serde_json::to_vec(value)
            .map_err(|e| TransportError::SendFailed(format!("JSON serialization failed: {e}")))?;
        self.send(data).await
    }

    /// Requests a fresh connection to the same endpoint.
    pub fn reconnect(&self) {
        self.reconnect.notify_one();
    }

    /// Closes this connection.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Returns whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for client connections.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Whether to automatically reconnect on disconnect.
    pub auto_reconnect: bool,
    /// Maximum number of consecutive reconnection attempts (None = infinite).
    pub max_retries: Option<u32>,
    /// Initial delay between reconnection attempts.
    pub initial_delay: Duration,
    /// Maximum delay between reconnection attempts.
    pub max_delay: Duration,
    /// Backoff multiplier.
    pub backoff_multiplier: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_retries: None,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl ClientConfig {
    /// Creates a new client config with auto-reconnect disabled.
    pub fn no_reconnect() -> Self {
        Self {
            auto_reconnect: false,
            ..Default::default()
        }
    }

    /// Sets the maximum retry count.
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = Some(max);
        self
    }

    /// Returns the delay that follows `current` under exponential backoff.
    ///
    /// Never exceeds `max_delay`. A product that is not a valid duration
    /// (negative, NaN, overflowing) yields `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}
