//! Transport capability traits.
//!
//! The runtime fills a [`TransportContext`] with whatever transports were
//! compiled in; adapters discover them in `on_start`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::connection::{BoxedConnectionHandler, ClientConfig, ConnectionHandle};
use crate::error::TransportResult;

/// WebSocket client capability.
#[async_trait]
pub trait WsClientCapability: Send + Sync {
    /// Connects to `url` and drives `handler` until the connection is closed.
    ///
    /// Returns once the first connection is established.
    async fn connect(
        &self,
        url: &str,
        handler: BoxedConnectionHandler,
        config: ClientConfig,
    ) -> TransportResult<ConnectionHandle>;
}

/// HTTP client capability.
#[async_trait]
pub trait HttpClientCapability: Send + Sync {
    /// POSTs `body` as JSON and returns the decoded JSON response.
    ///
    /// `authorization` is sent verbatim as the `Authorization` header.
    async fn post_json(
        &self,
        url: &str,
        authorization: Option<&str>,
        body: Value,
    ) -> TransportResult<Value>;
}

/// The set of transport capabilities available to adapters.
#[derive(Clone, Default)]
pub struct TransportContext {
    ws_client: Option<Arc<dyn WsClientCapability>>,
    http_client: Option<Arc<dyn HttpClientCapability>>,
}

impl TransportContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a WebSocket client capability.
    pub fn with_ws_client(mut self, capability: Arc<dyn WsClientCapability>) -> Self {
        self.ws_client = Some(capability);
        self
    }

    /// Adds an HTTP client capability.
    pub fn with_http_client(mut self, capability: Arc<dyn HttpClientCapability>) -> Self {
        self.http_client = Some(capability);
        self
    }

    /// Returns the WebSocket client capability, if available.
    pub fn ws_client(&self) -> Option<&Arc<dyn WsClientCapability>> {
        self.ws_client.as_ref()
    }

    /// Returns the HTTP client capability, if available.
    pub fn http_client(&self) -> Option<&Arc<dyn HttpClientCapability>> {
        self.http_client.as_ref()
    }
}

impl fmt::Debug for TransportContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportContext")
            .field("ws_client", &self.ws_client.is_some())
            .field("http_client", &self.http_client.is_some())
            .finish()
    }
}
