//! Adapter trait and context.
//!
//! Adapters bridge a chat platform with the dispatcher. In `on_start` an
//! adapter discovers the transports it needs, opens its connections, and
//! feeds every inbound message to [`AdapterContext::dispatch`]:
//!
//! ```rust,ignore
//! #[async_trait]
//! impl Adapter for MyAdapter {
//!     fn name() -> &'static str { "my-platform" }
//!
//!     async fn on_start(&self, ctx: &mut AdapterContext) -> anyhow::Result<()> {
//!         let ws = ctx.transport().ws_client().context("ws-client transport missing")?;
//!         let handler = MyConnectionHandler::new(ctx.event_sink());
//!         let handle = ws.connect("wss://example.com", handler, ClientConfig::default()).await?;
//!         ctx.add_connection(handle);
//!         Ok(())
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::bot::BoxedBot;
use crate::capability::TransportContext;
use crate::connection::ConnectionHandle;
use crate::event::MessageEvent;

/// Receives inbound messages from adapters.
///
/// The runtime's sink spawns one dispatch task per event and returns
/// immediately.
pub type EventSink = Arc<dyn Fn(MessageEvent, BoxedBot) + Send + Sync>;

/// Context provided to adapters during start-up and shutdown.
pub struct AdapterContext {
    /// Available transport capabilities.
    transport: TransportContext,
    /// Where inbound messages go.
    sink: EventSink,
    /// Active connection handles.
    connections: Vec<ConnectionHandle>,
}

impl AdapterContext {
    /// Creates a new adapter context.
    pub fn new(transport: TransportContext, sink: EventSink) -> Self {
        Self {
            transport,
            sink,
            connections: Vec::new(),
        }
    }

    /// Returns a reference to the transport context.
    pub fn transport(&self) -> &TransportContext {
        &self.transport
    }

    /// Returns a clone of the event sink, for connection handlers.
    pub fn event_sink(&self) -> EventSink {
        Arc::clone(&self.sink)
    }

    /// Hands one inbound message to the runtime.
    pub fn dispatch(&self, event: MessageEvent, bot: BoxedBot) {
        (self.sink)(event, bot);
    }

    /// Registers a connection handle.
    pub fn add_connection(&mut self, handle: ConnectionHandle) {
        self.connections.push(handle);
    }

    /// Returns the registered connections.
    pub fn connections(&self) -> &[ConnectionHandle] {
        &self.connections
    }

    /// Closes every registered connection.
    pub fn close_connections(&mut self) {
        for handle in self.connections.drain(..) {
            handle.close();
        }
    }
}

impl fmt::Debug for AdapterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterContext")
            .field("transport", &self.transport)
            .field("connections", &self.connections.len())
            .finish()
    }
}

/// The core adapter trait.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Returns the adapter name (e.g., "discord").
    ///
    /// The name also locates the adapter's settings table:
    ///
    /// ```toml
    /// [adapters.discord]  # <- returned by Adapter::name()
    /// token = "..."
    /// ```
    fn name() -> &'static str
    where
        Self: Sized;

    /// Called when the adapter should start.
    async fn on_start(&self, ctx: &mut AdapterContext) -> anyhow::Result<()>;

    /// Called when the adapter is shutting down.
    ///
    /// The default implementation closes every registered connection.
    async fn on_shutdown(&self, ctx: &mut AdapterContext) -> anyhow::Result<()> {
        ctx.close_connections();
        Ok(())
    }
}

/// A boxed adapter trait object.
pub type BoxedAdapter = Arc<dyn Adapter>;

/// Trait for adapters that can be created from configuration.
pub trait ConfigurableAdapter: Adapter {
    /// The configuration type, deserialized from `adapters.<name>`.
    type Config: serde::de::DeserializeOwned + Default;

    /// Creates an adapter instance from its deserialized configuration.
    fn from_config(config: Self::Config) -> crate::AdapterResult<Arc<Self>>
    where
        Self: Sized;
}
