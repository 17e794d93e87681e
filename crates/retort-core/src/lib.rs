//! # Retort Core
//!
//! The core of the Retort auto-responder: the rule store, the dispatcher,
//! and the contracts adapters and transports implement.
//!
//! ## Rule Store
//!
//! A [`RuleSet`] is an ordered list of [`Rule`]s, each pairing a regular
//! expression with a literal response. Declaration order is priority.
//!
//! ## Dispatcher
//!
//! For every inbound [`MessageEvent`], the [`Dispatcher`] ignores the bot's
//! own messages, finds the first rule matching the text, and sends its
//! response through the [`Bot`].
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌─────────┐
//! │   Adapter   │────▶│ Dispatcher │────▶│ RuleSet │
//! │  (Discord)  │     │            │     └─────────┘
//! └─────────────┘     └─────┬──────┘
//!        ▲                  │ send_message
//!        └──────── Bot ◀────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use retort_core::{Dispatcher, MessageEvent, RuleSet};
//! use std::sync::Arc;
//!
//! let rules = RuleSet::from_json(r#"[{"regex": "^hello", "response": "hi!"}]"#)?;
//! let dispatcher = Dispatcher::new(Arc::new(rules));
//!
//! let event = MessageEvent::new("1", "general", "alice", "hello there");
//! dispatcher.handle(&event, bot.as_ref()).await;
//! ```

pub mod adapter;
pub mod bot;
pub mod capability;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod rule;

pub use adapter::{Adapter, AdapterContext, BoxedAdapter, ConfigurableAdapter, EventSink};
pub use bot::{Bot, BoxedBot};
pub use capability::{HttpClientCapability, TransportContext, WsClientCapability};
pub use connection::{
    BoxedConnectionHandler, ClientConfig, ConnectionHandle, ConnectionHandler, ConnectionInfo,
};
pub use dispatcher::{Dispatcher, Outcome};
pub use error::{
    AdapterError, AdapterResult, ApiError, ApiResult, PatternError, RuleSetError, RuleSetResult,
    TransportError, TransportResult,
};
pub use event::MessageEvent;
pub use rule::{Rule, RuleSet};
