//! Discord adapter for Retort.
//!
//! Connects to the Discord gateway over WebSocket, identifies with a bot
//! token, and turns `MESSAGE_CREATE` dispatches into
//! [`MessageEvent`](retort_core::MessageEvent)s. Replies are sent with the
//! REST `POST /channels/{id}/messages` endpoint.
//!
//! Needs the `ws-client` and `http-client` transports.
//!
//! # Configuration
//!
//! ```toml
//! [adapters.discord]
//! token = "..."
//! ```
//!
//! See [`DiscordConfig`] for every option.

pub mod adapter;
pub mod bot;
pub mod config;
pub mod model;

pub use adapter::DiscordAdapter;
pub use bot::DiscordBot;
pub use config::{DiscordConfig, ReconnectConfig, intents};
