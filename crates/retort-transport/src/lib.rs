//! # Retort Transport
//!
//! Network transport capability implementations for Retort.
//!
//! This crate provides concrete implementations of the capability traits
//! defined in `retort-core`, each behind a feature flag.
//!
//! ## Features
//!
//! - `ws-client`: WebSocket client capability (gateway connections)
//! - `http-client`: HTTP client capability (REST calls)
//! - `full`: All capabilities
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Adapter Layer      │  (Discord)
//! │  (uses capabilities)│
//! ├─────────────────────┤
//! │  retort-core        │  (capability traits)
//! ├─────────────────────┤
//! │  retort-transport   │  <- This crate (implementations)
//! ├─────────────────────┤
//! │  Network (TCP/HTTP) │
//! └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use retort_core::{ClientConfig, WsClientCapability};
//! use retort_transport::websocket::WsClientCapabilityImpl;
//!
//! let capability = WsClientCapabilityImpl::new();
//! let handle = capability
//!     .connect("wss://gateway.discord.gg/?v=10&encoding=json", handler, ClientConfig::default())
//!     .await?;
//! ```

pub mod http;
pub mod websocket;

#[cfg(feature = "http-client")]
pub use http::HttpClientCapabilityImpl;
#[cfg(feature = "ws-client")]
pub use websocket::WsClientCapabilityImpl;
