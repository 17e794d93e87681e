//! # Retort
//!
//! A chat auto-responder: every incoming message is matched against an
//! ordered list of regular-expression rules and the first match's response
//! is sent back to the same channel.
//!
//! ```text
//! ┌──────────────┐  MessageEvent  ┌────────────┐  first match  ┌──────────┐
//! │   Adapter    │───────────────▶│ Dispatcher │──────────────▶│   Bot    │──▶ reply
//! │  (Discord)   │                │  (RuleSet) │               │ (REST)   │
//! └──────────────┘                └────────────┘               └──────────┘
//! ```
//!
//! - **Runtime**: loads settings and rules, starts adapters
//! - **Adapters**: platform gateways (Discord)
//! - **Dispatcher**: first-match rule evaluation, one task per message
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use retort::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = RetortRuntime::builder()
//!         .set("adapters.discord.token", std::env::var("DISCORD_TOKEN")?)
//!         .build()?;
//!     runtime.register_adapter::<DiscordAdapter>().await?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*, `yaml-config`: settings file formats
//! - `ws-client`, `http-client` *(default)*: transports the Discord adapter needs
//! - `json-log`: JSON log output

pub use retort_adapter_discord as discord;
pub use retort_core as core;
pub use retort_runtime as runtime;
pub use retort_transport as transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use retort_adapter_discord::{DiscordAdapter, DiscordConfig};
    pub use retort_core::{Bot, BoxedBot, Dispatcher, MessageEvent, Outcome, Rule, RuleSet};
    pub use retort_runtime::{LoggingBuilder, RetortRuntime, SpanEvents};
}
