//! Retort runtime: settings, logging and orchestration.
//!
//! This crate provides:
//! - Layered settings loading (`ConfigLoader`, `RetortConfig`)
//! - Logging setup (`LoggingBuilder`)
//! - The runtime that loads the rules, starts adapters and dispatches
//!   inbound messages (`RetortRuntime`)
//!
//! # Transports
//!
//! The runtime hands adapters every transport enabled through cargo
//! features:
//!
//! - `ws-client`: WebSocket client capability
//! - `http-client`: HTTP client capability
//!
//! ```ignore
//! use retort_runtime::RetortRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = RetortRuntime::builder().build()?;
//!     runtime.register_adapter::<MyAdapter>().await?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, LoggingConfig, Profile, RetortConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{RetortRuntime, RuntimeBuilder};
