//! Settings for the Retort runtime.
//!
//! Settings are layered with figment from defaults, `retort.toml`,
//! `RETORT_*` environment variables and command-line overrides. The rules
//! themselves live in a separate JSON file named by the `rules` key.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{LogFormat, LogLevel, LogOutput, LoggingConfig, RetortConfig, SpanEventConfig};
pub use validation::validate_config;
