//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Settings or rules could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Adapter configuration deserialization failed.
    #[error("Failed to deserialize adapter config: {0}")]
    AdapterConfigDeserialize(String),

    /// Adapter error.
    #[error("Adapter error: {0}")]
    Adapter(#[from] retort_core::AdapterError),

    /// An adapter failed to start.
    #[error("Adapter '{adapter}' failed to start: {reason}")]
    AdapterStart { adapter: String, reason: String },

    /// No adapter was registered before starting.
    #[error("No adapters registered")]
    NoAdapters,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
