//! Unified error types for the Retort core.
//!
//! Runtime-level errors (configuration loading, adapter registration) are
//! defined in retort-runtime.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Rule Errors
// =============================================================================

/// A rule's pattern failed to compile as a regular expression.
#[derive(Debug, Clone, Error)]
#[error("invalid pattern `{pattern}`: {source}")]
pub struct PatternError {
    /// The offending pattern source.
    pub pattern: String,
    /// The compiler's diagnosis.
    #[source]
    pub source: regex::Error,
}

/// Errors that can occur while building a [`RuleSet`](crate::RuleSet).
///
/// All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum RuleSetError {
    /// The rules file could not be read.
    #[error("failed to read rules from {path}: {source}")]
    Read {
        /// Path of the rules file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The rules source is not a list of `{regex, response}` records.
    #[error("malformed rules: {0}")]
    Parse(#[from] serde_json::Error),

    /// A rule's pattern does not compile.
    #[error("rule #{index}: {source}")]
    Pattern {
        /// Declaration index of the rule (0-based).
        index: usize,
        /// The compile failure.
        #[source]
        source: PatternError,
    },
}

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The URL that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// Connection closed.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// Message send failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// The remote end answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// Transport not available.
    #[error("transport '{transport}' not available")]
    NotAvailable {
        /// The transport type that's not available.
        transport: &'static str,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Adapter Errors
// =============================================================================

/// Errors that can occur in adapter operations.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// Event parsing failed.
    #[error("failed to parse event: {reason}")]
    ParseError {
        /// Reason for failure.
        reason: String,
    },

    /// Internal adapter error.
    #[error("adapter error: {0}")]
    Internal(String),

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl AdapterError {
    /// Creates an internal adapter error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Creates a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError { reason: msg.into() }
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Error type for bot API calls, including outbound message sends.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The bot is not connected.
    #[error("bot is not connected")]
    NotConnected,
    /// The platform rejected the call.
    #[error("API error ({code}): {message}")]
    Rejected { code: i64, message: String },
    /// Failed to serialize/deserialize.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for rule set construction.
pub type RuleSetResult<T> = Result<T, RuleSetError>;
