//! HTTP transport capabilities.

#[cfg(feature = "http-client")]
mod client;
#[cfg(feature = "http-client")]
pub use client::HttpClientCapabilityImpl;
