//! Error type definitions for the brand logo cache
//!
//! This module defines the error types used throughout the crate. Backend and
//! origin failures are environment conditions and never reach the caller of a
//! resolution; they exist so the failure detail can be logged precisely.

use thiserror::Error;

/// Top-level error type returned to administrative callers
#[derive(Error, Debug)]
pub enum LogoCacheError {
    /// The caller asked for a provider outside the supported set
    #[error("Invalid provider '{provider}': expected one of {}", supported.join(", "))]
    InvalidConfig {
        provider: String,
        supported: Vec<String>,
    },

    /// Startup configuration is unusable
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Cache backend errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Upstream brand-data or image errors
    #[error("Origin error: {0}")]
    Origin(#[from] OriginError),
}

/// Cache backend specific errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// No backend connection is available (degraded mode)
    #[error("Cache backend unavailable")]
    Unavailable,

    /// Errors reported by the Redis client
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A backend operation exceeded its time budget
    #[error("Cache operation timed out: {operation}")]
    Timeout { operation: String },

    /// Stored payloads that could not be (de)serialized
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Upstream origin specific errors
#[derive(Error, Debug)]
pub enum OriginError {
    /// Network-level failures, including timeouts
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status from the origin
    #[error("HTTP error: {status} - {url}")]
    Status { status: u16, url: String },

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Downloaded payload is not labelled as an image
    #[error("Not an image: content-type '{content_type}'")]
    NotImage { content_type: String },

    /// Downloaded payload exceeded the configured size limit
    #[error("Payload too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },

    /// The active provider has no API key configured
    #[error("Missing credentials for provider {provider}")]
    MissingCredentials { provider: String },
}

/// Convenience methods for creating common error types
impl LogoCacheError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid provider error listing the accepted identifiers
    pub fn invalid_provider<S: Into<String>>(provider: S, supported: &[&str]) -> Self {
        Self::InvalidConfig {
            provider: provider.into(),
            supported: supported.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CacheError {
    /// Create a timeout error for the named backend operation
    pub fn timeout<S: Into<String>>(operation: S) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }
}
