//! Centralized error handling for the brand logo cache
//!
//! Errors are split by the layer that produces them:
//!
//! - **Cache Errors**: backend (Redis) connectivity, timeouts and payload decoding
//! - **Origin Errors**: brand-data API and image download failures
//! - **Logo Cache Errors**: the public error type returned to administrative callers
//!
//! Only [`LogoCacheError::InvalidConfig`] is ever surfaced by the administrative
//! API. Cache and origin errors are logged and collapsed into "not found" on the
//! resolution path.
//!
//! # Usage
//!
//! ```rust
//! use brand_logo_cache::errors::{LogoCacheError, LogoCacheResult};
//!
//! fn example_function() -> LogoCacheResult<String> {
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using LogoCacheError
pub type LogoCacheResult<T> = Result<T, LogoCacheError>;

/// Convenience type alias for cache backend Results
pub type CacheResult<T> = Result<T, CacheError>;

/// Convenience type alias for origin Results
pub type OriginResult<T> = Result<T, OriginError>;
