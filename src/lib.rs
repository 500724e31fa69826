//! Company logo resolution with tiered caching
//!
//! Given a free-text company name, [`services::LogoService`] returns logo
//! image bytes and their content type. Lookups go through a Redis-backed
//! tiered cache first and fall back to an upstream brand-data API plus an
//! image download, caching every stage on the way out.

pub mod cache;
pub mod config;
pub mod errors;
pub mod models;
pub mod observability;
pub mod services;
pub mod utils;

pub use config::Config;
pub use errors::{LogoCacheError, LogoCacheResult};
pub use services::LogoService;
