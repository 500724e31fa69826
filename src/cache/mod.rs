//! Tiered logo cache
//!
//! - `keys`: deterministic key derivation per tier
//! - `backend`: the `CacheBackend` seam and its Redis implementation
//! - `memory`: in-process backend for tests and local runs
//! - `store`: TTL-aware tiered store with degraded mode

pub mod backend;
pub mod keys;
pub mod memory;
pub mod store;

pub use backend::{CacheBackend, RedisBackend, SCAN_PAGE_SIZE, ScanPage};
pub use keys::{CacheKey, CacheTier, KeyDeriver, SearchScope, derive_key, normalize_company_name};
pub use memory::InMemoryBackend;
pub use store::TieredStore;
