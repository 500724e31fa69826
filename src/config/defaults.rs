/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Redis defaults
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";
pub const DEFAULT_REDIS_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_REDIS_OPERATION_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_KEY_NAMESPACE: &str = "logo";

// Tier TTLs
pub const DEFAULT_IMAGE_TTL_SECS: u64 = 30 * 24 * 60 * 60; // 30 days
pub const DEFAULT_SEARCH_TTL_SECS: u64 = 24 * 60 * 60; // 1 day
pub const DEFAULT_AUTOCOMPLETE_TTL_SECS: u64 = 6 * 60 * 60; // 6 hours

// HTTP defaults
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_IMAGE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024; // 5MB

// Provider defaults
pub const DEFAULT_BRANDFETCH_SEARCH_URL: &str = "https://api.brandfetch.io/v2/search/{query}";
pub const DEFAULT_BRANDFETCH_HEALTH_URL: &str = "https://api.brandfetch.io/v2";
pub const DEFAULT_LOGO_DEV_SEARCH_URL: &str = "https://api.logo.dev/search?q={query}";
pub const DEFAULT_LOGO_DEV_HEALTH_URL: &str = "https://api.logo.dev";
pub const BRANDFETCH_API_KEY_ENV: &str = "BRANDFETCH_API_KEY";
pub const LOGO_DEV_API_KEY_ENV: &str = "LOGO_DEV_API_KEY";

// Resolver defaults
pub const DEFAULT_AUTOCOMPLETE_LIMIT: usize = 10;

// Logging defaults
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Config file
pub const DEFAULT_CONFIG_FILE: &str = "logo-cache.toml";
pub const CONFIG_FILE_ENV: &str = "LOGO_CACHE_CONFIG";
