pub mod brand;
pub mod logo;
pub mod provider;
pub mod stats;

pub use brand::{AssetFormat, BrandRecord, FormatEntry, LogoEntry, parse_brand_records};
pub use logo::{
    AutocompleteResult, CompanySummary, FALLBACK_CONTENT_TYPE, ImageMetadata, LogoImage,
    LogoSource, SearchResult, logo_proxy_path,
};
pub use provider::ProviderKind;
pub use stats::{
    BackendHealth, BackendStatus, CacheReport, CacheStats, ClearReport, HealthStatus,
    ProviderHealth, ServiceConfig, TierCounts,
};
