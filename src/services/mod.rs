pub mod brand_api;
pub mod brand_resolver;
pub mod cache_admin;
pub mod config_store;
pub mod image_fetcher;
pub mod logo_service;

pub use brand_api::{BrandApi, HttpBrandApi};
pub use brand_resolver::BrandResolver;
pub use cache_admin::CacheAdmin;
pub use config_store::ConfigStore;
pub use image_fetcher::{
    DownloadedAsset, HttpLogoDownloader, ImageFetcher, LogoDownloader, normalize_content_type,
};
pub use logo_service::LogoService;
