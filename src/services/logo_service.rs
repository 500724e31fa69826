//! Entry point used by request handlers
//!
//! One `LogoService` is built at startup and shared by handle; cloning it is
//! cheap and every clone talks to the same backend connections and provider
//! selection.

use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use super::brand_api::{BrandApi, HttpBrandApi};
use super::brand_resolver::BrandResolver;
use super::cache_admin::CacheAdmin;
use super::config_store::ConfigStore;
use super::image_fetcher::{HttpLogoDownloader, ImageFetcher, LogoDownloader};
use crate::cache::{SearchScope, TieredStore, normalize_company_name};
use crate::config::Config;
use crate::errors::LogoCacheResult;
use crate::models::{
    AutocompleteResult, CacheReport, CacheStats, ClearReport, LogoImage, ServiceConfig,
};
use crate::observability::LogoMetrics;
use crate::utils::HttpClientFactory;

/// Lookups in flight at once for a batch
const BATCH_CONCURRENCY: usize = 4;

#[derive(Clone)]
pub struct LogoService {
    store: TieredStore,
    config_store: ConfigStore,
    resolver: Arc<BrandResolver>,
    fetcher: Arc<ImageFetcher>,
    admin: Arc<CacheAdmin>,
    metrics: LogoMetrics,
    autocomplete_limit: usize,
}

impl LogoService {
    /// Connect to the backend, hydrate the provider and build HTTP clients
    ///
    /// An unreachable backend is not an error; the service starts without
    /// caching.
    pub async fn from_config(config: &Config, metrics: LogoMetrics) -> LogoCacheResult<Self> {
        config.validate()?;

        let store = TieredStore::connect(config, metrics).await;
        let config_store = ConfigStore::new(store.clone(), config.resolver.default_provider);
        config_store.load().await;

        let factory = HttpClientFactory::from_config(&config.http);
        let api = Arc::new(HttpBrandApi::new(
            &factory,
            &config.http,
            config.providers.clone(),
            config_store.clone(),
        )?);
        let downloader = Arc::new(HttpLogoDownloader::new(&factory, config.http.image_timeout)?);

        info!(
            "Logo service ready (backend: {}, provider: {})",
            store.backend_name(),
            config_store.get().await
        );
        Ok(Self::new(config, store, config_store, api, downloader))
    }

    /// Assemble from already-built parts
    pub fn new(
        config: &Config,
        store: TieredStore,
        config_store: ConfigStore,
        api: Arc<dyn BrandApi>,
        downloader: Arc<dyn LogoDownloader>,
    ) -> Self {
        let resolver = BrandResolver::new(api.clone(), store.clone(), &config.resolver.overrides);
        let fetcher = ImageFetcher::new(downloader, store.clone(), config.http.max_image_bytes);
        let admin = CacheAdmin::new(store.clone(), api);

        Self {
            metrics: store.metrics().clone(),
            store,
            config_store,
            resolver: Arc::new(resolver),
            fetcher: Arc::new(fetcher),
            admin: Arc::new(admin),
            autocomplete_limit: config.resolver.autocomplete_limit,
        }
    }

    /// Logo bytes and content type for a company name, or `None`
    ///
    /// Never fails: backend and origin problems read as "not found".
    pub async fn resolve_logo(&self, company_name: &str) -> Option<LogoImage> {
        self.resolve_in_scope(SearchScope::Direct, company_name)
            .await
    }

    /// Like [`resolve_logo`](Self::resolve_logo) for a name picked from
    /// autocomplete suggestions
    pub async fn resolve_logo_from_suggestion(&self, company_name: &str) -> Option<LogoImage> {
        self.resolve_in_scope(SearchScope::Suggestion, company_name)
            .await
    }

    async fn resolve_in_scope(&self, scope: SearchScope, company_name: &str) -> Option<LogoImage> {
        let name = company_name.trim();
        if name.is_empty() {
            return None;
        }
        self.metrics.record_lookup();

        if let Some(image) = self.store.get_image(name).await {
            return Some(image);
        }

        let result = self.resolver.resolve_scoped(scope, name).await?;
        match scope {
            SearchScope::Direct => {
                self.fetcher
                    .fetch_and_cache_as(&result.url, name, &result.resolved_company_name, result.source)
                    .await
            }
            // The image tier answers direct lookups; only they may fill it
            SearchScope::Suggestion => self.fetcher.fetch_checked(&result.url, name).await,
        }
    }

    /// Resolve several names concurrently
    ///
    /// Names equal after normalization are looked up once. Every input name
    /// appears in the returned map.
    pub async fn resolve_logos<S: AsRef<str>>(&self, company_names: &[S]) -> BTreeMap<String, Option<LogoImage>> {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = company_names
            .iter()
            .map(|name| name.as_ref().trim())
            .filter(|name| !name.is_empty() && seen.insert(normalize_company_name(name)))
            .collect();
        debug!("Batch of {} names, {} distinct", company_names.len(), unique.len());

        let resolved: HashMap<String, Option<LogoImage>> = stream::iter(unique)
            .map(|name| async move { (normalize_company_name(name), self.resolve_logo(name).await) })
            .buffer_unordered(BATCH_CONCURRENCY)
            .collect()
            .await;

        company_names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let image = resolved.get(&normalize_company_name(name)).cloned().flatten();
                (name.to_string(), image)
            })
            .collect()
    }

    /// Company suggestions while typing; `limit` defaults to the configured one
    pub async fn search_companies(&self, query: &str, limit: Option<usize>) -> AutocompleteResult {
        self.resolver
            .suggest(query, limit.unwrap_or(self.autocomplete_limit))
            .await
    }

    pub async fn clear_cache(&self, company_name: Option<&str>) -> ClearReport {
        self.admin.clear(company_name).await
    }

    pub async fn get_stats(&self) -> CacheStats {
        self.admin.stats().await
    }

    pub async fn health(&self) -> CacheReport {
        self.admin.report().await
    }

    pub async fn get_config(&self) -> ServiceConfig {
        self.config_store.service_config().await
    }

    /// Switch the active provider; unsupported names are an error
    pub async fn set_config(&self, provider: &str) -> LogoCacheResult<ServiceConfig> {
        self.config_store.set(provider).await?;
        Ok(self.get_config().await)
    }
}
