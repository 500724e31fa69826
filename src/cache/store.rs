//! Tier-aware cache store
//!
//! Wraps a [`CacheBackend`] with key derivation, per-tier TTLs and JSON
//! (de)serialization. When no backend could be reached at construction the
//! store runs degraded: reads miss, writes are skipped, and nothing here
//! raises to the resolution path.

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::backend::{CacheBackend, RedisBackend};
use super::keys::{CacheKey, CacheTier, KeyDeriver, SearchScope};
use crate::config::{Config, TtlConfig};
use crate::errors::{CacheError, CacheResult};
use crate::models::{
    AutocompleteResult, BackendStatus, CacheStats, ClearReport, FALLBACK_CONTENT_TYPE,
    ImageMetadata, LogoImage, LogoSource, SearchResult, TierCounts,
};
use crate::observability::LogoMetrics;

/// Image keys whose memory usage is measured for the footprint estimate
const STATS_MEMORY_SAMPLE: usize = 50;
/// Keys returned in stats for operator inspection
const STATS_SAMPLE_KEYS: usize = 10;
/// Keys per DEL during a full clear
const DELETE_BATCH_SIZE: usize = 500;

#[derive(Clone)]
pub struct TieredStore {
    backend: Option<Arc<dyn CacheBackend>>,
    keys: KeyDeriver,
    ttl: TtlConfig,
    metrics: LogoMetrics,
}

impl TieredStore {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        keys: KeyDeriver,
        ttl: TtlConfig,
        metrics: LogoMetrics,
    ) -> Self {
        Self {
            backend: Some(backend),
            keys,
            ttl,
            metrics,
        }
    }

    /// Store with no backend; every read misses and every write is skipped
    pub fn degraded(keys: KeyDeriver, ttl: TtlConfig, metrics: LogoMetrics) -> Self {
        Self {
            backend: None,
            keys,
            ttl,
            metrics,
        }
    }

    /// Connect to Redis, falling back to degraded mode when unreachable
    pub async fn connect(config: &Config, metrics: LogoMetrics) -> Self {
        let keys = KeyDeriver::new(config.redis.key_namespace.as_str());
        match RedisBackend::connect(&config.redis).await {
            Ok(backend) => Self::new(Arc::new(backend), keys, config.ttl.clone(), metrics),
            Err(e) => {
                warn!(
                    "Cache backend unreachable at {}, continuing without cache: {}",
                    config.redis.url, e
                );
                Self::degraded(keys, config.ttl.clone(), metrics)
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.as_ref().map_or("none", |b| b.name())
    }

    pub fn keys(&self) -> &KeyDeriver {
        &self.keys
    }

    pub fn metrics(&self) -> &LogoMetrics {
        &self.metrics
    }

    /// Round-trip latency to the backend
    pub async fn ping(&self) -> CacheResult<Duration> {
        let backend = self.backend.as_ref().ok_or(CacheError::Unavailable)?;
        let started = Instant::now();
        backend.ping().await?;
        Ok(started.elapsed())
    }

    /// Cached image for a company name
    ///
    /// The content type comes from the metadata sidecar. A missing or
    /// unusable sidecar does not turn the hit into a miss; the blob is served
    /// as `image/png`.
    pub async fn get_image(&self, company_name: &str) -> Option<LogoImage> {
        let backend = self.backend.as_ref()?;
        let key = self.keys.derive(CacheTier::Image, company_name);

        let bytes = match backend.get_bytes(key.as_str()).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("Image cache miss: {}", key);
                return None;
            }
            Err(e) => {
                warn!("Image cache read failed for {}: {}", key, e);
                return None;
            }
        };

        let content_type = self
            .get_image_metadata(company_name)
            .await
            .map(|metadata| metadata.content_type)
            .filter(|content_type| content_type.starts_with("image/"))
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

        debug!("Image cache hit: {} ({} bytes)", key, bytes.len());
        self.metrics.record_cache_hit(CacheTier::Image);
        Some(LogoImage::new(bytes, content_type))
    }

    pub async fn get_image_metadata(&self, company_name: &str) -> Option<ImageMetadata> {
        let key = self.keys.derive(CacheTier::Metadata, company_name);
        self.get_json(&key).await
    }

    /// Write an image blob and its metadata together under the image TTL
    ///
    /// Either both keys are written or neither is; on error nothing should be
    /// assumed cached.
    pub async fn put_image(
        &self,
        company_name: &str,
        image: &LogoImage,
        resolved_name: &str,
        source: LogoSource,
    ) -> CacheResult<()> {
        let backend = self.backend.as_ref().ok_or(CacheError::Unavailable)?;

        let metadata = ImageMetadata {
            company_name: resolved_name.to_string(),
            source,
            content_type: image.content_type.clone(),
            cached_at: Utc::now().timestamp(),
            size_bytes: image.size_bytes() as u64,
        };

        let entries = vec![
            (
                self.keys.derive(CacheTier::Image, company_name).into_string(),
                image.bytes.to_vec(),
            ),
            (
                self.keys
                    .derive(CacheTier::Metadata, company_name)
                    .into_string(),
                serde_json::to_vec(&metadata)?,
            ),
        ];

        backend
            .set_bytes_atomic(&entries, Some(self.ttl.image))
            .await?;
        debug!(
            "Cached image for '{}' ({} bytes, {})",
            company_name,
            image.size_bytes(),
            image.content_type
        );
        Ok(())
    }

    pub async fn get_search(&self, scope: SearchScope, company_name: &str) -> Option<SearchResult> {
        let key = self.keys.derive_search(scope, company_name);
        let result = self.get_json(&key).await;
        if result.is_some() {
            self.metrics.record_cache_hit(CacheTier::Search);
        }
        result
    }

    pub async fn put_search(&self, scope: SearchScope, company_name: &str, result: &SearchResult) {
        let key = self.keys.derive_search(scope, company_name);
        self.put_json(&key, result, self.ttl.search).await;
    }

    pub async fn get_autocomplete(&self, query: &str) -> Option<AutocompleteResult> {
        let key = self.keys.derive(CacheTier::Autocomplete, query);
        let result = self.get_json(&key).await;
        if result.is_some() {
            self.metrics.record_cache_hit(CacheTier::Autocomplete);
        }
        result
    }

    pub async fn put_autocomplete(&self, query: &str, result: &AutocompleteResult) {
        let key = self.keys.derive(CacheTier::Autocomplete, query);
        self.put_json(&key, result, self.ttl.autocomplete).await;
    }

    /// Persisted provider identifier, if one was ever stored
    pub async fn get_provider(&self) -> CacheResult<Option<String>> {
        let backend = self.backend.as_ref().ok_or(CacheError::Unavailable)?;
        backend.get_text(&self.keys.provider_config_key()).await
    }

    /// Persist the provider identifier without expiration
    pub async fn put_provider(&self, provider: &str) -> CacheResult<()> {
        let backend = self.backend.as_ref().ok_or(CacheError::Unavailable)?;
        backend
            .set_text(&self.keys.provider_config_key(), provider, None)
            .await
    }

    /// Remove one company's keys from every tier, or every tier entirely
    ///
    /// The provider configuration key is never touched.
    pub async fn clear(&self, company_name: Option<&str>) -> ClearReport {
        let mut report = ClearReport {
            status: BackendStatus::Unavailable,
            company_name: company_name.map(|name| name.trim().to_string()),
            deleted: TierCounts::default(),
        };

        let Some(backend) = self.backend.as_ref() else {
            warn!("Cache clear skipped: backend unavailable");
            return report;
        };

        let outcome = match company_name {
            Some(name) => {
                self.clear_company(backend.as_ref(), name, &mut report.deleted)
                    .await
            }
            None => self.clear_all(backend.as_ref(), &mut report.deleted).await,
        };

        match outcome {
            Ok(()) => {
                report.status = BackendStatus::Connected;
                info!(
                    "Cleared {} cache entries{}",
                    report.deleted.total(),
                    report
                        .company_name
                        .as_deref()
                        .map(|name| format!(" for '{name}'"))
                        .unwrap_or_default()
                );
            }
            Err(e) => warn!("Cache clear incomplete: {}", e),
        }

        report
    }

    async fn clear_company(
        &self,
        backend: &dyn CacheBackend,
        company_name: &str,
        deleted: &mut TierCounts,
    ) -> CacheResult<()> {
        for (tier, key) in self.keys.keys_for(company_name) {
            let removed = backend.delete(&[key.into_string()]).await?;
            *tier_count_mut(deleted, tier) += removed;
        }
        Ok(())
    }

    async fn clear_all(&self, backend: &dyn CacheBackend, deleted: &mut TierCounts) -> CacheResult<()> {
        for tier in CacheTier::all() {
            let prefix = self.keys.tier_prefix(tier);
            let mut cursor: Option<String> = None;
            loop {
                let page = backend
                    .scan_page(&prefix, cursor.as_deref(), DELETE_BATCH_SIZE)
                    .await?;
                *tier_count_mut(deleted, tier) += backend.delete(&page.keys).await?;
                match page.next {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
        }
        Ok(())
    }

    /// Per-tier counts, a sampled image footprint estimate and sample keys
    pub async fn stats(&self) -> CacheStats {
        let Some(backend) = self.backend.as_ref() else {
            return CacheStats::unavailable(Some(CacheError::Unavailable.to_string()));
        };

        match self.collect_stats(backend.as_ref()).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Failed to collect cache stats: {}", e);
                CacheStats::unavailable(Some(e.to_string()))
            }
        }
    }

    async fn collect_stats(&self, backend: &dyn CacheBackend) -> CacheResult<CacheStats> {
        let mut tiers = TierCounts::default();
        let mut sample_keys = Vec::new();

        for tier in CacheTier::all() {
            let prefix = self.keys.tier_prefix(tier);
            *tier_count_mut(&mut tiers, tier) = backend.count_prefix(&prefix).await?;

            let room = STATS_SAMPLE_KEYS.saturating_sub(sample_keys.len());
            if room > 0 {
                sample_keys.extend(backend.scan_prefix(&prefix, Some(room)).await?);
            }
        }

        let image_keys = backend
            .scan_prefix(
                &self.keys.tier_prefix(CacheTier::Image),
                Some(STATS_MEMORY_SAMPLE),
            )
            .await?;

        let mut sampled = 0usize;
        let mut sampled_bytes = 0u64;
        for key in &image_keys {
            match backend.memory_usage(key).await {
                Ok(Some(bytes)) => {
                    sampled += 1;
                    sampled_bytes += bytes;
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("Memory usage unavailable for {}: {}", key, e);
                    break;
                }
            }
        }

        let estimated_image_bytes = if sampled == 0 {
            0
        } else {
            sampled_bytes / sampled as u64 * tiers.image
        };

        Ok(CacheStats {
            status: BackendStatus::Connected,
            tiers,
            estimated_image_bytes,
            sampled_image_keys: sampled,
            sample_keys,
            error: None,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let backend = self.backend.as_ref()?;
        match backend.get_text(key.as_str()).await {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(value) => {
                    debug!("Cache hit: {}", key);
                    Some(value)
                }
                Err(e) => {
                    warn!("Ignoring undecodable cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                debug!("Cache miss: {}", key);
                None
            }
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn put_json<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let Some(backend) = self.backend.as_ref() else {
            debug!("Cache unavailable, not storing {}", key);
            return;
        };

        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize cache entry {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = backend.set_text(key.as_str(), &payload, Some(ttl)).await {
            warn!("Cache write failed for {}: {}", key, e);
        }
    }
}

fn tier_count_mut(counts: &mut TierCounts, tier: CacheTier) -> &mut u64 {
    match tier {
        CacheTier::Image => &mut counts.image,
        CacheTier::Metadata => &mut counts.metadata,
        CacheTier::Search => &mut counts.search,
        CacheTier::Autocomplete => &mut counts.autocomplete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryBackend;
    use crate::models::CompanySummary;

    fn store_with(backend: Arc<InMemoryBackend>) -> TieredStore {
        TieredStore::new(
            backend,
            KeyDeriver::default(),
            TtlConfig::default(),
            LogoMetrics::default(),
        )
    }

    fn search_result(name: &str) -> SearchResult {
        SearchResult {
            url: format!("https://cdn.example/{name}.png"),
            domain: Some(format!("{name}.com")),
            resolved_company_name: name.to_string(),
            confidence: LogoSource::Api.confidence(),
            source: LogoSource::Api,
            description: None,
            industry: None,
        }
    }

    #[tokio::test]
    async fn test_image_round_trip_keeps_content_type() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = store_with(backend.clone());
        let image = LogoImage::new(vec![0x89, 0x50, 0x4e, 0x47], "image/svg+xml");

        store
            .put_image("Acme", &image, "Acme Inc", LogoSource::Api)
            .await
            .unwrap();

        let cached = store.get_image("  acme ").await.unwrap();
        assert_eq!(cached, image);

        let metadata = store.get_image_metadata("acme").await.unwrap();
        assert_eq!(metadata.company_name, "Acme Inc");
        assert_eq!(metadata.size_bytes, 4);

        let key = store.keys().derive(CacheTier::Image, "acme");
        let ttl = backend.ttl(key.as_str()).await.unwrap();
        assert!(ttl > Duration::from_secs(29 * 24 * 3600));
    }

    #[tokio::test]
    async fn test_missing_metadata_defaults_to_png() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = store_with(backend.clone());
        store
            .put_image("acme", &LogoImage::new(vec![1, 2, 3], "image/webp"), "acme", LogoSource::Api)
            .await
            .unwrap();

        let metadata_key = store.keys().derive(CacheTier::Metadata, "acme");
        backend.delete(&[metadata_key.into_string()]).await.unwrap();

        let cached = store.get_image("acme").await.unwrap();
        assert_eq!(cached.content_type, FALLBACK_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_degraded_store_misses_and_skips() {
        let store = TieredStore::degraded(
            KeyDeriver::default(),
            TtlConfig::default(),
            LogoMetrics::default(),
        );
        assert!(!store.is_available());

        let image = LogoImage::new(vec![1], "image/png");
        assert!(matches!(
            store.put_image("acme", &image, "acme", LogoSource::Api).await,
            Err(CacheError::Unavailable)
        ));
        store
            .put_search(SearchScope::Direct, "acme", &search_result("acme"))
            .await;

        assert!(store.get_image("acme").await.is_none());
        assert!(store.get_search(SearchScope::Direct, "acme").await.is_none());

        let stats = store.stats().await;
        assert_eq!(stats.status, BackendStatus::Unavailable);
        assert!(stats.error.is_some());

        let report = store.clear(None).await;
        assert_eq!(report.status, BackendStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_runtime_backend_failure_reads_as_miss() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = store_with(backend.clone());
        store
            .put_search(SearchScope::Direct, "acme", &search_result("acme"))
            .await;

        backend.set_offline(true);
        assert!(store.get_search(SearchScope::Direct, "acme").await.is_none());
        assert!(store.ping().await.is_err());
    }

    #[tokio::test]
    async fn test_search_scopes_do_not_shadow_each_other() {
        let store = store_with(Arc::new(InMemoryBackend::new()));
        let mut suggestion = search_result("meta");
        suggestion.source = LogoSource::Autocomplete;
        suggestion.domain = Some("meta.org".to_string());

        store
            .put_search(SearchScope::Suggestion, "Meta", &suggestion)
            .await;
        assert!(store.get_search(SearchScope::Direct, "Meta").await.is_none());
        assert_eq!(
            store.get_search(SearchScope::Suggestion, "meta").await,
            Some(suggestion)
        );
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = store_with(backend.clone());
        let key = store.keys().derive_search(SearchScope::Direct, "acme");
        backend.set_text(key.as_str(), "not json", None).await.unwrap();

        assert!(store.get_search(SearchScope::Direct, "acme").await.is_none());
    }

    #[tokio::test]
    async fn test_selective_clear_hits_all_tiers_only_for_that_name() {
        let store = store_with(Arc::new(InMemoryBackend::new()));
        for name in ["acme", "globex"] {
            store
                .put_image(name, &LogoImage::new(vec![1], "image/png"), name, LogoSource::Api)
                .await
                .unwrap();
            store
                .put_search(SearchScope::Direct, name, &search_result(name))
                .await;
            store
                .put_autocomplete(
                    name,
                    &AutocompleteResult {
                        query: name.to_string(),
                        companies: Vec::<CompanySummary>::new(),
                    },
                )
                .await;
        }
        store.put_provider("logo_dev").await.unwrap();

        let report = store.clear(Some("ACME")).await;
        assert_eq!(report.status, BackendStatus::Connected);
        assert_eq!(
            report.deleted,
            TierCounts {
                image: 1,
                metadata: 1,
                search: 1,
                autocomplete: 1
            }
        );

        assert!(store.get_image("acme").await.is_none());
        assert!(store.get_image("globex").await.is_some());
        assert_eq!(store.get_provider().await.unwrap().as_deref(), Some("logo_dev"));

        let again = store.clear(Some("acme")).await;
        assert_eq!(again.status, BackendStatus::Connected);
        assert_eq!(again.deleted.total(), 0);
    }

    #[tokio::test]
    async fn test_full_clear_and_stats() {
        let store = store_with(Arc::new(InMemoryBackend::new()));
        for name in ["a", "b", "c"] {
            store
                .put_image(name, &LogoImage::new(vec![0; 100], "image/png"), name, LogoSource::Api)
                .await
                .unwrap();
        }
        store
            .put_search(SearchScope::Direct, "a", &search_result("a"))
            .await;
        store.put_provider("brandfetch").await.unwrap();

        let stats = store.stats().await;
        assert_eq!(stats.status, BackendStatus::Connected);
        assert_eq!(stats.tiers.image, 3);
        assert_eq!(stats.tiers.metadata, 3);
        assert_eq!(stats.tiers.search, 1);
        assert_eq!(stats.sampled_image_keys, 3);
        assert!(stats.estimated_image_bytes >= 300);
        assert!(!stats.sample_keys.is_empty());
        assert!(stats.sample_keys.len() <= STATS_SAMPLE_KEYS);

        let report = store.clear(None).await;
        assert_eq!(report.deleted.image, 3);
        assert_eq!(report.deleted.metadata, 3);
        assert_eq!(report.deleted.search, 1);
        assert_eq!(store.stats().await.tiers.total(), 0);
        assert_eq!(store.get_provider().await.unwrap().as_deref(), Some("brandfetch"));
    }

    #[tokio::test]
    async fn test_large_tier_is_cleared_and_sampled_page_by_page() {
        let store = store_with(Arc::new(InMemoryBackend::new()));
        let total = DELETE_BATCH_SIZE * 2 + 7;
        for i in 0..total {
            let name = format!("company {i}");
            store
                .put_image(&name, &LogoImage::new(vec![0; 10], "image/png"), &name, LogoSource::Api)
                .await
                .unwrap();
        }

        let stats = store.stats().await;
        assert_eq!(stats.tiers.image, total as u64);
        assert_eq!(stats.sampled_image_keys, STATS_MEMORY_SAMPLE);
        assert_eq!(stats.sample_keys.len(), STATS_SAMPLE_KEYS);

        let report = store.clear(None).await;
        assert_eq!(report.status, BackendStatus::Connected);
        assert_eq!(report.deleted.image, total as u64);
        assert_eq!(report.deleted.metadata, total as u64);
        assert_eq!(store.stats().await.tiers.total(), 0);
    }
}
