//! Company name to logo asset resolution
//!
//! A direct lookup checks the search tier, then asks the brand API, picks one
//! record out of the candidates and extracts a logo URL from it. Autocomplete
//! lists candidates for a partial query and seeds the suggestion scope of the
//! search tier so a picked suggestion resolves without a second API call.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::brand_api::BrandApi;
use crate::cache::{SearchScope, TieredStore, normalize_company_name};
use crate::models::{
    AutocompleteResult, BrandRecord, CompanySummary, LogoSource, SearchResult, logo_proxy_path,
};
use crate::observability::LogoMetrics;

pub struct BrandResolver {
    api: Arc<dyn BrandApi>,
    store: TieredStore,
    /// Normalized company name -> preferred domain
    overrides: BTreeMap<String, String>,
    metrics: LogoMetrics,
}

impl BrandResolver {
    pub fn new(
        api: Arc<dyn BrandApi>,
        store: TieredStore,
        overrides: &BTreeMap<String, String>,
    ) -> Self {
        let overrides = overrides
            .iter()
            .map(|(name, domain)| (normalize_company_name(name), domain.trim().to_string()))
            .collect();
        let metrics = store.metrics().clone();

        Self {
            api,
            store,
            overrides,
            metrics,
        }
    }

    /// Exact lookup through the direct scope
    pub async fn resolve(&self, company_name: &str) -> Option<SearchResult> {
        self.resolve_scoped(SearchScope::Direct, company_name).await
    }

    /// Lookup through a specific search scope
    ///
    /// The suggestion scope first reuses what autocomplete cached; either way
    /// a miss falls through to the brand API.
    pub async fn resolve_scoped(&self, scope: SearchScope, company_name: &str) -> Option<SearchResult> {
        let query = company_name.trim();
        let normalized = normalize_company_name(query);
        if normalized.is_empty() {
            return None;
        }

        if let Some(mut cached) = self.store.get_search(scope, query).await {
            debug!("Search cache hit for '{}' ({})", query, scope);
            cached.source = LogoSource::Cache;
            cached.confidence = LogoSource::Cache.confidence();
            return Some(cached);
        }

        let records = self.fetch_records(query).await?;
        let record = self.choose_record(&records, &normalized)?;

        let source = match scope {
            SearchScope::Direct => LogoSource::Api,
            SearchScope::Suggestion => LogoSource::Autocomplete,
        };
        let Some(result) = build_result(record, query, source) else {
            info!(
                "Brand '{}' has no usable logo asset",
                record.display_name().unwrap_or(query)
            );
            return None;
        };

        info!(
            "Resolved '{}' to {} ({})",
            query,
            result.resolved_company_name,
            result.domain.as_deref().unwrap_or("no domain")
        );
        self.store.put_search(scope, query, &result).await;
        Some(result)
    }

    /// Candidate companies for a partial name, at most `limit` of them
    ///
    /// The full candidate list is cached; `limit` only trims what is
    /// returned. Blank queries never reach the API.
    pub async fn suggest(&self, query: &str, limit: usize) -> AutocompleteResult {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return AutocompleteResult {
                query: query.to_string(),
                companies: Vec::new(),
            };
        }

        if let Some(mut cached) = self.store.get_autocomplete(query).await {
            cached.companies.truncate(limit);
            return cached;
        }

        let Some(records) = self.fetch_records(query).await else {
            return AutocompleteResult {
                query: query.to_string(),
                companies: Vec::new(),
            };
        };

        // Same-named candidates collapse to the record a direct lookup would pick
        let mut groups: Vec<(String, Vec<&BrandRecord>)> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();
        for record in records.iter().filter(|record| record.logo_url().is_some()) {
            let name = normalize_company_name(record.display_name().unwrap_or(query));
            match group_index.get(&name) {
                Some(&index) => groups[index].1.push(record),
                None => {
                    group_index.insert(name.clone(), groups.len());
                    groups.push((name, vec![record]));
                }
            }
        }

        let mut companies = Vec::new();
        for (name, candidates) in groups {
            let Some(result) = self
                .choose_among(candidates, &name)
                .and_then(|record| build_result(record, query, LogoSource::Autocomplete))
            else {
                continue;
            };

            self.store
                .put_search(SearchScope::Suggestion, &result.resolved_company_name, &result)
                .await;

            companies.push(CompanySummary {
                logo_url: logo_proxy_path(&result.resolved_company_name),
                name: result.resolved_company_name,
                domain: result.domain,
                description: result.description,
                industry: result.industry,
                confidence: result.confidence,
            });
        }

        let mut result = AutocompleteResult {
            query: query.to_string(),
            companies,
        };
        self.store.put_autocomplete(query, &result).await;

        debug!("{} suggestions for '{}'", result.companies.len(), query);
        result.companies.truncate(limit);
        result
    }

    /// Pick the record a query most plausibly means
    ///
    /// Exact (case-insensitive) name matches win over everything else. Among
    /// them an override domain decides when one is configured and present,
    /// otherwise the highest relevance, earliest on ties. Without any exact
    /// match the provider's first record is taken.
    pub fn choose_record<'a>(
        &self,
        records: &'a [BrandRecord],
        normalized_query: &str,
    ) -> Option<&'a BrandRecord> {
        self.choose_among(records.iter().collect(), normalized_query)
    }

    fn choose_among<'a>(
        &self,
        records: Vec<&'a BrandRecord>,
        normalized_query: &str,
    ) -> Option<&'a BrandRecord> {
        let exact: Vec<&BrandRecord> = records
            .iter()
            .copied()
            .filter(|record| record.name_matches(normalized_query))
            .collect();

        if exact.is_empty() {
            return records.first().copied();
        }

        if let Some(domain) = self.overrides.get(normalized_query) {
            if let Some(preferred) = exact.iter().find(|record| record.domain_matches(domain)) {
                debug!("Override picked {} for '{}'", domain, normalized_query);
                return Some(*preferred);
            }
        }

        let mut best = exact[0];
        for candidate in &exact[1..] {
            if relevance(candidate) > relevance(best) {
                best = *candidate;
            }
        }
        Some(best)
    }

    async fn fetch_records(&self, query: &str) -> Option<Vec<BrandRecord>> {
        self.metrics.record_origin_call("brand_api");
        match self.api.search_brands(query).await {
            Ok(records) if records.is_empty() => {
                info!("No brands found for '{}'", query);
                None
            }
            Ok(records) => Some(records),
            Err(e) => {
                self.metrics.record_origin_failure("brand_api");
                warn!("Brand lookup failed for '{}': {}", query, e);
                None
            }
        }
    }
}

fn relevance(record: &BrandRecord) -> f64 {
    record.relevance.unwrap_or(f64::NEG_INFINITY)
}

fn build_result(record: &BrandRecord, query: &str, source: LogoSource) -> Option<SearchResult> {
    let url = record.logo_url()?;
    Some(SearchResult {
        url: url.to_string(),
        domain: record.domain.clone(),
        resolved_company_name: record.display_name().unwrap_or(query).trim().to_string(),
        confidence: source.confidence(),
        source,
        description: record.description.clone(),
        industry: record.industry.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemoryBackend, KeyDeriver};
    use crate::config::{ResolverConfig, TtlConfig};
    use crate::errors::{OriginError, OriginResult};
    use crate::models::{ProviderKind, parse_brand_records};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SpyApi {
        body: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl SpyApi {
        fn returning(body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                body: Some(body),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                body: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BrandApi for SpyApi {
        async fn search_brands(&self, _query: &str) -> OriginResult<Vec<BrandRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.body {
                Some(body) => Ok(parse_brand_records(body.as_bytes())?),
                None => Err(OriginError::Status {
                    status: 503,
                    url: "https://brands.test/search".to_string(),
                }),
            }
        }

        async fn probe(&self) -> OriginResult<Duration> {
            Ok(Duration::from_millis(1))
        }

        async fn active_provider(&self) -> ProviderKind {
            ProviderKind::Brandfetch
        }
    }

    fn resolver(api: Arc<SpyApi>) -> BrandResolver {
        let store = TieredStore::new(
            Arc::new(InMemoryBackend::new()),
            KeyDeriver::default(),
            TtlConfig::default(),
            LogoMetrics::default(),
        );
        BrandResolver::new(api, store, &ResolverConfig::default().overrides)
    }

    const META: &str = r#"[
        {"name": "Meta", "domain": "meta.org", "qualityScore": 0.9,
         "logos": [{"formats": [{"format": "png", "src": "https://cdn/meta-org.png"}]}]},
        {"name": "META", "domain": "meta.com", "qualityScore": 0.4,
         "logos": [{"formats": [{"format": "png", "src": "https://cdn/meta-com.png"}]}]}
    ]"#;

    #[tokio::test]
    async fn test_override_beats_relevance_among_exact_matches() {
        let api = SpyApi::returning(META);
        let result = resolver(api.clone()).resolve("meta").await.unwrap();
        assert_eq!(result.domain.as_deref(), Some("meta.com"));
        assert_eq!(result.url, "https://cdn/meta-com.png");
        assert_eq!(result.source, LogoSource::Api);
        assert_eq!(result.confidence, LogoSource::Api.confidence());
    }

    #[tokio::test]
    async fn test_highest_relevance_exact_match_without_override() {
        let api = SpyApi::returning(
            r#"[
                {"name": "Acme Widgets", "domain": "widgets.com", "qualityScore": 0.99, "icon": "https://cdn/w.png"},
                {"name": "Acme", "domain": "acme.net", "qualityScore": 0.2, "icon": "https://cdn/net.png"},
                {"name": "acme", "domain": "acme.com", "qualityScore": 0.7, "icon": "https://cdn/com.png"}
            ]"#,
        );
        let result = resolver(api).resolve("ACME").await.unwrap();
        assert_eq!(result.domain.as_deref(), Some("acme.com"));
    }

    #[tokio::test]
    async fn test_first_record_when_no_exact_match() {
        let api = SpyApi::returning(
            r#"[
                {"name": "Acme Corporation", "domain": "acme.com", "icon": "https://cdn/first.png"},
                {"name": "Acme Labs", "domain": "acmelabs.io", "qualityScore": 1.0, "icon": "https://cdn/second.png"}
            ]"#,
        );
        let result = resolver(api).resolve("acme").await.unwrap();
        assert_eq!(result.url, "https://cdn/first.png");
        assert_eq!(result.resolved_company_name, "Acme Corporation");
    }

    #[tokio::test]
    async fn test_ties_keep_origin_order() {
        let api = SpyApi::returning(
            r#"[
                {"name": "Acme", "domain": "one.com", "icon": "https://cdn/one.png"},
                {"name": "Acme", "domain": "two.com", "icon": "https://cdn/two.png"}
            ]"#,
        );
        let result = resolver(api).resolve("acme").await.unwrap();
        assert_eq!(result.domain.as_deref(), Some("one.com"));
    }

    #[tokio::test]
    async fn test_result_is_cached_in_direct_scope() {
        let api = SpyApi::returning(META);
        let resolver = resolver(api.clone());

        let first = resolver.resolve("Meta").await.unwrap();
        let second = resolver.resolve("  meta ").await.unwrap();
        assert_eq!(first.url, second.url);
        assert_eq!(second.source, LogoSource::Cache);
        assert_eq!(second.confidence, 1.0);
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_origin_failure_is_a_miss_and_not_cached() {
        let api = SpyApi::failing();
        let resolver = resolver(api.clone());

        assert!(resolver.resolve("acme").await.is_none());
        assert!(resolver.resolve("acme").await.is_none());
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_response_and_blank_query() {
        let api = SpyApi::returning("[]");
        let resolver = resolver(api.clone());
        assert!(resolver.resolve("acme").await.is_none());
        assert!(resolver.resolve("   ").await.is_none());
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_record_without_asset_resolves_to_none() {
        let api = SpyApi::returning(r#"[{"name": "Acme", "domain": "acme.com", "logos": []}]"#);
        assert!(resolver(api).resolve("acme").await.is_none());
    }

    #[tokio::test]
    async fn test_suggest_seeds_suggestion_scope_and_trims() {
        let api = SpyApi::returning(
            r#"[
                {"name": "Acme", "domain": "acme.com", "icon": "https://cdn/acme.png"},
                {"name": "Acme Labs", "domain": "acmelabs.io", "icon": "https://cdn/labs.png"},
                {"name": "ACME", "domain": "acme.org", "icon": "https://cdn/dupe.png"},
                {"name": "Acme Blank", "domain": "blank.io"}
            ]"#,
        );
        let resolver = resolver(api.clone());

        let suggestions = resolver.suggest("acm", 10).await;
        let names: Vec<&str> = suggestions.companies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Acme Labs"]);
        assert_eq!(suggestions.companies[1].logo_url, "/api/logos/company/Acme%20Labs");
        assert_eq!(
            suggestions.companies[0].confidence,
            LogoSource::Autocomplete.confidence()
        );

        let trimmed = resolver.suggest("acm", 1).await;
        assert_eq!(trimmed.companies.len(), 1);
        assert_eq!(api.calls(), 1);

        let picked = resolver
            .resolve_scoped(SearchScope::Suggestion, "Acme Labs")
            .await
            .unwrap();
        assert_eq!(picked.domain.as_deref(), Some("acmelabs.io"));
        assert_eq!(picked.source, LogoSource::Cache);
        assert_eq!(api.calls(), 1);

        // The direct scope was never seeded
        assert!(resolver.store.get_search(SearchScope::Direct, "Acme Labs").await.is_none());
    }

    #[tokio::test]
    async fn test_suggest_disambiguates_same_named_candidates() {
        let api = SpyApi::returning(META);
        let resolver = resolver(api.clone());

        let suggestions = resolver.suggest("meta", 10).await;
        assert_eq!(suggestions.companies.len(), 1);
        assert_eq!(suggestions.companies[0].domain.as_deref(), Some("meta.com"));

        let picked = resolver
            .resolve_scoped(SearchScope::Suggestion, "Meta")
            .await
            .unwrap();
        assert_eq!(picked.url, "https://cdn/meta-com.png");
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn test_suggest_ranks_same_named_candidates_by_relevance() {
        let api = SpyApi::returning(
            r#"[
                {"name": "Acme", "domain": "acme.net", "qualityScore": 0.2, "icon": "https://cdn/net.png"},
                {"name": "Acme Labs", "domain": "acmelabs.io", "icon": "https://cdn/labs.png"},
                {"name": "acme", "domain": "acme.com", "qualityScore": 0.7, "icon": "https://cdn/com.png"}
            ]"#,
        );
        let suggestions = resolver(api).suggest("acm", 10).await;

        let picks: Vec<(&str, Option<&str>)> = suggestions
            .companies
            .iter()
            .map(|c| (c.name.as_str(), c.domain.as_deref()))
            .collect();
        assert_eq!(
            picks,
            vec![("acme", Some("acme.com")), ("Acme Labs", Some("acmelabs.io"))]
        );
    }

    #[tokio::test]
    async fn test_suggest_blank_query_skips_origin() {
        let api = SpyApi::returning("[]");
        let resolver = resolver(api.clone());
        assert!(resolver.suggest("  ", 10).await.companies.is_empty());
        assert_eq!(api.calls(), 0);
    }
}
