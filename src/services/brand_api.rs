//! Upstream brand-data API client
//!
//! One search request per lookup against whichever provider is active at
//! call time. No retries: a failed request is reported to the caller, which
//! treats it as "no result" for this attempt.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use std::time::{Duration, Instant};
use tracing::debug;

use super::config_store::ConfigStore;
use crate::config::{HttpConfig, ProvidersConfig};
use crate::errors::{OriginError, OriginResult};
use crate::models::{BrandRecord, ProviderKind, parse_brand_records};
use crate::utils::HttpClientFactory;

#[async_trait]
pub trait BrandApi: Send + Sync {
    /// Brand records for `query`, in the order the provider ranked them
    async fn search_brands(&self, query: &str) -> OriginResult<Vec<BrandRecord>>;

    /// Timeout-bounded reachability check of the active provider
    async fn probe(&self) -> OriginResult<Duration>;

    /// Provider the next request will go to
    async fn active_provider(&self) -> ProviderKind;
}

/// reqwest-backed client for the configured providers
pub struct HttpBrandApi {
    client: Client,
    probe_client: Client,
    providers: ProvidersConfig,
    config_store: ConfigStore,
}

impl HttpBrandApi {
    pub fn new(
        factory: &HttpClientFactory,
        http: &HttpConfig,
        providers: ProvidersConfig,
        config_store: ConfigStore,
    ) -> OriginResult<Self> {
        Ok(Self {
            client: factory.create_client(http.api_timeout)?,
            probe_client: factory.create_client(http.probe_timeout)?,
            providers,
            config_store,
        })
    }
}

/// Fill a search URL template with the percent-encoded query
pub fn search_url(template: &str, query: &str) -> String {
    template.replace("{query}", &urlencoding::encode(query.trim()))
}

#[async_trait]
impl BrandApi for HttpBrandApi {
    async fn search_brands(&self, query: &str) -> OriginResult<Vec<BrandRecord>> {
        let provider = self.config_store.get().await;
        let endpoint = self.providers.endpoint(provider);
        let api_key = self
            .providers
            .api_key(provider)
            .ok_or_else(|| OriginError::MissingCredentials {
                provider: provider.to_string(),
            })?;

        let url = search_url(&endpoint.search_url, query);
        debug!("Brand search via {}: {}", provider, url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .bearer_auth(api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OriginError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.bytes().await?;
        let records = parse_brand_records(&body)?;
        debug!("{} returned {} brand records for '{}'", provider, records.len(), query);
        Ok(records)
    }

    async fn probe(&self) -> OriginResult<Duration> {
        let provider = self.config_store.get().await;
        let url = &self.providers.endpoint(provider).health_url;

        let started = Instant::now();
        let response = self.probe_client.get(url).send().await?;
        let elapsed = started.elapsed();

        // Any answer short of a server error means the API is up
        if response.status().is_server_error() {
            return Err(OriginError::Status {
                status: response.status().as_u16(),
                url: url.clone(),
            });
        }
        Ok(elapsed)
    }

    async fn active_provider(&self) -> ProviderKind {
        self.config_store.get().await
    }
}
