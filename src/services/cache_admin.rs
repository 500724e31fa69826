//! Operator-facing health report and invalidation

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use super::brand_api::BrandApi;
use crate::cache::TieredStore;
use crate::models::{
    BackendHealth, BackendStatus, CacheReport, CacheStats, ClearReport, HealthStatus,
    ProviderHealth,
};

pub struct CacheAdmin {
    store: TieredStore,
    api: Arc<dyn BrandApi>,
}

impl CacheAdmin {
    pub fn new(store: TieredStore, api: Arc<dyn BrandApi>) -> Self {
        Self { store, api }
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.stats().await
    }

    /// Drop one company's entries across all tiers, or everything when `None`
    pub async fn clear(&self, company_name: Option<&str>) -> ClearReport {
        match company_name {
            Some(name) => info!("Clearing cached entries for '{}'", name.trim()),
            None => info!("Clearing all cached logo entries"),
        }
        self.store.clear(company_name).await
    }

    /// Backend health, provider reachability and stats in one report
    ///
    /// Healthy only when both the backend and the active provider answer.
    pub async fn report(&self) -> CacheReport {
        let (backend, provider, stats) = tokio::join!(
            self.backend_health(),
            self.provider_health(),
            self.store.stats()
        );

        let status = if backend.status == BackendStatus::Connected && provider.reachable {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        CacheReport {
            status,
            backend,
            provider,
            stats,
            generated_at: Utc::now(),
        }
    }

    async fn backend_health(&self) -> BackendHealth {
        match self.store.ping().await {
            Ok(latency) => BackendHealth {
                status: BackendStatus::Connected,
                latency_ms: Some(latency.as_millis() as u64),
                error: None,
            },
            Err(e) => BackendHealth {
                status: BackendStatus::Unavailable,
                latency_ms: None,
                error: Some(e.to_string()),
            },
        }
    }

    async fn provider_health(&self) -> ProviderHealth {
        let provider = self.api.active_provider().await;
        match self.api.probe().await {
            Ok(latency) => ProviderHealth {
                provider,
                reachable: true,
                latency_ms: Some(latency.as_millis() as u64),
                error: None,
            },
            Err(e) => ProviderHealth {
                provider,
                reachable: false,
                latency_ms: None,
                error: Some(e.to_string()),
            },
        }
    }
}
