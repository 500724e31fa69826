//! Active provider selection
//!
//! The provider is held in memory and mirrored to the cache backend under a
//! key with no expiration, so a selection made at runtime survives restarts.
//! Changes apply immediately to every subsequent origin lookup.

use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::TieredStore;
use crate::errors::{LogoCacheError, LogoCacheResult};
use crate::models::{ProviderKind, ServiceConfig};

#[derive(Clone)]
pub struct ConfigStore {
    provider: Arc<RwLock<ProviderKind>>,
    store: TieredStore,
}

impl ConfigStore {
    pub fn new(store: TieredStore, default_provider: ProviderKind) -> Self {
        Self {
            provider: Arc::new(RwLock::new(default_provider)),
            store,
        }
    }

    /// Hydrate the in-memory provider from the backend
    ///
    /// Called once at startup. A missing, unreadable or unsupported stored
    /// value leaves the current provider in place.
    pub async fn load(&self) -> ProviderKind {
        match self.store.get_provider().await {
            Ok(Some(stored)) => match ProviderKind::from_str(stored.trim()) {
                Ok(provider) => {
                    *self.provider.write().await = provider;
                    info!("Loaded persisted provider: {}", provider);
                }
                Err(_) => warn!("Ignoring unsupported persisted provider '{}'", stored),
            },
            Ok(None) => debug!("No persisted provider, keeping default"),
            Err(e) => warn!("Could not load persisted provider, keeping default: {}", e),
        }
        self.get().await
    }

    pub async fn get(&self) -> ProviderKind {
        *self.provider.read().await
    }

    pub async fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            provider: self.get().await,
            supported: ProviderKind::supported_names()
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    /// Switch the active provider
    ///
    /// Unknown identifiers are rejected and the active provider is left as it
    /// was. When the backend is unavailable the change still applies to this
    /// process but will not survive a restart.
    pub async fn set(&self, provider: &str) -> LogoCacheResult<ProviderKind> {
        let provider = match ProviderKind::from_str(provider.trim()) {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Rejected unsupported provider '{}'", provider);
                return Err(LogoCacheError::invalid_provider(
                    provider,
                    &ProviderKind::supported_names(),
                ));
            }
        };

        *self.provider.write().await = provider;

        match self.store.put_provider(provider.as_static_str()).await {
            Ok(()) => info!("Active provider set to {}", provider),
            Err(e) => warn!(
                "Active provider set to {} for this process only, persisting failed: {}",
                provider, e
            ),
        }

        Ok(provider)
    }
}
