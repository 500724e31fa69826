//! Statistics and administrative report shapes, serialized as JSON for the web layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProviderKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    Connected,
    Unavailable,
}

/// Entry counts per namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub image: u64,
    pub metadata: u64,
    pub search: u64,
    pub autocomplete: u64,
}

impl TierCounts {
    pub fn total(&self) -> u64 {
        self.image + self.metadata + self.search + self.autocomplete
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub status: BackendStatus,
    pub tiers: TierCounts,
    /// Extrapolated from a bounded sample of image keys
    pub estimated_image_bytes: u64,
    pub sampled_image_keys: usize,
    pub sample_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CacheStats {
    pub fn unavailable(error: Option<String>) -> Self {
        Self {
            status: BackendStatus::Unavailable,
            tiers: TierCounts::default(),
            estimated_image_bytes: 0,
            sampled_image_keys: 0,
            sample_keys: Vec::new(),
            error,
        }
    }
}

/// Outcome of an invalidation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearReport {
    pub status: BackendStatus,
    /// Name whose keys were removed, `None` for a full clear
    pub company_name: Option<String>,
    pub deleted: TierCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendHealth {
    pub status: BackendStatus,
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub provider: ProviderKind,
    pub reachable: bool,
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Composite health and statistics report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheReport {
    pub status: HealthStatus,
    pub backend: BackendHealth,
    pub provider: ProviderHealth,
    pub stats: CacheStats,
    pub generated_at: DateTime<Utc>,
}

/// Serialized shape of the provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub provider: ProviderKind,
    pub supported: Vec<String>,
}
