//! Records stored in, and returned from, the logo cache tiers

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Content type assumed when an image blob has lost its metadata sidecar
pub const FALLBACK_CONTENT_TYPE: &str = "image/png";

/// Provenance of a cached record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogoSource {
    /// Served from a cache tier
    Cache,
    /// Resolved through an exact brand-data lookup
    Api,
    /// Resolved through an autocomplete suggestion
    Autocomplete,
}

impl LogoSource {
    /// Fixed priority score attached to results of this source
    pub fn confidence(&self) -> f64 {
        match self {
            LogoSource::Cache => 1.0,
            LogoSource::Api => 0.95,
            LogoSource::Autocomplete => 0.8,
        }
    }
}

/// Image bytes plus their content type, as handed to the web layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoImage {
    pub bytes: Bytes,
    pub content_type: String,
}

impl LogoImage {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Sidecar written next to every cached image blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Company name as resolved, which may differ from the query
    pub company_name: String,
    pub source: LogoSource,
    pub content_type: String,
    /// Unix seconds
    pub cached_at: i64,
    pub size_bytes: u64,
}

/// Resolved brand with its candidate logo asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub domain: Option<String>,
    pub resolved_company_name: String,
    pub confidence: f64,
    pub source: LogoSource,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

/// Lightweight company entry shown while the user types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySummary {
    pub name: String,
    pub domain: Option<String>,
    /// Internal logo-proxy path, not the upstream asset URL
    pub logo_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    pub confidence: f64,
}

/// Ordered suggestions for one autocomplete query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteResult {
    pub query: String,
    pub companies: Vec<CompanySummary>,
}

/// Internal path the web layer serves logos from
pub fn logo_proxy_path(company_name: &str) -> String {
    format!(
        "/api/logos/company/{}",
        urlencoding::encode(company_name.trim())
    )
}
