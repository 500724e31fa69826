use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use crate::errors::LogoCacheError;
use crate::models::ProviderKind;
use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub redis: RedisConfig,
    pub ttl: TtlConfig,
    pub http: HttpConfig,
    pub providers: ProvidersConfig,
    pub resolver: ResolverConfig,
    pub logging: LoggingConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "duration_serde")]
    pub operation_timeout: Duration,
    /// Root prefix for every key this crate writes
    pub key_namespace: String,
}

/// Per-tier expirations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    /// Image bytes and their metadata sidecar
    #[serde(with = "duration_serde")]
    pub image: Duration,
    /// Brand search results (direct and suggestion scopes)
    #[serde(with = "duration_serde")]
    pub search: Duration,
    /// Autocomplete result lists
    #[serde(with = "duration_serde")]
    pub autocomplete: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(with = "duration_serde")]
    pub api_timeout: Duration,
    #[serde(with = "duration_serde")]
    pub image_timeout: Duration,
    #[serde(with = "duration_serde")]
    pub probe_timeout: Duration,
    pub max_image_bytes: usize,
    pub user_agent: String,
}

/// Endpoint definition for one upstream brand-data provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    /// URL template; `{query}` is replaced by the percent-encoded company name
    pub search_url: String,
    /// URL probed by health checks
    pub health_url: String,
    /// Bearer credential; falls back to the provider's environment variable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub brandfetch: ProviderEndpoint,
    pub logo_dev: ProviderEndpoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Provider used until one is persisted through the config store
    pub default_provider: ProviderKind,
    pub autocomplete_limit: usize,
    /// Normalized company name -> preferred domain for ambiguous exact matches
    pub overrides: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_REDIS_CONNECT_TIMEOUT_SECS),
            operation_timeout: Duration::from_secs(DEFAULT_REDIS_OPERATION_TIMEOUT_SECS),
            key_namespace: DEFAULT_KEY_NAMESPACE.to_string(),
        }
    }
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            image: Duration::from_secs(DEFAULT_IMAGE_TTL_SECS),
            search: Duration::from_secs(DEFAULT_SEARCH_TTL_SECS),
            autocomplete: Duration::from_secs(DEFAULT_AUTOCOMPLETE_TTL_SECS),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            image_timeout: Duration::from_secs(DEFAULT_IMAGE_TIMEOUT_SECS),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            brandfetch: ProviderEndpoint {
                search_url: DEFAULT_BRANDFETCH_SEARCH_URL.to_string(),
                health_url: DEFAULT_BRANDFETCH_HEALTH_URL.to_string(),
                api_key: None,
            },
            logo_dev: ProviderEndpoint {
                search_url: DEFAULT_LOGO_DEV_SEARCH_URL.to_string(),
                health_url: DEFAULT_LOGO_DEV_HEALTH_URL.to_string(),
                api_key: None,
            },
        }
    }
}

impl ProvidersConfig {
    pub fn endpoint(&self, provider: ProviderKind) -> &ProviderEndpoint {
        match provider {
            ProviderKind::Brandfetch => &self.brandfetch,
            ProviderKind::LogoDev => &self.logo_dev,
        }
    }

    /// Configured key, or the provider's environment variable when unset
    pub fn api_key(&self, provider: ProviderKind) -> Option<String> {
        self.endpoint(provider)
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(provider.api_key_env()).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let mut overrides = BTreeMap::new();
        overrides.insert("meta".to_string(), "meta.com".to_string());

        Self {
            default_provider: ProviderKind::default(),
            autocomplete_limit: DEFAULT_AUTOCOMPLETE_LIMIT,
            overrides,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Config file path from `$LOGO_CACHE_CONFIG`, else `logo-cache.toml`
    pub fn default_path() -> String {
        std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string())
    }

    pub fn load() -> Result<Self> {
        Self::load_from_file(&Self::default_path())
    }

    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let (config, created) = Self::read_or_create(config_file)?;
        if created {
            info!("Created default config file: {}", config_file);
        }
        Ok(config)
    }

    /// Read and validate `config_file`, writing defaults there first when
    /// it does not exist. The flag is `true` when the file was created.
    pub fn read_or_create(config_file: &str) -> Result<(Self, bool)> {
        let path = std::path::Path::new(config_file);
        let (config, created) = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            (toml::from_str::<Self>(&contents)?, false)
        } else {
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            (default_config, true)
        };

        config.validate()?;
        Ok((config, created))
    }

    /// Reject settings that would make every lookup fail or never expire
    pub fn validate(&self) -> Result<(), LogoCacheError> {
        let ttls = [
            ("ttl.image", self.ttl.image),
            ("ttl.search", self.ttl.search),
            ("ttl.autocomplete", self.ttl.autocomplete),
            ("http.api_timeout", self.http.api_timeout),
            ("http.image_timeout", self.http.image_timeout),
            ("http.probe_timeout", self.http.probe_timeout),
            ("redis.connect_timeout", self.redis.connect_timeout),
            ("redis.operation_timeout", self.redis.operation_timeout),
        ];
        for (field, value) in ttls {
            if value.is_zero() {
                return Err(LogoCacheError::configuration(format!(
                    "{field} must be greater than zero"
                )));
            }
        }

        if self.redis.key_namespace.trim().is_empty() {
            return Err(LogoCacheError::configuration(
                "redis.key_namespace must not be empty",
            ));
        }

        if self.http.max_image_bytes == 0 {
            return Err(LogoCacheError::configuration(
                "http.max_image_bytes must be greater than zero",
            ));
        }

        for provider in ProviderKind::all() {
            let endpoint = self.providers.endpoint(provider);
            if !endpoint.search_url.contains("{query}") {
                return Err(LogoCacheError::configuration(format!(
                    "providers.{provider}.search_url must contain a {{query}} placeholder"
                )));
            }
        }

        Ok(())
    }
}
