//! HTTP Client Factory
//!
//! Central place for building reqwest clients so every origin request
//! carries the same identifying user agent and bounded timeouts.

use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::HttpConfig;
use crate::errors::OriginResult;

/// Factory for origin-facing HTTP clients
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    connect_timeout: Duration,
    user_agent: String,
}

impl HttpClientFactory {
    pub fn new(connect_timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            connect_timeout,
            user_agent: user_agent.into(),
        }
    }

    pub fn from_config(config: &HttpConfig) -> Self {
        // Connection setup never gets longer than the shortest request budget
        let connect_timeout = config
            .api_timeout
            .min(config.image_timeout)
            .min(config.probe_timeout);
        Self::new(connect_timeout, config.user_agent.clone())
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Client whose requests, body included, must finish within `timeout`
    pub fn create_client(&self, timeout: Duration) -> OriginResult<Client> {
        debug!(
            "Creating HTTP client (timeout {:?}, user agent {})",
            timeout, self.user_agent
        );
        let client = Client::builder()
            .connect_timeout(self.connect_timeout.min(timeout))
            .timeout(timeout)
            .user_agent(&self.user_agent)
            .build()?;
        Ok(client)
    }
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}
