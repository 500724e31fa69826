//! Key-value backend abstraction and its Redis implementation
//!
//! The Redis backend holds two multiplexed connections: one used for raw
//! image bytes and one used for UTF-8 JSON payloads. Keeping them apart
//! means a decode mode chosen for one payload family never leaks into the
//! other.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::RedisConfig;
use crate::errors::{CacheError, CacheResult};

/// Keys requested per SCAN round trip
pub const SCAN_PAGE_SIZE: usize = 500;

/// One page of an incremental key scan
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanPage {
    pub keys: Vec<String>,
    /// Cursor for the following page, `None` once the scan is complete
    pub next: Option<String>,
}

/// Operations the tiered store needs from a key-value backend
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    async fn ping(&self) -> CacheResult<()>;

    /// Read a binary payload
    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Read a UTF-8 payload
    async fn get_text(&self, key: &str) -> CacheResult<Option<String>>;

    /// Write a UTF-8 payload; `None` means no expiration
    async fn set_text(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()>;

    /// Write every entry or none of them, all with the same expiration
    async fn set_bytes_atomic(
        &self,
        entries: &[(String, Vec<u8>)],
        ttl: Option<Duration>,
    ) -> CacheResult<()>;

    /// Delete keys, returning how many existed
    async fn delete(&self, keys: &[String]) -> CacheResult<u64>;

    /// One page of keys starting with `prefix`, resuming from `cursor`
    ///
    /// Keys deleted between pages do not disturb the rest of the scan.
    async fn scan_page(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        count: usize,
    ) -> CacheResult<ScanPage>;

    /// Keys starting with `prefix`, at most `limit` of them
    async fn scan_prefix(&self, prefix: &str, limit: Option<usize>) -> CacheResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .scan_page(prefix, cursor.as_deref(), SCAN_PAGE_SIZE)
                .await?;
            keys.extend(page.keys);
            if let Some(limit) = limit {
                if keys.len() >= limit {
                    keys.truncate(limit);
                    break;
                }
            }
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(keys)
    }

    /// Number of keys starting with `prefix`, counted page by page
    async fn count_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let mut count = 0u64;
        let mut cursor: Option<String> = None;
        loop {
            let page = self
                .scan_page(prefix, cursor.as_deref(), SCAN_PAGE_SIZE)
                .await?;
            count += page.keys.len() as u64;
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(count)
    }

    /// Approximate bytes used by one key, if the backend can tell
    async fn memory_usage(&self, key: &str) -> CacheResult<Option<u64>>;
}

/// Redis backend with separate binary and text connections
pub struct RedisBackend {
    binary: ConnectionManager,
    text: ConnectionManager,
    operation_timeout: Duration,
}

impl RedisBackend {
    /// Connect both connections and verify the server answers
    pub async fn connect(config: &RedisConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.as_str())?;

        let binary = tokio::time::timeout(config.connect_timeout, client.get_connection_manager())
            .await
            .map_err(|_| CacheError::timeout("connect"))??;
        let text = tokio::time::timeout(config.connect_timeout, client.get_connection_manager())
            .await
            .map_err(|_| CacheError::timeout("connect"))??;

        let backend = Self {
            binary,
            text,
            operation_timeout: config.operation_timeout,
        };
        backend.ping().await?;

        info!("Connected to Redis cache backend");
        Ok(backend)
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> CacheResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        tokio::time::timeout(self.operation_timeout, fut)
            .await
            .map_err(|_| CacheError::timeout(operation))?
            .map_err(CacheError::from)
    }
}

fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// Escape glob metacharacters so a prefix matches literally in SCAN
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('*');
    escaped
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.text.clone();
        let _pong: String = self
            .bounded("PING", redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }

    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.binary.clone();
        self.bounded("GET", conn.get(key)).await
    }

    async fn get_text(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.text.clone();
        self.bounded("GET", conn.get(key)).await
    }

    async fn set_text(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let mut conn = self.text.clone();
        match ttl {
            Some(ttl) => {
                self.bounded("SETEX", conn.set_ex(key, value, ttl_seconds(ttl)))
                    .await
            }
            None => self.bounded("SET", conn.set(key, value)).await,
        }
    }

    async fn set_bytes_atomic(
        &self,
        entries: &[(String, Vec<u8>)],
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            match ttl {
                Some(ttl) => pipe.set_ex(key, value.as_slice(), ttl_seconds(ttl)).ignore(),
                None => pipe.set(key, value.as_slice()).ignore(),
            };
        }

        let mut conn = self.binary.clone();
        self.bounded("MULTI/EXEC", pipe.query_async(&mut conn)).await
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.text.clone();
        self.bounded("DEL", conn.del(keys)).await
    }

    async fn scan_page(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        count: usize,
    ) -> CacheResult<ScanPage> {
        let cursor: u64 = match cursor {
            Some(cursor) => cursor.parse().map_err(|_| {
                redis::RedisError::from((redis::ErrorKind::TypeError, "invalid SCAN cursor"))
            })?,
            None => 0,
        };
        let pattern = escape_glob(prefix);
        let mut conn = self.text.clone();

        let (next, keys): (u64, Vec<String>) = self
            .bounded(
                "SCAN",
                redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(count)
                    .query_async(&mut conn),
            )
            .await?;
        debug!("Scanned {} keys matching {}", keys.len(), pattern);

        Ok(ScanPage {
            keys,
            next: (next != 0).then(|| next.to_string()),
        })
    }

    async fn memory_usage(&self, key: &str) -> CacheResult<Option<u64>> {
        let mut conn = self.text.clone();
        self.bounded(
            "MEMORY USAGE",
            redis::cmd("MEMORY").arg("USAGE").arg(key).query_async(&mut conn),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_glob_matches_prefix_literally() {
        assert_eq!(escape_glob("logo:img:"), "logo:img:*");
        assert_eq!(escape_glob("a*b?[c]"), "a\\*b\\?\\[c\\]*");
    }

    #[test]
    fn test_ttl_never_rounds_to_zero() {
        assert_eq!(ttl_seconds(Duration::from_millis(10)), 1);
        assert_eq!(ttl_seconds(Duration::from_secs(3600)), 3600);
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails_fast() {
        let config = RedisConfig {
            url: "redis://127.0.0.1:1/0".to_string(),
            connect_timeout: Duration::from_millis(500),
            ..RedisConfig::default()
        };
        assert!(RedisBackend::connect(&config).await.is_err());
    }
}
