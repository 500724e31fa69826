//! In-process backend with per-key expiration
//!
//! Used when running without Redis in tests and local development. Keys are
//! kept ordered so prefix scans return a stable sample.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::backend::{CacheBackend, ScanPage};
use crate::errors::{CacheError, CacheResult};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
pub struct InMemoryBackend {
    entries: RwLock<BTreeMap<String, Entry>>,
    offline: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail as if the server went away
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Remaining time to live for a key, `None` when absent or persistent
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_online(&self) -> CacheResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable)
        } else {
            Ok(())
        }
    }

    async fn read_live(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }
}

fn expiry(ttl: Option<Duration>) -> Option<Instant> {
    ttl.map(|ttl| Instant::now() + ttl)
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> CacheResult<()> {
        self.check_online()
    }

    async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.check_online()?;
        Ok(self.read_live(key).await)
    }

    async fn get_text(&self, key: &str) -> CacheResult<Option<String>> {
        self.check_online()?;
        Ok(self
            .read_live(key)
            .await
            .and_then(|bytes| String::from_utf8(bytes).ok()))
    }

    async fn set_text(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        self.check_online()?;
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.as_bytes().to_vec(),
                expires_at: expiry(ttl),
            },
        );
        Ok(())
    }

    async fn set_bytes_atomic(
        &self,
        items: &[(String, Vec<u8>)],
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        self.check_online()?;
        let expires_at = expiry(ttl);
        let mut entries = self.entries.write().await;
        for (key, value) in items {
            entries.insert(
                key.clone(),
                Entry {
                    value: value.clone(),
                    expires_at,
                },
            );
        }
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        self.check_online()?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if entry.is_live(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn scan_page(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        count: usize,
    ) -> CacheResult<ScanPage> {
        self.check_online()?;
        let now = Instant::now();
        let entries = self.entries.read().await;
        let start = match cursor {
            Some(last) => Bound::Excluded(last.to_string()),
            None => Bound::Included(prefix.to_string()),
        };

        let mut matching = entries
            .range((start, Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key.clone())
            .peekable();

        let keys: Vec<String> = matching.by_ref().take(count.max(1)).collect();
        let next = match matching.peek() {
            Some(_) => keys.last().cloned(),
            None => None,
        };
        Ok(ScanPage { keys, next })
    }

    async fn memory_usage(&self, key: &str) -> CacheResult<Option<u64>> {
        self.check_online()?;
        Ok(self
            .read_live(key)
            .await
            .map(|value| (key.len() + value.len()) as u64))
    }
}
