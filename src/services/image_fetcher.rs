//! Logo asset download and caching
//!
//! A download is accepted only when the origin answers 200 with an `image/*`
//! content type and a body within the configured size limit. Anything else
//! is dropped before it can reach the cache.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::TieredStore;
use crate::errors::{OriginError, OriginResult};
use crate::models::{LogoImage, LogoSource};
use crate::observability::LogoMetrics;
use crate::utils::HttpClientFactory;

/// Raw body and declared content type of a successful download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedAsset {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[async_trait]
pub trait LogoDownloader: Send + Sync {
    /// GET `url`; anything but 200 is an error, and so is a body over `max_bytes`
    async fn download(&self, url: &str, max_bytes: usize) -> OriginResult<DownloadedAsset>;
}

pub struct HttpLogoDownloader {
    client: Client,
}

impl HttpLogoDownloader {
    pub fn new(factory: &HttpClientFactory, timeout: Duration) -> OriginResult<Self> {
        Ok(Self {
            client: factory.create_client(timeout)?,
        })
    }
}

#[async_trait]
impl LogoDownloader for HttpLogoDownloader {
    async fn download(&self, url: &str, max_bytes: usize) -> OriginResult<DownloadedAsset> {
        let mut response = self.client.get(url).send().await?;

        if response.status() != StatusCode::OK {
            return Err(OriginError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        if let Some(length) = response.content_length() {
            if length > max_bytes as u64 {
                return Err(OriginError::TooLarge {
                    size: length as usize,
                    max: max_bytes,
                });
            }
        }

        // Stream so a missing or lying Content-Length cannot exhaust memory
        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > max_bytes {
                return Err(OriginError::TooLarge {
                    size: body.len() + chunk.len(),
                    max: max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(DownloadedAsset {
            content_type,
            bytes: body.freeze(),
        })
    }
}

/// Lowercased media type without parameters, e.g. `image/svg+xml`
pub fn normalize_content_type(raw: &str) -> Option<String> {
    let media_type = raw.split(';').next().unwrap_or_default().trim();
    if media_type.is_empty() {
        None
    } else {
        Some(media_type.to_ascii_lowercase())
    }
}

pub struct ImageFetcher {
    downloader: Arc<dyn LogoDownloader>,
    store: TieredStore,
    max_image_bytes: usize,
    metrics: LogoMetrics,
}

impl ImageFetcher {
    pub fn new(downloader: Arc<dyn LogoDownloader>, store: TieredStore, max_image_bytes: usize) -> Self {
        let metrics = store.metrics().clone();
        Self {
            downloader,
            store,
            max_image_bytes,
            metrics,
        }
    }

    /// Download, validate and cache a logo under `company_name`
    pub async fn fetch_and_cache(
        &self,
        url: &str,
        company_name: &str,
        source: LogoSource,
    ) -> Option<LogoImage> {
        self.fetch_and_cache_as(url, company_name, company_name, source)
            .await
    }

    /// As [`fetch_and_cache`](Self::fetch_and_cache), recording `resolved_name`
    /// in the metadata while caching under the queried `company_name`
    ///
    /// The image is returned whether or not the cache write succeeded.
    pub async fn fetch_and_cache_as(
        &self,
        url: &str,
        company_name: &str,
        resolved_name: &str,
        source: LogoSource,
    ) -> Option<LogoImage> {
        let image = self.fetch_checked(url, company_name).await?;

        if let Err(e) = self
            .store
            .put_image(company_name, &image, resolved_name, source)
            .await
        {
            warn!("Serving logo for '{}' uncached: {}", company_name, e);
        }

        Some(image)
    }

    /// Download and validate a logo without touching the cache
    pub async fn fetch_checked(&self, url: &str, company_name: &str) -> Option<LogoImage> {
        match self.fetch(url).await {
            Ok(image) => Some(image),
            Err(e @ (OriginError::NotImage { .. } | OriginError::TooLarge { .. })) => {
                self.metrics.record_asset_rejected();
                warn!("Rejected logo asset for '{}' from {}: {}", company_name, url, e);
                None
            }
            Err(e) => {
                self.metrics.record_origin_failure("image");
                warn!("Logo download failed for '{}' from {}: {}", company_name, url, e);
                None
            }
        }
    }

    async fn fetch(&self, url: &str) -> OriginResult<LogoImage> {
        self.metrics.record_origin_call("image");
        let asset = self.downloader.download(url, self.max_image_bytes).await?;

        let content_type = asset
            .content_type
            .as_deref()
            .and_then(normalize_content_type)
            .filter(|content_type| content_type.starts_with("image/"))
            .ok_or_else(|| OriginError::NotImage {
                content_type: asset.content_type.clone().unwrap_or_default(),
            })?;

        if asset.bytes.len() > self.max_image_bytes {
            return Err(OriginError::TooLarge {
                size: asset.bytes.len(),
                max: self.max_image_bytes,
            });
        }

        debug!("Downloaded {} bytes of {} from {}", asset.bytes.len(), content_type, url);
        Ok(LogoImage::new(asset.bytes, content_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemoryBackend, KeyDeriver};
    use crate::config::TtlConfig;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SpyDownloader {
        content_type: Option<&'static str>,
        body: Vec<u8>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LogoDownloader for SpyDownloader {
        async fn download(&self, _url: &str, _max_bytes: usize) -> OriginResult<DownloadedAsset> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(DownloadedAsset {
                content_type: self.content_type.map(str::to_string),
                bytes: Bytes::from(self.body.clone()),
            })
        }
    }

    fn fetcher(content_type: Option<&'static str>, body: Vec<u8>, max: usize) -> (ImageFetcher, TieredStore) {
        let store = TieredStore::new(
            Arc::new(InMemoryBackend::new()),
            KeyDeriver::default(),
            TtlConfig::default(),
            LogoMetrics::default(),
        );
        let downloader = Arc::new(SpyDownloader {
            content_type,
            body,
            calls: AtomicUsize::new(0),
        });
        (ImageFetcher::new(downloader, store.clone(), max), store)
    }

    #[rstest]
    #[case("image/png", Some("image/png"))]
    #[case("Image/SVG+XML; charset=utf-8", Some("image/svg+xml"))]
    #[case("  text/html ;q=1", Some("text/html"))]
    #[case(";", None)]
    #[case("", None)]
    fn test_normalize_content_type(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_content_type(raw).as_deref(), expected);
    }

    #[tokio::test]
    async fn test_image_is_returned_and_cached() {
        let (fetcher, store) = fetcher(Some("image/PNG"), vec![1, 2, 3], 1024);
        let image = fetcher
            .fetch_and_cache_as("https://cdn/acme.png", "acme", "Acme Inc", LogoSource::Api)
            .await
            .unwrap();
        assert_eq!(image.content_type, "image/png");

        assert_eq!(store.get_image("acme").await, Some(image));
        let metadata = store.get_image_metadata("acme").await.unwrap();
        assert_eq!(metadata.company_name, "Acme Inc");
        assert_eq!(metadata.source, LogoSource::Api);
    }

    #[rstest]
    #[case(Some("text/html; charset=utf-8"))]
    #[case(Some("application/json"))]
    #[case(None)]
    #[tokio::test]
    async fn test_non_image_is_never_cached(#[case] content_type: Option<&'static str>) {
        let (fetcher, store) = fetcher(content_type, b"<html>".to_vec(), 1024);
        assert!(
            fetcher
                .fetch_and_cache("https://cdn/acme.png", "acme", LogoSource::Api)
                .await
                .is_none()
        );
        assert!(store.get_image("acme").await.is_none());
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let (fetcher, store) = fetcher(Some("image/png"), vec![0; 64], 16);
        assert!(
            fetcher
                .fetch_and_cache("https://cdn/acme.png", "acme", LogoSource::Api)
                .await
                .is_none()
        );
        assert_eq!(store.stats().await.tiers.image, 0);
    }

    #[tokio::test]
    async fn test_cache_failure_still_returns_image() {
        let store = TieredStore::degraded(
            KeyDeriver::default(),
            TtlConfig::default(),
            LogoMetrics::default(),
        );
        let downloader = Arc::new(SpyDownloader {
            content_type: Some("image/svg+xml"),
            body: b"<svg/>".to_vec(),
            calls: AtomicUsize::new(0),
        });
        let fetcher = ImageFetcher::new(downloader, store, 1024);

        let image = fetcher
            .fetch_and_cache("https://cdn/acme.svg", "acme", LogoSource::Api)
            .await
            .unwrap();
        assert_eq!(image.content_type, "image/svg+xml");
    }
}
