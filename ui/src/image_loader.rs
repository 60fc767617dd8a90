//! Image downloading and on-disk caching for thumbnails and previews.

use futures::StreamExt;
use iced::widget::image::Handle;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Semaphore;

#[derive(Debug, Error)]
pub enum ImageLoaderError {
    #[error("network error: {0}")]
    Request(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("semaphore closed")]
    SemaphoreClosed,
}

#[derive(Debug, Clone)]
pub struct ImageLoader {
    cache_dir: PathBuf,
    client: reqwest::Client,
    semaphore: Arc<Semaphore>,
}

impl ImageLoader {
    pub fn new(cache_dir: PathBuf, max_concurrent: usize) -> Self {
        Self {
            cache_dir,
            client: reqwest::Client::new(),
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Cache file for a URL. Thumbnail URLs change with every regeneration,
    /// so the URL alone is a sufficient key.
    pub fn cache_path(&self, url: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        url.hash(&mut hasher);
        self.cache_dir
            .join("previews")
            .join(format!("{:016x}.img", hasher.finish()))
    }

    pub async fn load_url(&self, url: &str) -> Result<Handle, ImageLoaderError> {
        let start = Instant::now();
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ImageLoaderError::SemaphoreClosed)?;

        let cache_path = self.cache_path(url);
        if cache_path.exists() {
            return Ok(Handle::from_path(&cache_path));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageLoaderError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ImageLoaderError::Request(format!("HTTP {}", response.status())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImageLoaderError::Request(e.to_string()))?;

        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ImageLoaderError::Io(e.to_string()))?;
        }
        fs::write(&cache_path, &bytes)
            .await
            .map_err(|e| ImageLoaderError::Io(e.to_string()))?;

        tracing::debug!("image_time_ms" = %start.elapsed().as_millis(), %url);
        Ok(Handle::from_path(&cache_path))
    }

    /// Warm the cache for `urls`. Failures are logged and skipped.
    pub async fn preload(&self, urls: Vec<String>) -> usize {
        let start = Instant::now();
        let count = urls.len();
        futures::stream::iter(urls)
            .for_each_concurrent(None, |url| async move {
                if let Err(e) = self.load_url(&url).await {
                    tracing::warn!("Failed to preload {}: {}", url, e);
                }
            })
            .await;
        tracing::info!("preload_time_ms" = %start.elapsed().as_millis(), "count" = count);
        count
    }
}
