//! Per-endpoint cache in front of the dashboard's data fetch layer.
//!
//! The HTTP client itself lives outside this crate; it is plugged in as a
//! [`DataSource`]. [`CachingSource`] is a decorator over any source that keeps
//! successful responses for a fixed TTL, so panels that ask for the same
//! endpoint within the window share one fetch. Failures are never cached.
//!
//! Concurrent misses for the same endpoint are coalesced by moka's
//! `try_get_with`: one caller runs the fetch, the rest wait for its result.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use tracing::warn;

use crate::Result;
use crate::telemetry;

/// Something that can fetch a deserialized payload for an endpoint.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Name for logs.
    fn name(&self) -> &str;

    /// Fetch the payload behind `endpoint` (e.g. `"/hotpot/density"`).
    async fn fetch(&self, endpoint: &str) -> Result<Value>;
}

/// Configuration for [`CachingSource`].
///
/// ```rust
/// # use citylight::cache::SourceConfig;
/// # use std::time::Duration;
/// let config = SourceConfig::new()
///     .max_entries(200)
///     .ttl(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Maximum number of cached endpoints. Default: 100.
    pub max_entries: u64,
    /// Time-to-live for cached responses. Default: 5 minutes.
    pub ttl: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            ttl: Duration::from_secs(300),
        }
    }
}

impl SourceConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached endpoints.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached responses.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Decorator that caches a [`DataSource`]'s successful responses per endpoint.
pub struct CachingSource {
    inner: Arc<dyn DataSource>,
    cache: Cache<String, Value>,
}

impl CachingSource {
    /// Wrap `inner` with a TTL cache.
    pub fn new(inner: Arc<dyn DataSource>, config: &SourceConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self { inner, cache }
    }

    /// Drop every cached endpoint that starts with `prefix`.
    ///
    /// Used after a write invalidates a family of endpoints
    /// (e.g. everything under `"/night/"`).
    pub async fn invalidate_prefix(&self, prefix: &str) {
        let keys: Vec<Arc<String>> = self
            .cache
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k)
            .collect();
        for key in keys {
            self.cache.invalidate(key.as_str()).await;
        }
    }

    /// Drop every cached endpoint.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Whether `endpoint` currently has a cached response.
    pub fn contains(&self, endpoint: &str) -> bool {
        self.cache.contains_key(endpoint)
    }
}

#[async_trait]
impl DataSource for CachingSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, endpoint: &str) -> Result<Value> {
        if let Some(value) = self.cache.get(endpoint).await {
            metrics::counter!(telemetry::SOURCE_REQUESTS_TOTAL, "status" => "hit").increment(1);
            return Ok(value);
        }

        let inner = Arc::clone(&self.inner);
        let result = self
            .cache
            .try_get_with(endpoint.to_owned(), async move { inner.fetch(endpoint).await })
            .await;

        match result {
            Ok(value) => {
                metrics::counter!(telemetry::SOURCE_REQUESTS_TOTAL, "status" => "miss")
                    .increment(1);
                Ok(value)
            }
            Err(e) => {
                metrics::counter!(telemetry::SOURCE_REQUESTS_TOTAL, "status" => "error")
                    .increment(1);
                warn!(source = self.inner.name(), endpoint, error = %e, "fetch failed");
                Err((*e).clone())
            }
        }
    }
}
