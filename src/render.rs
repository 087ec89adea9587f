//! Deduplicated, cached chart rendering.
//!
//! [`RenderCoordinator`] sits between dashboard panels and the chart library
//! (plugged in as a [`ChartRenderer`]). For each request it:
//!
//! ```text
//!   render(container, option, key?)
//!         │
//!         ▼            hit
//!   chart cache ────────────► downsample, set_option on the cached chart
//!         │ miss
//!         ▼            found
//!   in-flight table ────────► await the running job's result
//!         │ none
//!         ▼
//!   spawn job: downsample → init chart → set_option → cache it
//!              → drop in-flight record
//! ```
//!
//! The cache lookup and the in-flight lookup/registration happen under one
//! lock, so two callers can never both see "nothing running" for the same key
//! and start two constructions. Every caller that joined a job gets the same
//! outcome, success or error. A job runs on its own task and always finishes,
//! even if every caller stops waiting; a panicking renderer ends the job with
//! [`CitylightError::JobAborted`]. Failed constructions are not cached.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tracing::{debug, instrument, warn};

use crate::cache::{BoundedCache, CacheConfig, CacheStats, EstimateSize};
use crate::chart::ChartOption;
use crate::downsample::{DEFAULT_THRESHOLD, Downsampler};
use crate::telemetry;
use crate::{CitylightError, Result};

/// The chart library, as seen by the coordinator.
#[async_trait]
pub trait ChartRenderer: Send + Sync + 'static {
    /// Handle to a live chart instance.
    type Chart: Send + Sync + 'static;

    /// Create an empty chart bound to `container`.
    async fn init(&self, container: &Container) -> Result<Self::Chart>;

    /// Replace the chart's option (no merge with the previous one).
    fn set_option(&self, chart: &Self::Chart, option: &ChartOption) -> Result<()>;

    /// Release the chart's resources.
    fn dispose(&self, _chart: &Self::Chart) {}
}

/// Where a chart is drawn. Only the element id takes part in cache keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Container {
    pub id: Option<String>,
}

impl Container {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()) }
    }

    /// A container without an element id.
    pub fn anonymous() -> Self {
        Self { id: None }
    }
}

/// Configuration for [`RenderCoordinator`].
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Chart cache. Default: 50 entries, 10 minutes.
    pub cache: CacheConfig,
    /// Primary series length above which options are downsampled. Default: 1000.
    pub downsample_threshold: usize,
    /// Index of the series inspected for downsampling. Default: 0.
    pub primary_series: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::new()
                .max_entries(50)
                .ttl(Duration::from_secs(600))
                .name("chart"),
            downsample_threshold: DEFAULT_THRESHOLD,
            primary_series: 0,
        }
    }
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn downsample_threshold(mut self, threshold: usize) -> Self {
        self.downsample_threshold = threshold;
        self
    }

    pub fn primary_series(mut self, index: usize) -> Self {
        self.primary_series = index;
        self
    }
}

/// Fingerprint used when a caller gives no explicit key.
pub fn fingerprint(container: &Container, option: &ChartOption) -> Result<String> {
    Ok(format!(
        "chart_{}_{}",
        container.id.as_deref().unwrap_or("default"),
        option.to_json()?
    ))
}

struct CachedChart<C> {
    chart: Arc<C>,
    option_size: usize,
}

impl<C> Clone for CachedChart<C> {
    fn clone(&self) -> Self {
        Self {
            chart: Arc::clone(&self.chart),
            option_size: self.option_size,
        }
    }
}

impl<C> EstimateSize for CachedChart<C> {
    fn estimated_size(&self) -> usize {
        self.option_size
    }
}

type RenderJob<C> = Shared<BoxFuture<'static, Result<Arc<C>>>>;

enum Plan<C> {
    Cached(CachedChart<C>, ChartOption),
    Join(RenderJob<C>),
    Start(RenderJob<C>),
}

struct Inner<R: ChartRenderer> {
    renderer: R,
    cache: BoundedCache<String, CachedChart<R::Chart>>,
    in_flight: Mutex<HashMap<String, RenderJob<R::Chart>>>,
    downsampler: Downsampler,
}

impl<R: ChartRenderer> Inner<R> {
    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<String, RenderJob<R::Chart>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn construct(&self, container: &Container, option: &ChartOption) -> Result<R::Chart> {
        let chart = self.renderer.init(container).await?;
        if let Err(e) = self.renderer.set_option(&chart, option) {
            self.renderer.dispose(&chart);
            return Err(e);
        }
        Ok(chart)
    }
}

/// Cache + in-flight deduplication + downsampling in front of a [`ChartRenderer`].
///
/// Cheap to clone; clones share the same cache and in-flight table. Build
/// one at startup and hand it to every panel.
pub struct RenderCoordinator<R: ChartRenderer> {
    inner: Arc<Inner<R>>,
}

impl<R: ChartRenderer> Clone for RenderCoordinator<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: ChartRenderer> RenderCoordinator<R> {
    pub fn new(renderer: R, config: &RenderConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                renderer,
                cache: BoundedCache::new(&config.cache),
                in_flight: Mutex::new(HashMap::new()),
                downsampler: Downsampler::new(config.downsample_threshold)
                    .primary_series(config.primary_series),
            }),
        }
    }

    /// Render `option` into `container`, reusing or sharing work where possible.
    ///
    /// `key` defaults to [`fingerprint`]`(container, option)`, computed on the
    /// option as given (before downsampling). Downsampling only happens on the
    /// paths that hand the option to the renderer. Must be called within a
    /// tokio runtime.
    #[instrument(skip_all, fields(container = container.id.as_deref().unwrap_or("default")))]
    pub async fn render(
        &self,
        container: &Container,
        option: ChartOption,
        key: Option<&str>,
    ) -> Result<Arc<R::Chart>> {
        let key = match key {
            Some(k) => k.to_owned(),
            None => fingerprint(container, &option)?,
        };

        let plan = {
            let mut in_flight = self.inner.lock_in_flight();
            if let Some(hit) = self.inner.cache.get(&key) {
                Plan::Cached(hit, option)
            } else if let Some(job) = in_flight.get(&key) {
                Plan::Join(job.clone())
            } else {
                let job = self.start(key.clone(), container.clone(), option);
                in_flight.insert(key.clone(), job.clone());
                Plan::Start(job)
            }
        };

        match plan {
            Plan::Cached(hit, option) => {
                let option = self.inner.downsampler.optimize(option);
                self.inner.renderer.set_option(&hit.chart, &option)?;
                metrics::counter!(telemetry::RENDERS_TOTAL, "outcome" => "cached").increment(1);
                Ok(hit.chart)
            }
            Plan::Join(job) => {
                debug!(key = %key, "joining in-flight render");
                metrics::counter!(telemetry::RENDERS_TOTAL, "outcome" => "joined").increment(1);
                job.await
            }
            Plan::Start(job) => job.await,
        }
    }

    /// Spawn the construction task for `key` and wrap it for sharing.
    fn start(&self, key: String, container: Container, option: ChartOption) -> RenderJob<R::Chart> {
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let start = Instant::now();
            let option = inner.downsampler.optimize(option);
            let result = match AssertUnwindSafe(inner.construct(&container, &option))
                .catch_unwind()
                .await
            {
                Ok(built) => built.map(Arc::new),
                Err(panic) => Err(CitylightError::JobAborted(panic_message(&*panic))),
            };
            metrics::histogram!(telemetry::RENDER_DURATION_SECONDS)
                .record(start.elapsed().as_secs_f64());

            match &result {
                Ok(chart) => {
                    let cached = CachedChart {
                        chart: Arc::clone(chart),
                        option_size: option.estimated_size(),
                    };
                    inner.cache.set(task_key.clone(), cached);
                    metrics::counter!(telemetry::RENDERS_TOTAL, "outcome" => "rendered")
                        .increment(1);
                }
                Err(e) => {
                    warn!(key = %task_key, error = %e, "chart construction failed");
                    metrics::counter!(telemetry::RENDERS_TOTAL, "outcome" => "error").increment(1);
                }
            }
            // Cache first, then release: a caller that no longer sees the job
            // finds the chart.
            inner.lock_in_flight().remove(&task_key);
            result
        });

        let inner = Arc::clone(&self.inner);
        async move {
            match handle.await {
                Ok(result) => result,
                Err(join_err) => {
                    inner.lock_in_flight().remove(&key);
                    Err(CitylightError::JobAborted(join_err.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Cached chart for `key`, if live. Does not touch the chart.
    pub fn cached(&self, key: &str) -> Option<Arc<R::Chart>> {
        self.inner.cache.get(key).map(|hit| hit.chart)
    }

    /// Drop the cached chart for `key` without disposing it.
    pub fn invalidate(&self, key: &str) -> bool {
        self.inner.cache.delete(key)
    }

    /// Dispose every cached chart, expired ones included, and empty the
    /// cache. Returns how many were disposed.
    pub fn dispose_all(&self) -> usize {
        let charts = self.inner.cache.take_all();
        for (_, cached) in &charts {
            self.inner.renderer.dispose(&cached.chart);
        }
        charts.len()
    }

    /// Number of constructions currently running.
    pub fn in_flight(&self) -> usize {
        self.inner.lock_in_flight().len()
    }

    /// Chart cache occupancy.
    pub fn stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    pub fn downsampler(&self) -> &Downsampler {
        &self.inner.downsampler
    }

    pub fn renderer(&self) -> &R {
        &self.inner.renderer
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("renderer panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("renderer panicked: {msg}")
    } else {
        "renderer panicked".to_owned()
    }
}
