//! Telemetry metric name constants.
//!
//! Centralised metric names for citylight operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `citylight_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `reason`: why an entry left the cache: "capacity" or "expired"
//! - `outcome`: how a render request was served
//! - `status`: data source lookup result: "hit", "miss" or "error"

/// Total cache lookups that returned a live entry.
pub const CACHE_HITS_TOTAL: &str = "citylight_cache_hits_total";

/// Total cache lookups that found nothing (or only an expired entry).
pub const CACHE_MISSES_TOTAL: &str = "citylight_cache_misses_total";

/// Total entries removed by the cache itself.
///
/// Labels: `reason` ("capacity" | "expired").
pub const CACHE_EVICTIONS_TOTAL: &str = "citylight_cache_evictions_total";

/// Total render requests.
///
/// Labels: `outcome` ("cached" | "joined" | "rendered" | "error").
pub const RENDERS_TOTAL: &str = "citylight_renders_total";

/// Duration of artifact construction in seconds (cache misses only).
pub const RENDER_DURATION_SECONDS: &str = "citylight_render_duration_seconds";

/// Total series reduced by the downsampler.
pub const DOWNSAMPLED_TOTAL: &str = "citylight_downsampled_total";

/// Total groups processed by the batch processor.
pub const BATCHES_TOTAL: &str = "citylight_batches_total";

/// Total data source requests.
///
/// Labels: `status` ("hit" | "miss" | "error").
pub const SOURCE_REQUESTS_TOTAL: &str = "citylight_source_requests_total";

/// Samples recorded through [`MetricsRecorder`](crate::monitor::MetricsRecorder).
///
/// Labels: `name`.
pub const SAMPLE: &str = "citylight_sample";
