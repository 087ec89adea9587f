//! Configuration loading.
//!
//! All settings are fixed at construction. They can be built in code with
//! the per-component config builders, or loaded from a TOML file where every
//! key is optional:
//!
//! ```toml
//! [cache]
//! max_entries = 100
//! ttl_secs = 300
//!
//! [render]
//! max_entries = 50
//! ttl_secs = 600
//! downsample_threshold = 1000
//! primary_series = 0
//!
//! [batch]
//! size = 10
//!
//! [monitor]
//! window = 100
//!
//! [paging]
//! page_size = 100
//!
//! [source]
//! max_entries = 100
//! ttl_secs = 300
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::batch::DEFAULT_BATCH_SIZE;
use crate::cache::{CacheConfig, SourceConfig};
use crate::downsample::DEFAULT_THRESHOLD;
use crate::monitor::{DEFAULT_WINDOW, MetricsRecorder};
use crate::paginate::{DEFAULT_PAGE_SIZE, Paginator};
use crate::render::RenderConfig;
use crate::{CitylightError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerfConfig {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub render: RenderSection,
    #[serde(default)]
    pub batch: BatchSection,
    #[serde(default)]
    pub monitor: MonitorSection,
    #[serde(default)]
    pub paging: PagingSection,
    #[serde(default)]
    pub source: SourceSection,
}

/// General-purpose memory cache.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Maximum entries (default: 100).
    #[serde(default = "default_cache_entries")]
    pub max_entries: usize,
    /// Entry lifetime in seconds (default: 300).
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_entries: default_cache_entries(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_cache_entries() -> usize {
    100
}

fn default_cache_ttl() -> u64 {
    300
}

/// Chart cache and downsampling.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderSection {
    /// Maximum cached charts (default: 50).
    #[serde(default = "default_render_entries")]
    pub max_entries: usize,
    /// Chart lifetime in seconds (default: 600).
    #[serde(default = "default_render_ttl")]
    pub ttl_secs: u64,
    /// Primary series length that triggers downsampling (default: 1000).
    #[serde(default = "default_threshold")]
    pub downsample_threshold: usize,
    /// Index of the series inspected for downsampling (default: 0).
    #[serde(default)]
    pub primary_series: usize,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            max_entries: default_render_entries(),
            ttl_secs: default_render_ttl(),
            downsample_threshold: default_threshold(),
            primary_series: 0,
        }
    }
}

fn default_render_entries() -> usize {
    50
}

fn default_render_ttl() -> u64 {
    600
}

fn default_threshold() -> usize {
    DEFAULT_THRESHOLD
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchSection {
    /// Items per group (default: 10).
    #[serde(default = "default_batch_size")]
    pub size: usize,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl BatchSection {
    /// Group size to pass to [`batch_process`](crate::batch_process).
    pub fn batch_size(&self) -> usize {
        self.size.max(1)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSection {
    /// Samples kept per series (default: 100).
    #[serde(default = "default_window")]
    pub window: usize,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            window: default_window(),
        }
    }
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagingSection {
    /// Items per page (default: 100).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for PagingSection {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Per-endpoint fetch cache.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSection {
    /// Maximum cached endpoints (default: 100).
    #[serde(default = "default_source_entries")]
    pub max_entries: u64,
    /// Response lifetime in seconds (default: 300).
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            max_entries: default_source_entries(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_source_entries() -> u64 {
    100
}

impl PerfConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CitylightError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            CitylightError::Configuration(msg) => {
                CitylightError::Configuration(format!("{path:?}: {msg}"))
            }
            other => other,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            CitylightError::Configuration(format!("Failed to parse config: {e}"))
        })
    }
}

impl From<&CacheSection> for CacheConfig {
    fn from(section: &CacheSection) -> Self {
        CacheConfig::new()
            .max_entries(section.max_entries)
            .ttl(Duration::from_secs(section.ttl_secs))
    }
}

impl From<&RenderSection> for RenderConfig {
    fn from(section: &RenderSection) -> Self {
        RenderConfig::new()
            .cache(
                CacheConfig::new()
                    .max_entries(section.max_entries)
                    .ttl(Duration::from_secs(section.ttl_secs))
                    .name("chart"),
            )
            .downsample_threshold(section.downsample_threshold)
            .primary_series(section.primary_series)
    }
}

impl From<&MonitorSection> for MetricsRecorder {
    fn from(section: &MonitorSection) -> Self {
        MetricsRecorder::with_window(section.window)
    }
}

impl<T> From<&PagingSection> for Paginator<T> {
    fn from(section: &PagingSection) -> Self {
        Paginator::new(section.page_size)
    }
}

impl From<&SourceSection> for SourceConfig {
    fn from(section: &SourceSection) -> Self {
        SourceConfig::new()
            .max_entries(section.max_entries)
            .ttl(Duration::from_secs(section.ttl_secs))
    }
}
