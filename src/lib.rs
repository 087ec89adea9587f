//! Citylight - client-side performance layer for metric dashboards
//!
//! Dashboards fetch precomputed metrics and draw them as charts. This crate
//! holds the parts of that pipeline that need real care:
//!
//! - [`BoundedCache`]: bounded key/value store with TTL expiry and
//!   insertion-order eviction.
//! - [`RenderCoordinator`]: renders chart options through a pluggable
//!   [`ChartRenderer`], reusing cached charts and collapsing concurrent
//!   requests for the same key into one construction.
//! - [`Downsampler`]: shrinks oversized series before they reach the renderer.
//! - [`MetricsRecorder`]: rolling per-name sample windows with aggregates.
//! - [`Paginator`] and [`batch_process`]: paging and grouped processing of
//!   fetched data.
//!
//! # Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use citylight::{ChartOption, ChartRenderer, Container, RenderConfig, RenderCoordinator};
//!
//! struct Canvas;
//!
//! #[async_trait]
//! impl ChartRenderer for Canvas {
//!     type Chart = String;
//!
//!     async fn init(&self, container: &Container) -> citylight::Result<String> {
//!         Ok(container.id.clone().unwrap_or_default())
//!     }
//!
//!     fn set_option(&self, _chart: &String, _option: &ChartOption) -> citylight::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> citylight::Result<()> {
//!     let charts = RenderCoordinator::new(Canvas, &RenderConfig::default());
//!     let option = ChartOption::from_json(r#"{"series": [{"type": "line", "data": [1, 2, 3]}]}"#)?;
//!     let chart = charts.render(&Container::new("density"), option, None).await?;
//!     println!("rendered into {chart}");
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod cache;
pub mod chart;
pub mod config;
pub mod downsample;
pub mod error;
pub mod monitor;
pub mod paginate;
pub mod render;
pub mod telemetry;

// Re-export main types at crate root
pub use batch::{batch_process, try_batch_process};
pub use cache::{BoundedCache, CacheConfig, CacheStats, CachingSource, DataSource, SourceConfig};
pub use chart::{ChartOption, Series, SeriesData};
pub use config::PerfConfig;
pub use downsample::Downsampler;
pub use error::{CitylightError, Result};
pub use monitor::{MetricsRecorder, SeriesSummary};
pub use paginate::{PageInfo, Paginator};
pub use render::{ChartRenderer, Container, RenderConfig, RenderCoordinator};
