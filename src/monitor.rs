//! Rolling-window performance samples.
//!
//! [`MetricsRecorder`] keeps the most recent `window` observations per named
//! series (render times, fetch latencies, ...) and derives aggregates on
//! demand. It is independent of any cache. Each sample is also forwarded to
//! the `metrics` facade as a histogram so an installed exporter sees it too.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::telemetry;

/// Default number of samples retained per series.
pub const DEFAULT_WINDOW: usize = 100;

/// Aggregates over the retained samples of one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl SeriesSummary {
    fn from_samples(samples: &VecDeque<f64>) -> Self {
        if samples.is_empty() {
            return Self {
                average: 0.0,
                min: 0.0,
                max: 0.0,
                count: 0,
            };
        }
        let (sum, min, max) = samples.iter().fold(
            (0.0, f64::INFINITY, f64::NEG_INFINITY),
            |(sum, min, max), &v| (sum + v, min.min(v), max.max(v)),
        );
        Self {
            average: sum / samples.len() as f64,
            min,
            max,
            count: samples.len(),
        }
    }
}

/// Per-name bounded sample windows.
///
/// Thread-safe; construct one and share it (e.g. behind an `Arc`).
pub struct MetricsRecorder {
    series: Mutex<HashMap<String, VecDeque<f64>>>,
    window: usize,
}

impl MetricsRecorder {
    /// Create a recorder retaining [`DEFAULT_WINDOW`] samples per series.
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    /// Create a recorder retaining `window` samples per series (at least one).
    pub fn with_window(window: usize) -> Self {
        Self {
            series: Mutex::new(HashMap::new()),
            window: window.max(1),
        }
    }

    /// Append a sample, dropping the oldest once the window is full.
    pub fn record(&self, name: &str, value: f64) {
        {
            let mut series = self.lock();
            let samples = series.entry(name.to_owned()).or_default();
            samples.push_back(value);
            while samples.len() > self.window {
                samples.pop_front();
            }
        }
        metrics::histogram!(telemetry::SAMPLE, "name" => name.to_owned()).record(value);
    }

    /// Retained samples for `name`, oldest first. Empty if never recorded.
    pub fn samples(&self, name: &str) -> Vec<f64> {
        self.lock()
            .get(name)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Mean of the retained samples, or `0.0` when there are none.
    pub fn average(&self, name: &str) -> f64 {
        self.summary(name).average
    }

    /// Aggregates for one series; all zero when there are no samples.
    pub fn summary(&self, name: &str) -> SeriesSummary {
        match self.lock().get(name) {
            Some(samples) => SeriesSummary::from_samples(samples),
            None => SeriesSummary::from_samples(&VecDeque::new()),
        }
    }

    /// Aggregates for every recorded series, ordered by name.
    pub fn report(&self) -> BTreeMap<String, SeriesSummary> {
        self.lock()
            .iter()
            .map(|(name, samples)| (name.clone(), SeriesSummary::from_samples(samples)))
            .collect()
    }

    /// Remove all series.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Samples retained per series.
    pub fn window(&self) -> usize {
        self.window
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<f64>>> {
        self.series.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
