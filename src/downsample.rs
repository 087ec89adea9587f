//! Lossy reduction of oversized chart series.
//!
//! When the primary series of a [`ChartOption`] holds more than `threshold`
//! points it is cut down to roughly `threshold / 10` points. Consecutive
//! chunks of `step = len / target` points collapse into one: the mean for
//! numbers, the middle element for anything else. The transform is
//! deterministic and order-preserving, and a series already at or under the
//! target is returned as is, so running it twice changes nothing.

use serde_json::{Map, Number, Value, json};
use tracing::debug;

use crate::chart::{ChartOption, SeriesData};
use crate::telemetry;

/// Default series length above which reduction kicks in.
pub const DEFAULT_THRESHOLD: usize = 1000;

/// Reduced length is `threshold / REDUCTION_FACTOR` (at least 1).
pub const REDUCTION_FACTOR: usize = 10;

/// Downsampling policy for chart options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Downsampler {
    threshold: usize,
    primary_series: usize,
}

impl Downsampler {
    /// Reduce the first series once it exceeds `threshold` points.
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            primary_series: 0,
        }
    }

    /// Inspect `series[index]` instead of the first series.
    pub fn primary_series(mut self, index: usize) -> Self {
        self.primary_series = index;
        self
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Length a reduced series is aimed at.
    pub fn target_len(&self) -> usize {
        (self.threshold / REDUCTION_FACTOR).max(1)
    }

    /// Return `option` with its primary series reduced if it is oversized.
    pub fn optimize(&self, mut option: ChartOption) -> ChartOption {
        self.optimize_in_place(&mut option);
        option
    }

    /// Reduce the primary series in place. Returns whether anything changed.
    ///
    /// A reduced chart also gets a crosshair axis pointer in its tooltip,
    /// since individual points no longer line up with the raw data.
    pub fn optimize_in_place(&self, option: &mut ChartOption) -> bool {
        let Some(series) = option.series.get_mut(self.primary_series) else {
            return false;
        };
        let original = series.data.len();
        if original <= self.threshold {
            return false;
        }

        let reduced = reduce(&series.data, self.target_len());
        if reduced.len() == original {
            return false;
        }
        series.data = reduced;
        debug!(
            from = original,
            to = series.data.len(),
            threshold = self.threshold,
            "downsampled primary series"
        );
        metrics::counter!(telemetry::DOWNSAMPLED_TOTAL).increment(1);

        option.tooltip.get_or_insert_with(Map::new).insert(
            "axisPointer".to_owned(),
            json!({"type": "cross", "animation": false}),
        );
        true
    }
}

impl Default for Downsampler {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

/// Reduce `data` to about `target` points (`ceil(len / step)` with
/// `step = len / target`). Data at or under `target` is returned unchanged.
pub fn reduce(data: &SeriesData, target: usize) -> SeriesData {
    let len = data.len();
    let target = target.max(1);
    if len <= target {
        return data.clone();
    }
    let step = len / target;

    match data {
        SeriesData::Numeric(values) => {
            SeriesData::Numeric(values.chunks(step).map(average_numbers).collect())
        }
        SeriesData::Categorical(values) => {
            SeriesData::Categorical(values.chunks(step).map(aggregate_chunk).collect())
        }
    }
}

/// Mean of the chunk as a new number. A single-point chunk keeps its point.
fn average_numbers(chunk: &[Number]) -> Number {
    if let [only] = chunk {
        return only.clone();
    }
    let values: Vec<f64> = chunk.iter().filter_map(Number::as_f64).collect();
    Number::from_f64(mean(&values)).unwrap_or_else(|| chunk[chunk.len() / 2].clone())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn middle(chunk: &[Value]) -> Value {
    chunk[chunk.len() / 2].clone()
}

/// A chunk that leads with a number averages its numeric points; any other
/// chunk keeps its middle element.
fn aggregate_chunk(chunk: &[Value]) -> Value {
    match chunk {
        [only] => only.clone(),
        [Value::Number(_), ..] => {
            let numbers: Vec<f64> = chunk.iter().filter_map(Value::as_f64).collect();
            Number::from_f64(mean(&numbers))
                .map(Value::Number)
                .unwrap_or_else(|| middle(chunk))
        }
        _ => middle(chunk),
    }
}
