//! Chart option payloads.
//!
//! A [`ChartOption`] is the already-deserialized option object handed to the
//! chart renderer. The crate only looks inside `series[*].data`; everything
//! else is carried through untouched in the flattened `extra` maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::cache::EstimateSize;

/// Data points of one series.
///
/// Deserialization tries `Numeric` first, so a plain array of numbers becomes
/// `Numeric` and anything else (category labels, `[x, y]` pairs,
/// `{name, value}` objects, nulls) becomes `Categorical`. Numbers are kept as
/// parsed: integers stay integers and serialize back byte for byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesData {
    Numeric(Vec<Number>),
    Categorical(Vec<Value>),
}

impl SeriesData {
    /// Numeric series from floats. Non-finite values have no JSON form, so a
    /// series containing one becomes `Categorical` with `null` in its place.
    pub fn from_f64s(values: impl IntoIterator<Item = f64>) -> Self {
        let values: Vec<f64> = values.into_iter().collect();
        match values
            .iter()
            .map(|v| Number::from_f64(*v))
            .collect::<Option<Vec<_>>>()
        {
            Some(numbers) => SeriesData::Numeric(numbers),
            None => SeriesData::Categorical(
                values
                    .into_iter()
                    .map(|v| Number::from_f64(v).map_or(Value::Null, Value::Number))
                    .collect(),
            ),
        }
    }

    /// Numeric points as floats, or `None` for a categorical series.
    pub fn to_f64s(&self) -> Option<Vec<f64>> {
        match self {
            SeriesData::Numeric(v) => Some(v.iter().filter_map(Number::as_f64).collect()),
            SeriesData::Categorical(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SeriesData::Numeric(v) => v.len(),
            SeriesData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SeriesData {
    fn default() -> Self {
        SeriesData::Numeric(Vec::new())
    }
}

/// One entry of `option.series`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: SeriesData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Series {
    pub fn new(data: SeriesData) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// A chart option object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartOption {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<Series>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChartOption {
    /// Option with a single series.
    pub fn single(series: Series) -> Self {
        Self {
            series: vec![series],
            ..Self::default()
        }
    }

    /// Parse an option from JSON text.
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Deterministic JSON form: series and tooltip first, then the remaining
    /// keys sorted.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl EstimateSize for ChartOption {
    fn estimated_size(&self) -> usize {
        serde_json::to_vec(self).map(|bytes| bytes.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_parse_as_numeric() {
        let s: Series =
            serde_json::from_value(json!({"type": "line", "data": [1, 2.5, 3]})).unwrap();
        assert_eq!(s.data.to_f64s(), Some(vec![1.0, 2.5, 3.0]));
        assert_eq!(s.kind.as_deref(), Some("line"));
    }

    #[test]
    fn integers_survive_round_trip() {
        let text = r#"{"series":[{"data":[1,2,9007199254740993,-4,0.5]}]}"#;
        let option = ChartOption::from_json(text).unwrap();
        assert!(matches!(option.series[0].data, SeriesData::Numeric(_)));
        assert_eq!(option.to_json().unwrap(), text);
    }

    #[test]
    fn non_finite_floats_become_null_points() {
        let data = SeriesData::from_f64s([1.0, f64::NAN, 3.0]);
        assert_eq!(
            data,
            SeriesData::Categorical(vec![json!(1.0), Value::Null, json!(3.0)])
        );
    }

    #[test]
    fn mixed_points_parse_as_categorical() {
        let s: Series =
            serde_json::from_value(json!({"data": [{"name": "Yuzhong", "value": 3}, [1, 2]]}))
                .unwrap();
        assert!(matches!(s.data, SeriesData::Categorical(ref v) if v.len() == 2));
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let raw = json!({
            "xAxis": {"type": "category"},
            "series": [{"type": "bar", "data": [1, 2], "itemStyle": {"color": "#8d6e63"}}]
        });
        let option: ChartOption = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(option.extra["xAxis"], json!({"type": "category"}));
        assert_eq!(option.series[0].extra["itemStyle"], json!({"color": "#8d6e63"}));
        let back = serde_json::to_value(&option).unwrap();
        assert_eq!(back["xAxis"], raw["xAxis"]);
    }

    #[test]
    fn missing_data_defaults_to_empty() {
        let s: Series = serde_json::from_value(json!({"type": "pie"})).unwrap();
        assert!(s.data.is_empty());
    }
}
