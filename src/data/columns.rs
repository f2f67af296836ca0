use serde::{Serialize, Deserialize};

use crate::error::{FraudError, Result};

/// Which CSV columns feed the model, and which one holds the label.
///
/// Stored inside every checkpoint so scoring code extracts exactly the
/// features the model was trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureColumns {
    pub features: Vec<String>,
    pub target: String,
}

impl Default for FeatureColumns {
    fn default() -> Self {
        FeatureColumns {
            features: ["amt", "lat", "long", "city_pop", "unix_time", "merch_lat", "merch_long"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            target: "is_fraud".to_string(),
        }
    }
}

impl FeatureColumns {
    pub fn new(features: Vec<String>, target: impl Into<String>) -> Self {
        FeatureColumns { features, target: target.into() }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Header positions of the feature columns, in declaration order.
    pub fn feature_indices(&self, headers: &csv::StringRecord) -> Result<Vec<usize>> {
        self.features.iter().map(|name| column_index(headers, name)).collect()
    }
}

pub fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers.iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| FraudError::MissingColumn(name.to_string()))
}

/// Parses one numeric cell; `row` is 1-based for error messages.
pub fn parse_cell(record: &csv::StringRecord, idx: usize, row: usize, column: &str) -> Result<f64> {
    let raw = record.get(idx).unwrap_or("").trim();
    raw.parse::<f64>().map_err(|_| FraudError::InvalidValue {
        row,
        column: column.to_string(),
        value: raw.to_string(),
    })
}
