use std::path::Path;

use serde::{Serialize, Deserialize};
use tracing::info;

use crate::data::columns::{column_index, parse_cell};
use crate::data::reader::open_csv;
use crate::error::Result;

/// One raw transaction as needed for merchant-day aggregation.
///
/// `features` holds the unscaled supervised-model features for this row (in
/// the supervised checkpoint's column order); it is empty when no supervised
/// model is involved.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransaction {
    pub entity: String,
    pub day: String,
    pub amount: f64,
    pub features: Vec<f64>,
}

impl RawTransaction {
    pub fn new(entity: impl Into<String>, day: impl Into<String>, amount: f64) -> Self {
        RawTransaction { entity: entity.into(), day: day.into(), amount, features: Vec::new() }
    }
}

/// Column names for the entity key, the calendar day and the amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawColumns {
    pub entity: String,
    pub day: String,
    pub amount: String,
}

impl Default for RawColumns {
    fn default() -> Self {
        RawColumns {
            entity: "cc_num".to_string(),
            day: "date".to_string(),
            amount: "amt".to_string(),
        }
    }
}

/// Reads every row of `path` as a `RawTransaction`, also extracting
/// `feature_columns` for the supervised model.
pub fn read_raw_transactions(
    path: &Path,
    columns: &RawColumns,
    feature_columns: &[String],
) -> Result<Vec<RawTransaction>> {
    let mut rdr = open_csv(path)?;
    let headers = rdr.headers()?.clone();
    let entity_idx = column_index(&headers, &columns.entity)?;
    let day_idx = column_index(&headers, &columns.day)?;
    let amount_idx = column_index(&headers, &columns.amount)?;
    let feature_idx = feature_columns.iter()
        .map(|name| column_index(&headers, name))
        .collect::<Result<Vec<usize>>>()?;

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let features = feature_idx.iter().zip(feature_columns.iter())
            .map(|(&idx, name)| parse_cell(&record, idx, row, name))
            .collect::<Result<Vec<f64>>>()?;
        rows.push(RawTransaction {
            entity: record.get(entity_idx).unwrap_or("").trim().to_string(),
            day: record.get(day_idx).unwrap_or("").trim().to_string(),
            amount: parse_cell(&record, amount_idx, row, &columns.amount)?,
            features,
        });
    }

    info!(path = %path.display(), rows = rows.len(), "raw transactions loaded");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn entity_is_kept_as_text() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("raw.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"cc_num,amt,lat,date\n4613314721966,12.5,40.0,01062025\n").unwrap();

        let rows = read_raw_transactions(&path, &RawColumns::default(), &["lat".to_string()]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity, "4613314721966");
        assert_eq!(rows[0].day, "01062025");
        assert_eq!(rows[0].amount, 12.5);
        assert_eq!(rows[0].features, vec![40.0]);
    }
}
