use std::path::Path;

use rand::Rng;
use tracing::{debug, info};

use crate::data::columns::{column_index, parse_cell, FeatureColumns};
use crate::data::sampling::undersample_indices;
use crate::data::scaler::{Scaler, ScalerKind};
use crate::error::{FraudError, Result};

/// Unscaled feature rows and binary targets as read from a CSV file.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.targets.iter().filter(|&&t| t >= 0.5).count()
    }
}

/// Opens a CSV reader, mapping a missing path to `FileNotFound`.
pub fn open_csv(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    if !path.exists() {
        return Err(FraudError::file_not_found(path));
    }
    Ok(csv::ReaderBuilder::new().flexible(true).from_path(path)?)
}

/// Reads the feature columns and the target column of `path`.
///
/// Targets are coerced to 0.0 / 1.0 (anything >= 0.5 is positive).
pub fn read_table(path: &Path, columns: &FeatureColumns) -> Result<Table> {
    let mut rdr = open_csv(path)?;
    let headers = rdr.headers()?.clone();
    let feature_idx = columns.feature_indices(&headers)?;
    let target_idx = column_index(&headers, &columns.target)?;

    let mut table = Table::default();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let features = feature_idx.iter().zip(columns.features.iter())
            .map(|(&idx, name)| parse_cell(&record, idx, row, name))
            .collect::<Result<Vec<f64>>>()?;
        let target = parse_cell(&record, target_idx, row, &columns.target)?;
        table.features.push(features);
        table.targets.push(if target >= 0.5 { 1.0 } else { 0.0 });
    }

    if table.is_empty() {
        return Err(FraudError::EmptyDataset(format!("{} has no data rows", path.display())));
    }
    debug!(path = %path.display(), rows = table.len(), positives = table.positives(), "CSV table read");
    Ok(table)
}

/// How to turn a `Table` into a model-ready `Dataset`.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Majority:minority ratio to undersample to; `None` keeps every row.
    pub undersample: Option<f64>,
    /// Pre-fitted scaler to reuse. When `None` a new one of `scaler_kind` is fit.
    pub scaler: Option<Scaler>,
    pub scaler_kind: ScalerKind,
}

impl ReadOptions {
    /// Training-set options: undersample and fit a fresh scaler.
    pub fn training(ratio: f64, scaler_kind: ScalerKind) -> Self {
        ReadOptions { undersample: Some(ratio), scaler: None, scaler_kind }
    }

    /// Test-set options: every row, transformed with the training scaler.
    pub fn with_scaler(scaler: Scaler) -> Self {
        let scaler_kind = scaler.kind();
        ReadOptions { undersample: None, scaler: Some(scaler), scaler_kind }
    }
}

/// Scaled feature matrix, targets and the scaler that produced them.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub target: Vec<f64>,
    scaler: Scaler,
}

impl Dataset {
    /// Reads `path` and builds a dataset from it.
    pub fn read<R: Rng + ?Sized>(
        path: &Path,
        columns: &FeatureColumns,
        options: ReadOptions,
        rng: &mut R,
    ) -> Result<Dataset> {
        let table = read_table(path, columns)?;
        let dataset = Dataset::from_table(&table, options, rng)?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            positives = dataset.positives(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Builds a dataset from an in-memory table. The scaler is fit on the
    /// undersampled rows only when no scaler is supplied.
    pub fn from_table<R: Rng + ?Sized>(table: &Table, options: ReadOptions, rng: &mut R) -> Result<Dataset> {
        let (features, target): (Vec<Vec<f64>>, Vec<f64>) = match options.undersample {
            Some(ratio) => undersample_indices(&table.targets, ratio, rng)
                .into_iter()
                .map(|i| (table.features[i].clone(), table.targets[i]))
                .unzip(),
            None => (table.features.clone(), table.targets.clone()),
        };

        let scaler = match options.scaler {
            Some(scaler) => scaler,
            None => Scaler::fit(options.scaler_kind, &features)?,
        };
        let features = scaler.transform_all(&features)?;

        Ok(Dataset { features, target, scaler })
    }

    /// The fitted (or passed-through) scaler.
    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.scaler.n_features()
    }

    pub fn positives(&self) -> usize {
        self.target.iter().filter(|&&t| t >= 0.5).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    fn columns() -> FeatureColumns {
        FeatureColumns::new(vec!["amt".into(), "lat".into()], "is_fraud")
    }

    #[test]
    fn reads_selected_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "t.csv", "id,amt,lat,is_fraud\n1,10.0,40.1,0\n2,20.0,41.0,1\n");
        let table = read_table(&path, &columns()).unwrap();
        assert_eq!(table.features, vec![vec![10.0, 40.1], vec![20.0, 41.0]]);
        assert_eq!(table.targets, vec![0.0, 1.0]);
    }

    #[test]
    fn missing_file_names_path() {
        let err = read_table(Path::new("/no/such/fraud.csv"), &columns()).unwrap_err();
        match err {
            FraudError::FileNotFound { path, .. } => assert!(path.ends_with("fraud.csv")),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_set_reuses_training_scaler() {
        let dir = TempDir::new().unwrap();
        let train = write_csv(&dir, "train.csv", "amt,lat,is_fraud\n1,5,0\n2,6,0\n3,7,1\n4,8,1\n");
        let test = write_csv(&dir, "test.csv", "amt,lat,is_fraud\n100,500,0\n200,600,1\n");
        let mut rng = StdRng::seed_from_u64(0);

        let train_ds = Dataset::read(&train, &columns(), ReadOptions::training(1.0, ScalerKind::Standard), &mut rng).unwrap();
        let fitted = train_ds.scaler().clone();
        let test_ds = Dataset::read(&test, &columns(), ReadOptions::with_scaler(fitted.clone()), &mut rng).unwrap();

        assert_eq!(test_ds.scaler(), &fitted);
        assert_eq!(test_ds.features[0], fitted.transform(&[100.0, 500.0]).unwrap());
    }
}
