use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{de::DeserializeOwned, Serialize, Deserialize};
use tracing::info;

use crate::data::columns::FeatureColumns;
use crate::data::scaler::Scaler;
use crate::error::{FraudError, Result};
use crate::forest::FitPredictModel;
use crate::network::network::Network;

/// `model_type` tag of every gradient-trained checkpoint.
pub const GRADIENT_MODEL_TYPE: &str = "FerriteNN";
pub const GRADIENT_EXTENSION: &str = "nn.json";
pub const FIT_PREDICT_EXTENSION: &str = "fp.json";

/// A trained model plus everything needed to reproduce its predictions.
///
/// The scaler is stored under the key `scalar` to stay readable by existing
/// model files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint<M> {
    pub model: M,
    pub threshold: f64,
    pub model_type: String,
    #[serde(rename = "scalar")]
    pub scaler: Scaler,
    /// Model family, used as the file-name stem.
    pub family: String,
    #[serde(default)]
    pub feature_columns: FeatureColumns,
    pub created_at: DateTime<Utc>,
}

pub type GradientCheckpoint = Checkpoint<Network>;
pub type FitPredictCheckpoint = Checkpoint<FitPredictModel>;

/// `<stem>_<YYYYMMDD_HHMMSS>.<ext>` inside `dir`. A numeric suffix is added
/// when a file from the same second already exists.
pub fn timestamped_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let mut path = dir.join(format!("{stem}_{timestamp}.{extension}"));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{stem}_{timestamp}_{n}.{extension}"));
        n += 1;
    }
    path
}

/// Pretty-prints `value` as JSON to `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

/// Reads a JSON document written by `write_json`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(FraudError::file_not_found(path));
    }
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

impl<M: Serialize + DeserializeOwned> Checkpoint<M> {
    pub fn new(
        model: M,
        threshold: f64,
        model_type: impl Into<String>,
        scaler: Scaler,
        family: impl Into<String>,
        feature_columns: FeatureColumns,
    ) -> Self {
        Checkpoint {
            model,
            threshold,
            model_type: model_type.into(),
            scaler,
            family: family.into(),
            feature_columns,
            created_at: Utc::now(),
        }
    }

    /// Writes `<Family>Model_<timestamp>.<extension>` into `dir` and returns
    /// the path.
    pub fn save(&self, dir: &Path, extension: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = timestamped_path(dir, &format!("{}Model", self.family), extension);
        write_json(&path, self)?;
        info!(path = %path.display(), model_type = %self.model_type, "checkpoint saved");
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::scaler::ScalerKind;

    #[test]
    fn file_name_follows_pattern() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = timestamped_path(dir.path(), "RandomForestModel", FIT_PREDICT_EXTENSION);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("RandomForestModel_"));
        assert!(name.ends_with(".fp.json"));
        // RandomForestModel_YYYYMMDD_HHMMSS.fp.json
        assert_eq!(name.len(), "RandomForestModel_".len() + 15 + ".fp.json".len());
    }

    #[test]
    fn same_second_saves_do_not_collide() {
        let dir = tempfile::TempDir::new().unwrap();
        let scaler = Scaler::fit(ScalerKind::Standard, &[vec![1.0], vec![2.0]]).unwrap();
        let ckpt = Checkpoint::new(vec![1.0_f64], 0.5, "Test", scaler, "Test", FeatureColumns::default());
        let a = ckpt.save(dir.path(), "json").unwrap();
        let b = ckpt.save(dir.path(), "json").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn scaler_is_stored_under_scalar_key() {
        let scaler = Scaler::fit(ScalerKind::MinMax, &[vec![0.0], vec![4.0]]).unwrap();
        let ckpt = Checkpoint::new(0u8, 0.7, "X", scaler, "X", FeatureColumns::default());
        let json = serde_json::to_value(&ckpt).unwrap();
        assert!(json.get("scalar").is_some());
        assert_eq!(json["threshold"], 0.7);
    }

    #[test]
    fn missing_checkpoint_is_file_not_found() {
        let err = Checkpoint::<u8>::load(Path::new("/nope/ckpt.nn.json")).unwrap_err();
        assert!(matches!(err, FraudError::FileNotFound { .. }));
    }
}
