use std::path::PathBuf;

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Serialize, Deserialize};

use crate::data::columns::FeatureColumns;
use crate::data::scaler::ScalerKind;
use crate::error::{FraudError, Result};

/// Where numeric work runs. Resolved once when a lifecycle is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    /// Everything on the calling thread.
    #[default]
    Cpu,
    /// Evaluation runs on a rayon pool of this many threads; `0` means one
    /// per available core. Training updates stay sequential.
    Threads(usize),
}

impl Device {
    /// Builds the evaluation pool, or `None` when everything stays on the
    /// calling thread.
    pub fn pool(self) -> Result<Option<ThreadPool>> {
        match self {
            Device::Cpu => Ok(None),
            Device::Threads(n) => Ok(Some(ThreadPoolBuilder::new().num_threads(n).build()?)),
        }
    }
}

/// Configuration shared by both lifecycles. Immutable once a lifecycle owns it.
///
/// # Fields
/// - `train_file` / `test_file`: CSV paths
/// - `batch_size`: samples per mini-batch (gradient lifecycle only)
/// - `threshold`: probability at or above which a sample is fraud
/// - `output_dir`: directory checkpoints are written to
/// - `undersample_ratio`: majority:minority ratio for the training set
/// - `resample_each_epoch`: draw a fresh undersampled training set before
///   every epoch after the first
/// - `seed`: fixes shuffling, sampling and init when set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub train_file: PathBuf,
    pub test_file: PathBuf,
    pub batch_size: usize,
    pub threshold: f64,
    pub output_dir: PathBuf,
    pub columns: FeatureColumns,
    pub scaler_kind: ScalerKind,
    pub undersample_ratio: f64,
    pub resample_each_epoch: bool,
    pub seed: Option<u64>,
    pub device: Device,
}

impl TrainingConfig {
    /// Defaults: batch 64, threshold 0.5, balanced undersampling redrawn every
    /// epoch, standard scaling, CPU, checkpoints in the working directory.
    pub fn new(train_file: impl Into<PathBuf>, test_file: impl Into<PathBuf>) -> Self {
        TrainingConfig {
            train_file: train_file.into(),
            test_file: test_file.into(),
            batch_size: 64,
            threshold: 0.5,
            output_dir: PathBuf::from("."),
            columns: FeatureColumns::default(),
            scaler_kind: ScalerKind::Standard,
            undersample_ratio: 1.0,
            resample_each_epoch: true,
            seed: None,
            device: Device::Cpu,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_columns(mut self, columns: FeatureColumns) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_scaler_kind(mut self, kind: ScalerKind) -> Self {
        self.scaler_kind = kind;
        self
    }

    pub fn with_undersample_ratio(mut self, ratio: f64) -> Self {
        self.undersample_ratio = ratio;
        self
    }

    pub fn with_resample_each_epoch(mut self, resample: bool) -> Self {
        self.resample_each_epoch = resample;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(FraudError::InvalidConfig("batch_size must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(FraudError::InvalidConfig(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        if self.undersample_ratio < 1.0 {
            return Err(FraudError::InvalidConfig(format!(
                "undersample ratio must be >= 1, got {}",
                self.undersample_ratio
            )));
        }
        if self.columns.is_empty() {
            return Err(FraudError::InvalidConfig("at least one feature column is required".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = TrainingConfig::new("train.csv", "test.csv");
        assert_eq!(cfg.batch_size, 64);
        assert_eq!(cfg.threshold, 0.5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let cfg = TrainingConfig::new("a", "b").with_threshold(1.5);
        assert!(matches!(cfg.validate(), Err(FraudError::InvalidConfig(_))));
    }

    #[test]
    fn zero_threads_means_one_per_core() {
        assert!(Device::Cpu.pool().unwrap().is_none());
        assert_eq!(Device::Threads(3).pool().unwrap().unwrap().current_num_threads(), 3);
        assert!(Device::Threads(0).pool().unwrap().unwrap().current_num_threads() >= 1);
    }
}
