use std::path::PathBuf;

use serde::{Serialize, Deserialize};

use crate::metrics::confusion::ConfusionMatrix;

/// Per-epoch record produced by `GradientLifecycle::run_epochs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Mean loss over the epoch's mini-batches.
    pub train_loss: f64,
    /// Rows in the (undersampled) training set used this epoch.
    pub train_rows: usize,
    /// Test-set confusion matrix after this epoch.
    pub confusion: ConfusionMatrix,
    pub accuracy: f64,
    /// Checkpoint written at the end of this epoch.
    pub checkpoint: PathBuf,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}
