//! Fit/predict models: a random forest classifier and an isolation forest.

pub mod decision_tree;
pub mod isolation_forest;
pub mod random_forest;

use serde::{Serialize, Deserialize};

use crate::error::{FraudError, Result};

pub use isolation_forest::{IsolationForest, IsolationForestParams};
pub use random_forest::{RandomForest, RandomForestParams};

/// Single-call fit over the whole training set, then prediction.
pub trait FitPredict {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    /// Supervised models expose a calibrated positive-class probability;
    /// unsupervised ones only a raw label.
    fn is_supervised(&self) -> bool;

    fn is_fitted(&self) -> bool;

    /// Positive-class probability per row (anomaly score for unsupervised models).
    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Raw label per row: 1 = fraud / anomalous.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<u8>>;

    /// Tag written into checkpoints and file names.
    fn model_type(&self) -> &'static str;
}

/// Width shared by every training row. Rejects zero trees and rows of differing width.
pub(crate) fn fit_width(x: &[Vec<f64>], n_estimators: usize, model: &str) -> Result<usize> {
    if n_estimators == 0 {
        return Err(FraudError::InvalidConfig(format!("{model} needs at least one tree")));
    }
    let first = x
        .first()
        .ok_or_else(|| FraudError::EmptyDataset(format!("{model} needs at least one row")))?;
    match x.iter().find(|r| r.len() != first.len()) {
        Some(bad) => Err(FraudError::DimensionMismatch { expected: first.len(), got: bad.len() }),
        None => Ok(first.len()),
    }
}

/// The fit/predict models a `FitPredictLifecycle` can own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "model")]
pub enum FitPredictModel {
    RandomForest(RandomForest),
    IsolationForest(IsolationForest),
}

impl FitPredictModel {
    fn inner(&self) -> &dyn FitPredict {
        match self {
            FitPredictModel::RandomForest(m) => m,
            FitPredictModel::IsolationForest(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn FitPredict {
        match self {
            FitPredictModel::RandomForest(m) => m,
            FitPredictModel::IsolationForest(m) => m,
        }
    }
}

impl FitPredict for FitPredictModel {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn is_supervised(&self) -> bool {
        self.inner().is_supervised()
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.inner().predict_proba(x)
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<u8>> {
        self.inner().predict(x)
    }

    fn model_type(&self) -> &'static str {
        self.inner().model_type()
    }
}

impl From<RandomForest> for FitPredictModel {
    fn from(m: RandomForest) -> Self {
        FitPredictModel::RandomForest(m)
    }
}

impl From<IsolationForest> for FitPredictModel {
    fn from(m: IsolationForest) -> Self {
        FitPredictModel::IsolationForest(m)
    }
}
