use std::path::Path;

use tracing::info;

use crate::activation::sigmoid;
use crate::data::columns::FeatureColumns;
use crate::error::{FraudError, Result};
use crate::forest::FitPredict;
use crate::train::checkpoint::{read_json, FitPredictCheckpoint, GradientCheckpoint, GRADIENT_EXTENSION};

/// A supervised checkpoint used to enrich merchant-day vectors with
/// per-transaction fraud probabilities.
#[derive(Debug, Clone)]
pub enum FraudModel {
    Gradient(GradientCheckpoint),
    FitPredict(FitPredictCheckpoint),
}

impl FraudModel {
    /// Loads a checkpoint, choosing the kind by extension (`.nn.json` is a
    /// gradient network, anything else a fit/predict model).
    pub fn load(path: &Path) -> Result<FraudModel> {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let model = if name.ends_with(&format!(".{GRADIENT_EXTENSION}")) {
            FraudModel::Gradient(read_json(path)?)
        } else {
            let ckpt: FitPredictCheckpoint = read_json(path)?;
            if !ckpt.model.is_supervised() {
                return Err(FraudError::InvalidConfig(format!(
                    "{} holds an unsupervised {} model",
                    path.display(),
                    ckpt.model_type
                )));
            }
            FraudModel::FitPredict(ckpt)
        };
        info!(path = %path.display(), model_type = model.model_type(), "fraud model loaded");
        Ok(model)
    }

    pub fn model_type(&self) -> &str {
        match self {
            FraudModel::Gradient(c) => &c.model_type,
            FraudModel::FitPredict(c) => &c.model_type,
        }
    }

    /// Columns the raw rows must provide, in model order.
    pub fn feature_columns(&self) -> &FeatureColumns {
        match self {
            FraudModel::Gradient(c) => &c.feature_columns,
            FraudModel::FitPredict(c) => &c.feature_columns,
        }
    }

    /// Fraud probability per unscaled row; the checkpoint's own scaler is
    /// applied first.
    pub fn fraud_probabilities(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        match self {
            FraudModel::Gradient(c) => {
                let scaled = c.scaler.transform_all(rows)?;
                Ok(scaled.iter()
                    .map(|r| c.model.infer(r).first().copied().map_or(0.0, sigmoid))
                    .collect())
            }
            FraudModel::FitPredict(c) => {
                let scaled = c.scaler.transform_all(rows)?;
                c.model.predict_proba(&scaled)
            }
        }
    }
}

impl From<GradientCheckpoint> for FraudModel {
    fn from(c: GradientCheckpoint) -> Self {
        FraudModel::Gradient(c)
    }
}

impl From<FitPredictCheckpoint> for FraudModel {
    fn from(c: FitPredictCheckpoint) -> Self {
        FraudModel::FitPredict(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::data::scaler::{Scaler, ScalerKind};
    use crate::forest::{IsolationForest, FitPredictModel};
    use crate::network::network::Network;
    use crate::train::checkpoint::{FIT_PREDICT_EXTENSION, GRADIENT_MODEL_TYPE};
    use rand::{rngs::StdRng, SeedableRng};

    fn scaler() -> Scaler {
        Scaler::fit(ScalerKind::Standard, &[vec![0.0], vec![10.0]]).unwrap()
    }

    #[test]
    fn gradient_checkpoint_yields_probabilities() {
        let dir = tempfile::TempDir::new().unwrap();
        let net = Network::new(vec![(1, 1, ActivationFunction::Identity)], &mut StdRng::seed_from_u64(1));
        let ckpt = GradientCheckpoint::new(net, 0.5, GRADIENT_MODEL_TYPE, scaler(), "LogisticRegression", FeatureColumns::default());
        let path = ckpt.save(dir.path(), GRADIENT_EXTENSION).unwrap();

        let model = FraudModel::load(&path).unwrap();
        assert_eq!(model.model_type(), GRADIENT_MODEL_TYPE);
        let probs = model.fraud_probabilities(&[vec![1.0], vec![9.0]]).unwrap();
        assert_eq!(probs.len(), 2);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn unsupervised_checkpoint_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let model = FitPredictModel::from(IsolationForest::default());
        let ckpt = FitPredictCheckpoint::new(model, 0.5, "IsolationForest", scaler(), "IsolationForest", FeatureColumns::default());
        let path = ckpt.save(dir.path(), FIT_PREDICT_EXTENSION).unwrap();
        assert!(matches!(FraudModel::load(&path), Err(FraudError::InvalidConfig(_))));
    }
}
