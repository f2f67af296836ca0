use std::path::Path;

use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{FraudError, Result};
use crate::loss::bce_logits::BceWithLogitsLoss;
use crate::network::network::Network;
use crate::optim::{Optimizer, OptimizerKind};
use crate::train::checkpoint::read_json;

/// Training hyperparameters for the gradient families.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparams {
    pub epochs: usize,
    /// Hidden layer widths for `FeedForward`; ignored by `LogisticRegression`.
    pub hidden: Vec<usize>,
    pub optimizer: OptimizerKind,
    /// Weight of the positive (fraud) term in the loss.
    pub pos_weight: f64,
    /// Applied after every hidden layer of `FeedForward`.
    pub activation: ActivationFunction,
}

impl Default for Hyperparams {
    fn default() -> Self {
        Hyperparams {
            epochs: 10,
            hidden: vec![32, 16],
            optimizer: OptimizerKind::Adam { learning_rate: 1e-3 },
            pos_weight: 1.0,
            activation: ActivationFunction::ReLU,
        }
    }
}

impl Hyperparams {
    /// Deserializes hyperparameters from a JSON file.
    pub fn load_json(path: &Path) -> Result<Hyperparams> {
        read_json(path)
    }
}

/// What `ModelFamily::initialize` hands to the gradient lifecycle.
pub struct GradientComponents {
    pub network: Network,
    pub loss: BceWithLogitsLoss,
    pub optimizer: Box<dyn Optimizer>,
    pub epochs: usize,
}

/// A gradient-trained model family. `initialize` is the one extension point:
/// it chooses the network, loss, optimizer and epoch count.
pub trait ModelFamily {
    /// Name used for checkpoint file stems, e.g. `NeuralNetwork`.
    fn family_name(&self) -> &str;

    fn initialize(&self, n_features: usize, rng: &mut StdRng) -> Result<GradientComponents>;

    /// One plot title per epoch.
    fn titles(&self, epochs: usize) -> Vec<String> {
        (1..=epochs)
            .map(|e| format!("{} - Epoch {e}", self.family_name()))
            .collect()
    }
}

fn check_common(hp: &Hyperparams, n_features: usize) -> Result<()> {
    if n_features == 0 {
        return Err(FraudError::InvalidConfig("network needs at least one input feature".into()));
    }
    if hp.epochs == 0 {
        return Err(FraudError::InvalidConfig("epochs must be at least 1".into()));
    }
    if hp.optimizer.learning_rate() <= 0.0 {
        return Err(FraudError::InvalidConfig("learning rate must be positive".into()));
    }
    Ok(())
}

/// Single linear layer producing a logit.
#[derive(Debug, Clone, Default)]
pub struct LogisticRegression {
    pub hyperparams: Hyperparams,
}

impl LogisticRegression {
    pub fn new(hyperparams: Hyperparams) -> Self {
        LogisticRegression { hyperparams }
    }
}

impl ModelFamily for LogisticRegression {
    fn family_name(&self) -> &str {
        "LogisticRegression"
    }

    fn initialize(&self, n_features: usize, rng: &mut StdRng) -> Result<GradientComponents> {
        let hp = &self.hyperparams;
        check_common(hp, n_features)?;
        Ok(GradientComponents {
            network: Network::new(vec![(1, n_features, ActivationFunction::Identity)], rng),
            loss: BceWithLogitsLoss::new(hp.pos_weight),
            optimizer: hp.optimizer.build(),
            epochs: hp.epochs,
        })
    }
}

/// Hidden layers (ReLU unless configured) followed by a single identity output (the logit).
#[derive(Debug, Clone, Default)]
pub struct FeedForward {
    pub hyperparams: Hyperparams,
}

impl FeedForward {
    pub fn new(hyperparams: Hyperparams) -> Self {
        FeedForward { hyperparams }
    }
}

impl ModelFamily for FeedForward {
    fn family_name(&self) -> &str {
        "NeuralNetwork"
    }

    fn initialize(&self, n_features: usize, rng: &mut StdRng) -> Result<GradientComponents> {
        let hp = &self.hyperparams;
        check_common(hp, n_features)?;
        if hp.hidden.iter().any(|&w| w == 0) {
            return Err(FraudError::InvalidConfig("hidden layer widths must be positive".into()));
        }

        let mut specs = Vec::with_capacity(hp.hidden.len() + 1);
        let mut fan_in = n_features;
        for &width in &hp.hidden {
            specs.push((width, fan_in, hp.activation.clone()));
            fan_in = width;
        }
        specs.push((1, fan_in, ActivationFunction::Identity));

        Ok(GradientComponents {
            network: Network::new(specs, rng),
            loss: BceWithLogitsLoss::new(hp.pos_weight),
            optimizer: hp.optimizer.build(),
            epochs: hp.epochs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn feed_forward_layers_chain() {
        let family = FeedForward::new(Hyperparams { hidden: vec![8, 4], ..Default::default() });
        let parts = family.initialize(5, &mut StdRng::seed_from_u64(0)).unwrap();
        let shapes: Vec<(usize, usize)> = parts.network.layers.iter()
            .map(|l| (l.weights.rows, l.weights.cols))
            .collect();
        assert_eq!(shapes, vec![(5, 8), (8, 4), (4, 1)]);
        assert_eq!(parts.epochs, 10);
    }

    #[test]
    fn hidden_activation_is_configurable() {
        let hp: Hyperparams =
            serde_json::from_str(r#"{"hidden": [3, 2], "activation": {"LeakyReLU": {"alpha": 0.1}}}"#).unwrap();
        let parts = FeedForward::new(hp).initialize(4, &mut StdRng::seed_from_u64(0)).unwrap();
        let activators: Vec<_> = parts.network.layers.iter().map(|l| l.activator.clone()).collect();
        assert_eq!(
            activators,
            vec![
                ActivationFunction::LeakyReLU { alpha: 0.1 },
                ActivationFunction::LeakyReLU { alpha: 0.1 },
                ActivationFunction::Identity,
            ]
        );
        assert_eq!(FeedForward::default().hyperparams.activation, ActivationFunction::ReLU);
    }

    #[test]
    fn logistic_is_one_layer() {
        let parts = LogisticRegression::default().initialize(3, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(parts.network.layers.len(), 1);
        assert_eq!(parts.optimizer.name(), "adam");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let hp: Hyperparams = serde_json::from_str(r#"{"epochs": 3}"#).unwrap();
        assert_eq!(hp.epochs, 3);
        assert_eq!(hp.hidden, vec![32, 16]);
        let hp: Hyperparams =
            serde_json::from_str(r#"{"optimizer": {"kind": "sgd", "learning_rate": 0.1}}"#).unwrap();
        assert_eq!(hp.optimizer, OptimizerKind::Sgd { learning_rate: 0.1 });
    }

    #[test]
    fn titles_cover_every_epoch() {
        let titles = FeedForward::default().titles(3);
        assert_eq!(titles.len(), 3);
        assert_eq!(titles[2], "NeuralNetwork - Epoch 3");
    }

    #[test]
    fn zero_epochs_is_rejected() {
        let family = LogisticRegression::new(Hyperparams { epochs: 0, ..Default::default() });
        assert!(family.initialize(2, &mut StdRng::seed_from_u64(0)).is_err());
    }
}
