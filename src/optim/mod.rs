pub mod adam;
pub mod sgd;

use serde::{Serialize, Deserialize};

use crate::network::network::{Gradients, Network};

pub use adam::Adam;
pub use sgd::Sgd;

/// Applies averaged mini-batch gradients to a network in place.
pub trait Optimizer {
    fn step(&mut self, network: &mut Network, grads: &Gradients);

    fn name(&self) -> &'static str;
}

/// Serializable optimizer choice carried in `Hyperparams`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerKind {
    Sgd { learning_rate: f64 },
    Adam { learning_rate: f64 },
}

impl OptimizerKind {
    pub fn build(self) -> Box<dyn Optimizer> {
        match self {
            OptimizerKind::Sgd { learning_rate } => Box::new(Sgd::new(learning_rate)),
            OptimizerKind::Adam { learning_rate } => Box::new(Adam::new(learning_rate)),
        }
    }

    pub fn learning_rate(&self) -> f64 {
        match *self {
            OptimizerKind::Sgd { learning_rate } | OptimizerKind::Adam { learning_rate } => learning_rate,
        }
    }
}
