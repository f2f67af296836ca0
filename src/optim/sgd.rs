use crate::network::network::{Gradients, Network};
use crate::optim::Optimizer;

pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }
}

impl Optimizer for Sgd {
    /// Applies one SGD weight update per layer given its pre-computed gradients.
    fn step(&mut self, network: &mut Network, grads: &Gradients) {
        for (layer, (w_grad, b_grad)) in network.layers.iter_mut().zip(grads.iter()) {
            layer.apply_gradients(w_grad, b_grad, self.learning_rate);
        }
    }

    fn name(&self) -> &'static str {
        "sgd"
    }
}
