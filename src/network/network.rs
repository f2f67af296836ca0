use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{activation::activation::ActivationFunction, layers::dense::Layer, math::matrix::Matrix};

/// Per-layer `(weights_grad, biases_grad)` pairs, indexed like `Network::layers`.
pub type Gradients = Vec<(Matrix, Matrix)>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Layer>,
}

impl Network {
    /// Builds a network from (size, input_size, activation) tuples.
    pub fn new<R: Rng + ?Sized>(
        layer_specs: Vec<(usize, usize, ActivationFunction)>,
        rng: &mut R,
    ) -> Network {
        let layers = layer_specs.into_iter()
            .map(|(size, input_size, activation)| Layer::new(size, input_size, activation, rng))
            .collect();
        Network { layers }
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_size())
    }

    /// Forward pass; stores activations in each layer for backprop.
    pub fn forward(&mut self, input: Vec<f64>) -> Vec<f64> {
        let mut current = input;
        for layer in &mut self.layers {
            current = layer.feed_from(current);
        }
        current
    }

    /// Forward pass without touching the layer caches, so `&self` can be
    /// shared across evaluation threads.
    pub fn infer(&self, input: &[f64]) -> Vec<f64> {
        let mut current = input.to_vec();
        for layer in &self.layers {
            current = layer.infer(&current);
        }
        current
    }

    /// Backward pass for the sample most recently passed to `forward`.
    ///
    /// `output_delta` is dL/da of the output layer.
    pub fn backward(&self, input: &[f64], output_delta: Vec<f64>) -> Gradients {
        let mut grads: Gradients = Vec::with_capacity(self.layers.len());
        let mut delta = Matrix::row(output_delta);

        for i in (0..self.layers.len()).rev() {
            let input_for_layer = if i == 0 {
                Matrix::row(input.to_vec())
            } else {
                self.layers[i - 1].neurons.clone()
            };

            let (w_grad, b_grad) = self.layers[i].compute_gradients(&delta, &input_for_layer);

            if i > 0 {
                // Propagate delta_i through weights to get dL/da_{i-1}
                delta = &b_grad * &self.layers[i].weights.transpose();
            }

            grads.push((w_grad, b_grad));
        }

        grads.reverse();
        grads
    }

    /// Zero-filled gradient storage shaped like this network.
    pub fn zero_gradients(&self) -> Gradients {
        self.layers.iter()
            .map(|layer| (
                Matrix::zeros(layer.weights.rows, layer.weights.cols),
                Matrix::zeros(layer.biases.rows, layer.biases.cols),
            ))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn tiny() -> Network {
        Network::new(
            vec![
                (4, 3, ActivationFunction::ReLU),
                (1, 4, ActivationFunction::Identity),
            ],
            &mut StdRng::seed_from_u64(11),
        )
    }

    #[test]
    fn gradients_have_layer_shapes() {
        let mut net = tiny();
        let input = vec![0.5, -0.2, 1.0];
        net.forward(input.clone());
        let grads = net.backward(&input, vec![1.0]);
        assert_eq!(grads.len(), 2);
        assert_eq!((grads[0].0.rows, grads[0].0.cols), (3, 4));
        assert_eq!((grads[1].0.rows, grads[1].0.cols), (4, 1));
        assert_eq!((grads[1].1.rows, grads[1].1.cols), (1, 1));
    }

    #[test]
    fn serde_round_trip_preserves_outputs() {
        let net = tiny();
        let json = serde_json::to_string(&net).unwrap();
        let back: Network = serde_json::from_str(&json).unwrap();
        let x = [0.1, 0.2, 0.3];
        for (a, b) in net.infer(&x).iter().zip(back.infer(&x)) {
            assert!((a - b).abs() < 1e-12);
        }
        assert_eq!(back.input_size(), 3);
    }
}
