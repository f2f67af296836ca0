use crate::math::matrix::Matrix;
use crate::network::network::{Gradients, Network};
use crate::optim::Optimizer;

/// Adam with bias-corrected first and second moments.
///
/// Moment buffers are allocated lazily on the first `step`, shaped like the
/// network's gradients.
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    t: i32,
    m: Gradients,
    v: Gradients,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    fn update_moment(moment: &Matrix, grad: &Matrix, beta: f64, square: bool) -> Matrix {
        let mut out = moment.clone();
        for (row, g_row) in out.data.iter_mut().zip(grad.data.iter()) {
            for (m, &g) in row.iter_mut().zip(g_row.iter()) {
                let g = if square { g * g } else { g };
                *m = beta * *m + (1.0 - beta) * g;
            }
        }
        out
    }

    fn direction(&self, m: &Matrix, v: &Matrix) -> Matrix {
        let c1 = 1.0 - self.beta1.powi(self.t);
        let c2 = 1.0 - self.beta2.powi(self.t);
        let mut out = m.clone();
        for (row, v_row) in out.data.iter_mut().zip(v.data.iter()) {
            for (x, &vv) in row.iter_mut().zip(v_row.iter()) {
                *x = (*x / c1) / ((vv / c2).sqrt() + self.eps);
            }
        }
        out
    }
}

impl Optimizer for Adam {
    fn step(&mut self, network: &mut Network, grads: &Gradients) {
        if self.m.len() != grads.len() {
            self.m = network.zero_gradients();
            self.v = network.zero_gradients();
            self.t = 0;
        }
        self.t += 1;

        for (i, (w_grad, b_grad)) in grads.iter().enumerate() {
            self.m[i].0 = Adam::update_moment(&self.m[i].0, w_grad, self.beta1, false);
            self.m[i].1 = Adam::update_moment(&self.m[i].1, b_grad, self.beta1, false);
            self.v[i].0 = Adam::update_moment(&self.v[i].0, w_grad, self.beta2, true);
            self.v[i].1 = Adam::update_moment(&self.v[i].1, b_grad, self.beta2, true);

            let w_dir = self.direction(&self.m[i].0, &self.v[i].0);
            let b_dir = self.direction(&self.m[i].1, &self.v[i].1);
            network.layers[i].apply_gradients(&w_dir, &b_dir, self.learning_rate);
        }
    }

    fn name(&self) -> &'static str {
        "adam"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn first_step_moves_each_weight_by_learning_rate() {
        let mut net = Network::new(
            vec![(1, 2, ActivationFunction::Identity)],
            &mut StdRng::seed_from_u64(5),
        );
        let before = net.layers[0].weights.clone();
        let grads = vec![(
            Matrix::from_data(vec![vec![0.3], vec![-2.0]]),
            Matrix::row(vec![0.0]),
        )];
        let mut adam = Adam::new(0.01);
        adam.step(&mut net, &grads);
        let after = &net.layers[0].weights;
        // bias-corrected first step has magnitude ~lr regardless of gradient scale
        assert!(((before.data[0][0] - after.data[0][0]) - 0.01).abs() < 1e-6);
        assert!(((after.data[1][0] - before.data[1][0]) - 0.01).abs() < 1e-6);
    }
}
