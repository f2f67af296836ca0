use rand::Rng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::error::{FraudError, Result};
use crate::loss::bce_logits::BceWithLogitsLoss;
use crate::network::network::Network;
use crate::optim::Optimizer;

/// Runs one full epoch of mini-batch gradient descent over the training data.
/// Returns the mean of the per-batch mean losses.
///
/// # Panics
/// Panics if `inputs` and `labels` lengths differ or `batch_size == 0`.
pub fn run_one_epoch<R: Rng + ?Sized>(
    network: &mut Network,
    inputs: &[Vec<f64>],
    labels: &[f64],
    optimizer: &mut dyn Optimizer,
    loss: &BceWithLogitsLoss,
    batch_size: usize,
    rng: &mut R,
) -> f64 {
    assert_eq!(inputs.len(), labels.len(), "inputs and labels must have equal length");
    assert!(batch_size > 0, "batch_size must be at least 1");

    let n = inputs.len();
    if n == 0 {
        return 0.0;
    }

    // Shuffle sample order each epoch.
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);

    let mut running_loss = 0.0;
    let mut n_batches = 0usize;

    for batch in indices.chunks(batch_size) {
        let inv_batch = 1.0 / batch.len() as f64;
        let mut acc_grads = network.zero_gradients();
        let mut batch_loss = 0.0;

        // Accumulate gradients over the mini-batch.
        for &idx in batch {
            let input = &inputs[idx];
            let expected = [labels[idx]];

            let output = network.forward(input.clone());
            batch_loss += loss.loss(&output, &expected);

            let delta = loss.derivative(&output, &expected);
            let grads = network.backward(input, delta);

            for ((w_acc, b_acc), (w_grad, b_grad)) in acc_grads.iter_mut().zip(grads) {
                *w_acc = w_acc.clone() + w_grad;
                *b_acc = b_acc.clone() + b_grad;
            }
        }

        // Average and apply.
        let averaged: Vec<_> = acc_grads.into_iter()
            .map(|(w, b)| (w.map(|x| x * inv_batch), b.map(|x| x * inv_batch)))
            .collect();
        optimizer.step(network, &averaged);

        running_loss += batch_loss * inv_batch;
        n_batches += 1;
    }

    running_loss / n_batches as f64
}

/// Raw network outputs (logits) for every row, computed on `pool` when one
/// is given. Rows must match the network's input width.
pub fn predict_scores(network: &Network, inputs: &[Vec<f64>], pool: Option<&ThreadPool>) -> Result<Vec<f64>> {
    let width = network.input_size();
    if let Some(bad) = inputs.iter().find(|r| r.len() != width) {
        return Err(FraudError::DimensionMismatch { expected: width, got: bad.len() });
    }
    let score = |row: &Vec<f64>| network.infer(row).first().copied().unwrap_or(0.0);

    Ok(match pool {
        Some(pool) => pool.install(|| inputs.par_iter().map(score).collect::<Vec<f64>>()),
        None => inputs.iter().map(score).collect::<Vec<f64>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFunction;
    use crate::optim::Sgd;
    use rand::{rngs::StdRng, SeedableRng};

    fn separable() -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let v = (i as f64 - 20.0) / 10.0;
            x.push(vec![v, -v * 0.5]);
            y.push(if v > 0.0 { 1.0 } else { 0.0 });
        }
        (x, y)
    }

    #[test]
    fn loss_decreases_over_epochs() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut net = Network::new(vec![(1, 2, ActivationFunction::Identity)], &mut rng);
        let mut sgd = Sgd::new(0.5);
        let loss = BceWithLogitsLoss::default();
        let (x, y) = separable();

        let first = run_one_epoch(&mut net, &x, &y, &mut sgd, &loss, 8, &mut rng);
        let mut last = first;
        for _ in 0..30 {
            last = run_one_epoch(&mut net, &x, &y, &mut sgd, &loss, 8, &mut rng);
        }
        assert!(last < first, "first {first}, last {last}");
    }

    #[test]
    fn threaded_scores_match_sequential() {
        let mut rng = StdRng::seed_from_u64(8);
        let net = Network::new(
            vec![(4, 2, ActivationFunction::ReLU), (1, 4, ActivationFunction::Identity)],
            &mut rng,
        );
        let (x, _) = separable();
        let pool = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();
        let pooled = predict_scores(&net, &x, Some(&pool)).unwrap();
        assert_eq!(pooled.len(), x.len());
        assert_eq!(predict_scores(&net, &x, None).unwrap(), pooled);
    }

    #[test]
    fn short_row_is_rejected_on_every_path() {
        let mut rng = StdRng::seed_from_u64(8);
        let net = Network::new(vec![(1, 2, ActivationFunction::Identity)], &mut rng);
        let (mut x, _) = separable();
        x[25] = vec![1.0, 2.0, 3.0];
        let pool = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();
        for pool in [None, Some(&pool)] {
            assert!(matches!(
                predict_scores(&net, &x, pool),
                Err(FraudError::DimensionMismatch { expected: 2, got: 3 })
            ));
        }
    }
}
