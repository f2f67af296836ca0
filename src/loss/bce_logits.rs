use serde::{Serialize, Deserialize};

use crate::activation::sigmoid;

/// Binary cross-entropy computed on raw scores (logits).
///
/// `pos_weight` scales the positive-label term, the usual lever for
/// imbalanced fraud data. `1.0` gives plain BCE.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BceWithLogitsLoss {
    pub pos_weight: f64,
}

impl Default for BceWithLogitsLoss {
    fn default() -> Self {
        BceWithLogitsLoss { pos_weight: 1.0 }
    }
}

impl BceWithLogitsLoss {
    pub fn new(pos_weight: f64) -> Self {
        BceWithLogitsLoss { pos_weight }
    }

    /// Scalar loss: mean over outputs of
    ///   pw·y·softplus(-z) + (1-y)·softplus(z)
    pub fn loss(&self, logits: &[f64], expected: &[f64]) -> f64 {
        let n = logits.len().max(1) as f64;
        logits.iter().zip(expected.iter())
            .map(|(&z, &y)| self.pos_weight * y * softplus(-z) + (1.0 - y) * softplus(z))
            .sum::<f64>() / n
    }

    /// Per-output gradient w.r.t. the logit:
    ///   pw·y·(σ(z) - 1) + (1-y)·σ(z)
    pub fn derivative(&self, logits: &[f64], expected: &[f64]) -> Vec<f64> {
        let n = logits.len().max(1) as f64;
        logits.iter().zip(expected.iter())
            .map(|(&z, &y)| {
                let p = sigmoid(z);
                (self.pos_weight * y * (p - 1.0) + (1.0 - y) * p) / n
            })
            .collect()
    }
}

/// ln(1 + e^x) without overflow.
fn softplus(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_at_zero_logit_is_ln2() {
        let l = BceWithLogitsLoss::default();
        assert!((l.loss(&[0.0], &[1.0]) - 2f64.ln()).abs() < 1e-12);
        assert!((l.loss(&[0.0], &[0.0]) - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn unit_weight_derivative_is_sigmoid_minus_label() {
        let l = BceWithLogitsLoss::default();
        let d = l.derivative(&[0.3], &[1.0]);
        assert!((d[0] - (sigmoid(0.3) - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn large_logits_stay_finite() {
        let l = BceWithLogitsLoss::new(3.0);
        assert!(l.loss(&[1000.0], &[0.0]).is_finite());
        assert!(l.loss(&[-1000.0], &[1.0]).is_finite());
    }

    #[test]
    fn pos_weight_scales_positive_term() {
        let plain = BceWithLogitsLoss::default().loss(&[-1.0], &[1.0]);
        let weighted = BceWithLogitsLoss::new(2.0).loss(&[-1.0], &[1.0]);
        assert!((weighted - 2.0 * plain).abs() < 1e-12);
    }
}
