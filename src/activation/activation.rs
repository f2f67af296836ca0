use serde::{Serialize, Deserialize};

/// Element-wise activation applied after a dense layer's linear transform.
///
/// The fraud networks end in `Identity` so the output is a raw score (logit);
/// the logistic squashing happens in the loss and at evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    Sigmoid,
    ReLU,
    Identity,
    Tanh,
    LeakyReLU { alpha: f64 },
}

impl ActivationFunction {
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => sigmoid(x),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Identity => x,
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
        }
    }

    /// Derivative evaluated at the pre-activation value `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => {
                let fx = sigmoid(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
        }
    }
}

/// Logistic function, split on sign so large |x| never overflows `exp`.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(!sigmoid(-800.0).is_nan());
    }

    #[test]
    fn relu_derivative_is_step() {
        let relu = ActivationFunction::ReLU;
        assert_eq!(relu.derivative(2.0), 1.0);
        assert_eq!(relu.derivative(-2.0), 0.0);
    }

    #[test]
    fn smooth_derivatives_match_closed_forms() {
        let s = ActivationFunction::Sigmoid;
        assert!((s.derivative(0.0) - 0.25).abs() < 1e-12);
        let t = ActivationFunction::Tanh;
        assert_eq!(t.function(0.0), 0.0);
        assert!((t.derivative(0.0) - 1.0).abs() < 1e-12);
        let leaky = ActivationFunction::LeakyReLU { alpha: 0.1 };
        assert!((leaky.function(-2.0) + 0.2).abs() < 1e-12);
        assert_eq!(leaky.derivative(-2.0), 0.1);
    }
}
