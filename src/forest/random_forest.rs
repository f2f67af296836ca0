use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::error::{FraudError, Result};
use crate::forest::decision_tree::{DecisionTree, TrainingView, TreeParams};
use crate::forest::{fit_width, FitPredict};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Reweight classes inversely to their frequency (`n / (2 * n_class)`).
    pub balanced: bool,
    pub seed: Option<u64>,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        RandomForestParams {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            balanced: true,
            seed: Some(42),
        }
    }
}

/// Bagged CART ensemble; `predict_proba` averages the trees' leaf fractions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub params: RandomForestParams,
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl RandomForest {
    pub fn new(params: RandomForestParams) -> Self {
        RandomForest { params, trees: Vec::new(), n_features: 0 }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn class_weight(&self, y: &[f64]) -> [f64; 2] {
        if !self.params.balanced {
            return [1.0, 1.0];
        }
        let n = y.len() as f64;
        let pos = y.iter().filter(|&&t| t >= 0.5).count() as f64;
        let neg = n - pos;
        let w = |count: f64| if count > 0.0 { n / (2.0 * count) } else { 1.0 };
        [w(neg), w(pos)]
    }

    fn check_width(&self, x: &[Vec<f64>]) -> Result<()> {
        match x.iter().find(|r| r.len() != self.n_features) {
            Some(bad) => Err(FraudError::DimensionMismatch { expected: self.n_features, got: bad.len() }),
            None => Ok(()),
        }
    }
}

impl Default for RandomForest {
    fn default() -> Self {
        RandomForest::new(RandomForestParams::default())
    }
}

impl FitPredict for RandomForest {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        let n_features = fit_width(x, self.params.n_estimators, "random forest")?;
        if x.len() != y.len() {
            return Err(FraudError::DimensionMismatch { expected: x.len(), got: y.len() });
        }

        let n = x.len();
        let mut rng = match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let view = TrainingView { x, y, class_weight: self.class_weight(y) };
        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf.max(1),
            max_features: ((n_features as f64).sqrt().round() as usize).max(1),
        };

        info!(
            trees = self.params.n_estimators,
            rows = n,
            features = n_features,
            class_weight = ?view.class_weight,
            "fitting random forest"
        );

        self.trees = (0..self.params.n_estimators)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(&view, bootstrap, &tree_params, &mut rng)
            })
            .collect();
        self.n_features = n_features;

        debug!(
            max_depth = self.trees.iter().map(|t| t.depth()).max().unwrap_or(0),
            "random forest fitted"
        );
        Ok(())
    }

    fn is_supervised(&self) -> bool {
        true
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(FraudError::NotFitted("random forest"));
        }
        self.check_width(x)?;
        let n_trees = self.trees.len() as f64;
        Ok(x.iter()
            .map(|row| self.trees.iter().map(|t| t.predict_proba(row)).sum::<f64>() / n_trees)
            .collect())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<u8>> {
        Ok(self.predict_proba(x)?.into_iter().map(|p| u8::from(p >= 0.5)).collect())
    }

    fn model_type(&self) -> &'static str {
        "RandomForest"
    }
}
