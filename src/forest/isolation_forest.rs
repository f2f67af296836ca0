//! Isolation Forest.
//!
//! Anomalies are easier to isolate with random axis-aligned cuts, so they
//! end up with shorter average path lengths across the trees.

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand::seq::index::sample;
use serde::{Serialize, Deserialize};
use tracing::info;

use crate::error::{FraudError, Result};
use crate::forest::{fit_width, FitPredict};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForestParams {
    pub n_estimators: usize,
    /// Rows drawn (without replacement) to grow each tree.
    pub max_samples: usize,
    /// Expected share of anomalies; sets the label threshold on training scores.
    pub contamination: f64,
    pub seed: Option<u64>,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        IsolationForestParams {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
            seed: Some(42),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    pub params: IsolationForestParams,
    trees: Vec<IsolationTree>,
    /// Sub-sample size actually used; normalises path lengths via c(n).
    sample_size: usize,
    /// Scores at or above this are labelled anomalous.
    threshold: f64,
    n_features: usize,
}

impl IsolationForest {
    pub fn new(params: IsolationForestParams) -> Self {
        IsolationForest { params, trees: Vec::new(), sample_size: 0, threshold: 1.0, n_features: 0 }
    }

    /// Average path length of an unsuccessful BST search, c(n).
    pub fn average_path_length(n: usize) -> f64 {
        if n <= 1 {
            return 0.0;
        }
        let n = n as f64;
        2.0 * ((n - 1.0).ln() + 0.5772156649) - 2.0 * (n - 1.0) / n
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Anomaly score in (0, 1]: 2^(-E[h(x)] / c(sample_size)). Higher is
    /// more anomalous; ~0.5 means no clear signal.
    pub fn score_sample(&self, row: &[f64]) -> f64 {
        let c = Self::average_path_length(self.sample_size);
        if self.trees.is_empty() || c == 0.0 {
            return 0.5;
        }
        let mean_path = self.trees.iter().map(|t| t.path_length(row)).sum::<f64>() / self.trees.len() as f64;
        2f64.powf(-mean_path / c)
    }

    pub fn score_samples(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(FraudError::NotFitted("isolation forest"));
        }
        if let Some(bad) = x.iter().find(|r| r.len() != self.n_features) {
            return Err(FraudError::DimensionMismatch { expected: self.n_features, got: bad.len() });
        }
        Ok(x.iter().map(|r| self.score_sample(r)).collect())
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        IsolationForest::new(IsolationForestParams::default())
    }
}

impl FitPredict for IsolationForest {
    /// Labels are ignored; the forest only learns what "normal" looks like.
    fn fit(&mut self, x: &[Vec<f64>], _y: &[f64]) -> Result<()> {
        let n_features = fit_width(x, self.params.n_estimators, "isolation forest")?;
        if !(0.0..0.5).contains(&self.params.contamination) {
            return Err(FraudError::InvalidConfig(format!(
                "contamination must be in [0, 0.5), got {}",
                self.params.contamination
            )));
        }

        let mut rng = match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let sample_size = self.params.max_samples.clamp(1, x.len());
        let max_depth = (sample_size as f64).log2().ceil() as usize;

        self.trees = (0..self.params.n_estimators)
            .map(|_| {
                let rows: Vec<&[f64]> = sample(&mut rng, x.len(), sample_size)
                    .iter()
                    .map(|i| x[i].as_slice())
                    .collect();
                IsolationTree::build(&rows, n_features, max_depth, &mut rng)
            })
            .collect();
        self.sample_size = sample_size;
        self.n_features = n_features;

        // (1 - contamination) quantile of the training scores
        let mut scores: Vec<f64> = x.iter().map(|r| self.score_sample(r)).collect();
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        self.threshold = if self.params.contamination == 0.0 {
            f64::INFINITY
        } else {
            let k = ((1.0 - self.params.contamination) * scores.len() as f64).floor() as usize;
            scores[k.min(scores.len() - 1)]
        };

        info!(
            trees = self.trees.len(),
            sample_size,
            threshold = self.threshold,
            "isolation forest fitted"
        );
        Ok(())
    }

    fn is_supervised(&self) -> bool {
        false
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// The anomaly score stands in for a probability.
    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.score_samples(x)
    }

    /// 1 = anomalous, 0 = normal.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<u8>> {
        Ok(self.score_samples(x)?.into_iter().map(|s| u8::from(s >= self.threshold)).collect())
    }

    fn model_type(&self) -> &'static str {
        "IsolationForest"
    }
}

/// A single isolation tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationTree {
    root: IsolationNode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum IsolationNode {
    Internal {
        feature_idx: usize,
        split_value: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    Leaf {
        size: usize,
    },
}

impl IsolationTree {
    fn build<R: Rng + ?Sized>(rows: &[&[f64]], n_features: usize, max_depth: usize, rng: &mut R) -> Self {
        IsolationTree { root: Self::build_node(rows, n_features, 0, max_depth, rng) }
    }

    fn build_node<R: Rng + ?Sized>(
        rows: &[&[f64]],
        n_features: usize,
        depth: usize,
        max_depth: usize,
        rng: &mut R,
    ) -> IsolationNode {
        if depth >= max_depth || rows.len() <= 1 || n_features == 0 {
            return IsolationNode::Leaf { size: rows.len() };
        }

        let feature_idx = rng.gen_range(0..n_features);
        let (min_val, max_val) = rows.iter()
            .map(|r| r[feature_idx])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

        // All values equal on this feature: cannot split here
        if max_val - min_val <= f64::EPSILON {
            return IsolationNode::Leaf { size: rows.len() };
        }

        let split_value = rng.gen_range(min_val..max_val);
        let (left, right): (Vec<&[f64]>, Vec<&[f64]>) =
            rows.iter().copied().partition(|r| r[feature_idx] < split_value);

        IsolationNode::Internal {
            feature_idx,
            split_value,
            left: Box::new(Self::build_node(&left, n_features, depth + 1, max_depth, rng)),
            right: Box::new(Self::build_node(&right, n_features, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                IsolationNode::Leaf { size } => {
                    // unresolved subtree of `size` points contributes c(size)
                    return depth as f64 + IsolationForest::average_path_length(*size);
                }
                IsolationNode::Internal { feature_idx, split_value, left, right } => {
                    let v = row.get(*feature_idx).copied().unwrap_or(0.0);
                    node = if v < *split_value { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud() -> Vec<Vec<f64>> {
        (0..200)
            .map(|i| {
                let a = (i % 21) as f64 - 10.0;
                let b = ((i * 7) % 13) as f64 - 6.0;
                vec![50.0 + a * 0.5, 20.0 + b * 0.5]
            })
            .collect()
    }

    #[test]
    fn outlier_scores_higher_than_inlier() {
        let mut forest = IsolationForest::new(IsolationForestParams { n_estimators: 60, max_samples: 64, ..Default::default() });
        forest.fit(&cloud(), &[]).unwrap();
        let scores = forest.score_samples(&[vec![50.0, 20.0], vec![500.0, -300.0]]).unwrap();
        assert!(scores.iter().all(|s| *s > 0.0 && *s <= 1.0));
        assert!(scores[1] > scores[0], "{scores:?}");
        assert_eq!(forest.predict(&[vec![500.0, -300.0]]).unwrap(), vec![1]);
    }

    #[test]
    fn contamination_controls_training_label_share() {
        let data = cloud();
        let mut forest = IsolationForest::new(IsolationForestParams { contamination: 0.1, ..Default::default() });
        forest.fit(&data, &[]).unwrap();
        let flagged = forest.predict(&data).unwrap().iter().filter(|&&l| l == 1).count();
        assert!(flagged >= 1 && flagged <= 60, "flagged {flagged}");
    }

    #[test]
    fn average_path_length_grows_with_n() {
        assert_eq!(IsolationForest::average_path_length(1), 0.0);
        assert!(IsolationForest::average_path_length(256) > IsolationForest::average_path_length(16));
    }

    #[test]
    fn rejects_bad_contamination() {
        let mut forest = IsolationForest::new(IsolationForestParams { contamination: 0.7, ..Default::default() });
        assert!(matches!(forest.fit(&cloud(), &[]), Err(FraudError::InvalidConfig(_))));
    }

    #[test]
    fn ragged_rows_are_rejected_at_fit() {
        let mut data = cloud();
        data[17] = vec![1.0];
        let mut forest = IsolationForest::default();
        assert!(matches!(
            forest.fit(&data, &[]),
            Err(FraudError::DimensionMismatch { expected: 2, got: 1 })
        ));
        assert!(!forest.is_fitted());
    }

    #[test]
    fn zero_trees_is_a_config_error() {
        let mut forest = IsolationForest::new(IsolationForestParams { n_estimators: 0, ..Default::default() });
        assert!(matches!(forest.fit(&cloud(), &[]), Err(FraudError::InvalidConfig(_))));
        assert!(!forest.is_fitted());
    }
}
