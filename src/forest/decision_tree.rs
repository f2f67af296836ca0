//! Binary CART tree with weighted Gini impurity, used as the random forest's
//! base learner.

use rand::Rng;
use rand::seq::index::sample;
use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        /// Weighted fraction of positive samples that reached this leaf.
        proba: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Candidate features examined per split.
    pub max_features: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: TreeNode,
}

/// Borrowed training data plus per-class weights.
pub struct TrainingView<'a> {
    pub x: &'a [Vec<f64>],
    pub y: &'a [f64],
    pub class_weight: [f64; 2],
}

impl TrainingView<'_> {
    fn weight(&self, i: usize) -> f64 {
        self.class_weight[usize::from(self.y[i] >= 0.5)]
    }

    fn is_positive(&self, i: usize) -> bool {
        self.y[i] >= 0.5
    }
}

impl DecisionTree {
    /// Grows a tree on the rows listed in `indices` (duplicates allowed, as
    /// produced by bootstrapping).
    pub fn fit<R: Rng + ?Sized>(
        data: &TrainingView<'_>,
        indices: Vec<usize>,
        params: &TreeParams,
        rng: &mut R,
    ) -> DecisionTree {
        let root = build_node(data, indices, 0, params, rng);
        DecisionTree { root }
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { proba } => return *proba,
                TreeNode::Split { feature, threshold, left, right } => {
                    let v = row.get(*feature).copied().unwrap_or(0.0);
                    node = if v <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        walk(&self.root)
    }
}

fn weighted_counts(data: &TrainingView<'_>, indices: &[usize]) -> (f64, f64) {
    indices.iter().fold((0.0, 0.0), |(w, wp), &i| {
        let wi = data.weight(i);
        (w + wi, if data.is_positive(i) { wp + wi } else { wp })
    })
}

fn gini(total: f64, positive: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let p = positive / total;
    2.0 * p * (1.0 - p)
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn best_split(
    data: &TrainingView<'_>,
    indices: &[usize],
    features: &[usize],
    params: &TreeParams,
    total_w: f64,
    pos_w: f64,
) -> Option<BestSplit> {
    let mut best: Option<BestSplit> = None;

    for &feature in features {
        let mut order = indices.to_vec();
        order.sort_by(|&a, &b| {
            data.x[a][feature].partial_cmp(&data.x[b][feature]).unwrap_or(std::cmp::Ordering::Equal)
        });

        let (mut left_w, mut left_pos) = (0.0, 0.0);
        for split_at in 1..order.len() {
            let prev = order[split_at - 1];
            let wi = data.weight(prev);
            left_w += wi;
            if data.is_positive(prev) {
                left_pos += wi;
            }

            let lo = data.x[prev][feature];
            let hi = data.x[order[split_at]][feature];
            if hi <= lo
                || split_at < params.min_samples_leaf
                || order.len() - split_at < params.min_samples_leaf
            {
                continue;
            }

            let right_w = total_w - left_w;
            let right_pos = pos_w - left_pos;
            let impurity = (left_w * gini(left_w, left_pos) + right_w * gini(right_w, right_pos)) / total_w;

            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                best = Some(BestSplit { feature, threshold: (lo + hi) / 2.0, impurity });
            }
        }
    }
    best
}

fn build_node<R: Rng + ?Sized>(
    data: &TrainingView<'_>,
    indices: Vec<usize>,
    depth: usize,
    params: &TreeParams,
    rng: &mut R,
) -> TreeNode {
    let (total_w, pos_w) = weighted_counts(data, &indices);
    let proba = if total_w > 0.0 { pos_w / total_w } else { 0.0 };

    let depth_reached = params.max_depth.is_some_and(|d| depth >= d);
    let pure = proba == 0.0 || proba == 1.0;
    if depth_reached || pure || indices.len() < params.min_samples_split.max(2) {
        return TreeNode::Leaf { proba };
    }

    let n_features = data.x[indices[0]].len();
    let k = params.max_features.clamp(1, n_features.max(1));
    let parent_impurity = gini(total_w, pos_w);

    // Features are tried k at a time in random order; the search only moves
    // on to the next batch when the current one has no improving split.
    let features = sample(rng, n_features, n_features).into_vec();
    let mut best: Option<BestSplit> = None;
    for batch in features.chunks(k) {
        best = best_split(data, &indices, batch, params, total_w, pos_w);
        if best.as_ref().is_some_and(|b| b.impurity < parent_impurity) {
            break;
        }
    }

    let best = match best {
        Some(b) if b.impurity < parent_impurity => b,
        _ => return TreeNode::Leaf { proba },
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| data.x[i][best.feature] <= best.threshold);

    TreeNode::Split {
        feature: best.feature,
        threshold: best.threshold,
        left: Box::new(build_node(data, left_idx, depth + 1, params, rng)),
        right: Box::new(build_node(data, right_idx, depth + 1, params, rng)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn params() -> TreeParams {
        TreeParams { max_depth: None, min_samples_split: 2, min_samples_leaf: 1, max_features: 2 }
    }

    #[test]
    fn separable_data_is_fit_exactly() {
        let x = vec![vec![0.0, 5.0], vec![1.0, 5.0], vec![2.0, 5.0], vec![10.0, 5.0], vec![11.0, 5.0]];
        let y = vec![0.0, 0.0, 0.0, 1.0, 1.0];
        let view = TrainingView { x: &x, y: &y, class_weight: [1.0, 1.0] };
        let tree = DecisionTree::fit(&view, (0..5).collect(), &params(), &mut StdRng::seed_from_u64(0));
        assert_eq!(tree.predict_proba(&[0.5, 5.0]), 0.0);
        assert_eq!(tree.predict_proba(&[10.5, 5.0]), 1.0);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn depth_limit_yields_leaf_probability() {
        let x = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![0.0, 1.0, 0.0, 1.0];
        let view = TrainingView { x: &x, y: &y, class_weight: [1.0, 1.0] };
        let p = TreeParams { max_depth: Some(0), ..params() };
        let tree = DecisionTree::fit(&view, (0..4).collect(), &p, &mut StdRng::seed_from_u64(0));
        assert_eq!(tree.predict_proba(&[1.5]), 0.5);
    }

    #[test]
    fn falls_back_to_other_features_when_sample_is_uninformative() {
        // feature 0 is constant, so any tree that samples it first must move on
        let x: Vec<Vec<f64>> = (0..8).map(|i| vec![1.0, i as f64]).collect();
        let y: Vec<f64> = (0..8).map(|i| if i >= 4 { 1.0 } else { 0.0 }).collect();
        let view = TrainingView { x: &x, y: &y, class_weight: [1.0, 1.0] };
        let p = TreeParams { max_features: 1, ..params() };
        for seed in 0..5 {
            let tree = DecisionTree::fit(&view, (0..8).collect(), &p, &mut StdRng::seed_from_u64(seed));
            assert_eq!(tree.predict_proba(&[1.0, 6.0]), 1.0);
            assert_eq!(tree.predict_proba(&[1.0, 1.0]), 0.0);
        }
    }
}
