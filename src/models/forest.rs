//! Random forest regressor.
//!
//! Bootstrap-aggregated CART regression trees:
//!
//! - each tree is grown on a bootstrap sample of the training rows
//! - splits minimize the summed squared error of the two children
//! - the forest prediction is the mean of the tree predictions
//!
//! Trees are built in parallel with rayon. Tree `t` draws its bootstrap
//! sample from its own `StdRng` seeded with `seed + t`, so the fitted forest
//! is identical for a given seed no matter how work is scheduled.
//!
//! Trees are stored as flat node arenas rather than boxed recursive nodes so
//! that deep trees serialize without hitting JSON nesting limits.

use nalgebra::DMatrix;
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Minimum impurity decrease for a split to be worth taking.
const MIN_GAIN: f64 = 1e-12;

/// Forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub seed: u64,
    /// Maximum tree depth (`None` grows until leaves are pure or too small).
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 10,
            seed: 0,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "lowercase")]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single regression tree. The root is `nodes[0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Grow a tree on the rows listed in `sample` (may contain repeats).
    fn fit(x: &DMatrix<f64>, y: &[f64], sample: Vec<usize>, params: &ForestParams) -> Self {
        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut pending = vec![(0usize, sample, 0usize)];

        while let Some((id, rows, depth)) = pending.pop() {
            let value = mean_of(y, &rows);

            let too_small = rows.len() < params.min_samples_split.max(2);
            let too_deep = params.max_depth.is_some_and(|d| depth >= d);
            if too_small || too_deep || is_pure(y, &rows) {
                nodes[id] = Node::Leaf { value };
                continue;
            }

            let Some((feature, threshold)) = best_split(x, y, &rows, params.min_samples_leaf.max(1)) else {
                nodes[id] = Node::Leaf { value };
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
                rows.iter().partition(|&&r| x[(r, feature)] <= threshold);
            debug_assert!(!left_rows.is_empty() && !right_rows.is_empty());
            if left_rows.is_empty() || right_rows.is_empty() {
                nodes[id] = Node::Leaf { value };
                continue;
            }

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { value: 0.0 });
            nodes.push(Node::Leaf { value: 0.0 });
            nodes[id] = Node::Split {
                feature,
                threshold,
                left,
                right,
            };

            pending.push((left, left_rows, depth + 1));
            pending.push((right, right_rows, depth + 1));
        }

        Self { nodes }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 1usize)];
        while let Some((id, d)) = stack.pop() {
            max_depth = max_depth.max(d);
            if let Node::Split { left, right, .. } = &self.nodes[id] {
                stack.push((*left, d + 1));
                stack.push((*right, d + 1));
            }
        }
        max_depth
    }

    /// Structural sanity check for trees loaded from disk.
    fn is_well_formed(&self, n_features: usize) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(id, node)| match node {
                Node::Leaf { value } => value.is_finite(),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    *feature < n_features
                        && threshold.is_finite()
                        && *left > id
                        && *right > id
                        && *left < self.nodes.len()
                        && *right < self.nodes.len()
                }
            })
    }
}

/// Fitted random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit(x: &DMatrix<f64>, y: &[f64], params: &ForestParams) -> PipelineResult<Self> {
        let n = x.nrows();
        if n == 0 || x.ncols() == 0 {
            return Err(PipelineError::training("Cannot fit a forest on an empty feature matrix"));
        }
        if y.len() != n {
            return Err(PipelineError::training(format!(
                "Target has {} values for {n} feature rows",
                y.len()
            )));
        }
        if params.n_trees == 0 {
            return Err(PipelineError::training("Forest needs at least one tree"));
        }

        let trees: Vec<RegressionTree> = (0..params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, sample, params)
            })
            .collect();

        tracing::debug!(
            trees = trees.len(),
            max_depth = trees.iter().map(RegressionTree::depth).max().unwrap_or(0),
            "forest fitted"
        );

        Ok(Self {
            params: params.clone(),
            n_features: x.ncols(),
            trees,
        })
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        total / self.trees.len() as f64
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        !self.trees.is_empty() && self.trees.iter().all(|t| t.is_well_formed(self.n_features))
    }
}

fn mean_of(y: &[f64], rows: &[usize]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|&r| y[r]).sum::<f64>() / rows.len() as f64
}

fn is_pure(y: &[f64], rows: &[usize]) -> bool {
    let first = y[rows[0]];
    rows.iter().all(|&r| y[r] == first)
}

/// Best `(feature, threshold)` by squared-error reduction, if any split helps.
fn best_split(x: &DMatrix<f64>, y: &[f64], rows: &[usize], min_leaf: usize) -> Option<(usize, f64)> {
    let n = rows.len();
    let total_sum: f64 = rows.iter().map(|&r| y[r]).sum();
    let total_sq: f64 = rows.iter().map(|&r| y[r] * y[r]).sum();
    let parent_sse = total_sq - total_sum * total_sum / n as f64;

    let mut best: Option<(usize, f64, f64)> = None;
    let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

    for feature in 0..x.ncols() {
        pairs.clear();
        pairs.extend(rows.iter().map(|&r| (x[(r, feature)], y[r])));
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for i in 0..n - 1 {
            let (xv, yv) = pairs[i];
            left_sum += yv;
            left_sq += yv * yv;

            let next_x = pairs[i + 1].0;
            if xv == next_x {
                continue;
            }
            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left as f64)
                + (right_sq - right_sum * right_sum / n_right as f64);
            let gain = parent_sse - sse;

            if gain > MIN_GAIN && best.is_none_or(|(_, _, g)| gain > g) {
                // The midpoint of adjacent floats can round up to `next_x`.
                let mid = (xv + next_x) / 2.0;
                let threshold = if mid < next_x { mid } else { xv };
                best = Some((feature, threshold, gain));
            }
        }
    }

    best.map(|(feature, threshold, _)| (feature, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (DMatrix<f64>, Vec<f64>) {
        // y jumps from 10 to 50 at x0 = 5; x1 is noise.
        let n = 40;
        let mut flat = Vec::with_capacity(n * 2);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let x0 = i as f64 / 4.0;
            flat.push(x0);
            flat.push((i % 3) as f64);
            y.push(if x0 < 5.0 { 10.0 } else { 50.0 });
        }
        (DMatrix::from_row_slice(n, 2, &flat), y)
    }

    #[test]
    fn single_tree_learns_a_step() {
        let (x, y) = step_data();
        let tree = RegressionTree::fit(&x, &y, (0..y.len()).collect(), &ForestParams::default());
        assert_eq!(tree.predict(&[1.0, 0.0]), 10.0);
        assert_eq!(tree.predict(&[9.0, 2.0]), 50.0);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn adjacent_float_values_still_split_both_ways() {
        let a = 1.0 + f64::EPSILON;
        let b = 1.0 + 2.0 * f64::EPSILON;
        let x = DMatrix::from_row_slice(2, 1, &[a, b]);
        let y = [0.0, 10.0];

        let (feature, threshold) = best_split(&x, &y, &[0, 1], 1).unwrap();
        assert_eq!(feature, 0);
        assert!(a <= threshold && threshold < b, "threshold {threshold}");

        let tree = RegressionTree::fit(&x, &y, vec![0, 1], &ForestParams::default());
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.predict(&[a]), 0.0);
        assert_eq!(tree.predict(&[b]), 10.0);
    }

    #[test]
    fn max_depth_is_respected() {
        let (x, _) = step_data();
        let y: Vec<f64> = (0..x.nrows()).map(|i| (i * i) as f64).collect();
        let params = ForestParams {
            max_depth: Some(3),
            ..ForestParams::default()
        };
        let tree = RegressionTree::fit(&x, &y, (0..y.len()).collect(), &params);
        assert!(tree.depth() <= 4, "depth {}", tree.depth());
    }

    #[test]
    fn forest_is_deterministic_for_a_seed() {
        let (x, y) = step_data();
        let params = ForestParams {
            n_trees: 8,
            seed: 7,
            ..ForestParams::default()
        };
        let a = RandomForest::fit(&x, &y, &params).unwrap();
        let b = RandomForest::fit(&x, &y, &params).unwrap();
        assert_eq!(a, b);

        let p = a.predict_row(&[8.0, 1.0]);
        assert!((p - 50.0).abs() < 10.0, "prediction {p}");
    }

    #[test]
    fn different_seeds_draw_different_samples() {
        let (x, _) = step_data();
        let y: Vec<f64> = (0..x.nrows()).map(|i| i as f64).collect();
        let a = RandomForest::fit(&x, &y, &ForestParams { seed: 1, ..ForestParams::default() }).unwrap();
        let b = RandomForest::fit(&x, &y, &ForestParams { seed: 2, ..ForestParams::default() }).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_input_is_a_training_error() {
        let x = DMatrix::<f64>::zeros(0, 2);
        let err = RandomForest::fit(&x, &[], &ForestParams::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
    }

    #[test]
    fn fitted_trees_are_well_formed() {
        let (x, y) = step_data();
        let forest = RandomForest::fit(&x, &y, &ForestParams::default()).unwrap();
        assert!(forest.is_well_formed());
        assert_eq!(forest.trees().len(), 10);
    }
}
