//! Bagged regression trees (random forest without feature subsampling).
//!
//! Trees are grown in parallel; tree `i` draws its bootstrap sample from a
//! seed derived from the base seed and `i`, so a forest is reproducible
//! regardless of scheduling.

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_leaf: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
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

/// CART regression tree with squared-error splits.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    /// Total squared-error reduction per feature.
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    /// Number of samples going left after sorting by `feature`.
    left_len: usize,
    gain: f64,
}

fn sse(sum: f64, sum_sq: f64, n: usize) -> f64 {
    sum_sq - sum * sum / n as f64
}

impl RegressionTree {
    /// Grow a tree on the rows listed in `sample` (repeats allowed).
    pub fn fit(x: &[Vec<f64>], y: &[f64], sample: &[usize], params: &TreeParams) -> Self {
        let n_features = x.first().map_or(0, Vec::len);
        let mut tree = Self {
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };
        let mut idx = sample.to_vec();
        tree.grow(x, y, &mut idx, 0, params);
        tree
    }

    fn grow(&mut self, x: &[Vec<f64>], y: &[f64], idx: &mut [usize], depth: usize, params: &TreeParams) -> usize {
        let n = idx.len();
        let mean = idx.iter().map(|&i| y[i]).sum::<f64>() / n.max(1) as f64;

        let split = if depth < params.max_depth && n >= 2 * params.min_samples_leaf {
            self.best_split(x, y, idx, params)
        } else {
            None
        };

        let Some(split) = split else {
            self.nodes.push(Node::Leaf { value: mean });
            return self.nodes.len() - 1;
        };

        self.importances[split.feature] += split.gain;
        idx.sort_by(|&a, &b| x[a][split.feature].total_cmp(&x[b][split.feature]));

        // Reserve the parent slot so children get higher ids.
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });
        let (left_idx, right_idx) = idx.split_at_mut(split.left_len);
        let left = self.grow(x, y, left_idx, depth + 1, params);
        let right = self.grow(x, y, right_idx, depth + 1, params);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    fn best_split(&self, x: &[Vec<f64>], y: &[f64], idx: &mut [usize], params: &TreeParams) -> Option<BestSplit> {
        let n = idx.len();
        let total_sum: f64 = idx.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = idx.iter().map(|&i| y[i] * y[i]).sum();
        let parent = sse(total_sum, total_sq, n);

        let mut best: Option<BestSplit> = None;
        for feature in 0..self.importances.len() {
            idx.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 1..n {
                let prev = idx[pos - 1];
                left_sum += y[prev];
                left_sq += y[prev] * y[prev];

                if pos < params.min_samples_leaf || n - pos < params.min_samples_leaf {
                    continue;
                }
                let (lo, hi) = (x[prev][feature], x[idx[pos]][feature]);
                if lo >= hi {
                    continue;
                }
                let children = sse(left_sum, left_sq, pos) + sse(total_sum - left_sum, total_sq - left_sq, n - pos);
                let gain = parent - children;
                if gain > 1e-12 && best.as_ref().is_none_or(|b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: lo + (hi - lo) / 2.0,
                        left_len: pos,
                        gain,
                    });
                }
            }
        }
        best
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

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub tree: TreeParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

fn tree_seed(seed: u64, tree: usize) -> u64 {
    seed.wrapping_add((tree as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

impl RandomForest {
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams, seed: u64) -> Self {
        let n = y.len();
        let trees = (0..params.n_trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(tree_seed(seed, i));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, &sample, &params.tree)
            })
            .collect();
        Self { trees }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return f64::NAN;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Impurity-based importances normalised to sum to one.
    pub fn feature_importances(&self) -> Vec<f64> {
        let n_features = self.trees.first().map_or(0, |t| t.importances.len());
        let mut total = vec![0.0; n_features];
        for tree in &self.trees {
            for (acc, v) in total.iter_mut().zip(&tree.importances) {
                *acc += v;
            }
        }
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            total.iter_mut().for_each(|v| *v /= sum);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // y depends on x0 through a step; x1 is irrelevant.
        let x: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64, ((i * 7) % 11) as f64]).collect();
        let y: Vec<f64> = x.iter().map(|r| if r[0] < 30.0 { 1.0 } else { 5.0 }).collect();
        (x, y)
    }

    #[test]
    fn tree_learns_step_function() {
        let (x, y) = step_data();
        let sample: Vec<usize> = (0..x.len()).collect();
        let tree = RegressionTree::fit(&x, &y, &sample, &TreeParams::default());

        assert_eq!(tree.predict(&[10.0, 3.0]), 1.0);
        assert_eq!(tree.predict(&[45.0, 3.0]), 5.0);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn max_depth_zero_is_a_stump_of_the_mean() {
        let (x, y) = step_data();
        let sample: Vec<usize> = (0..x.len()).collect();
        let params = TreeParams {
            max_depth: 0,
            min_samples_leaf: 1,
        };
        let tree = RegressionTree::fit(&x, &y, &sample, &params);
        assert!((tree.predict(&[0.0, 0.0]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn forest_is_reproducible_and_ranks_features() {
        let (x, y) = step_data();
        let params = ForestParams {
            n_trees: 20,
            tree: TreeParams::default(),
        };
        let a = RandomForest::fit(&x, &y, &params, 42);
        let b = RandomForest::fit(&x, &y, &params, 42);
        assert_eq!(a, b);
        assert_eq!(a.n_trees(), 20);

        let importances = a.feature_importances();
        assert!(importances[0] > 0.9);
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
