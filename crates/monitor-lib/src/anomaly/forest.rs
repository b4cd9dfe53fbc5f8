//! Random partitioning trees for isolation-based scoring
//!
//! Each tree recursively splits a subsample on a random feature at a
//! random threshold. Distributional outliers end up isolated near the
//! root, so their expected path length is short.

use crate::models::FeatureRow;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Euler-Mascheroni constant, for the harmonic-number approximation in
/// `average_path_length`.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// One fitted isolation tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    /// Fit a tree over the given subsample of rows.
    pub fn fit(
        rows: &[[f64; FeatureRow::DIM]],
        indices: &[usize],
        max_depth: usize,
        rng: &mut StdRng,
    ) -> Self {
        Self {
            root: build_node(rows, indices, 0, max_depth, rng),
        }
    }

    /// Path length from root to the leaf the row falls into, with the leaf
    /// size adjustment from the reference algorithm.
    pub fn path_length(&self, row: &[f64; FeatureRow::DIM]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;

        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] < *threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

fn build_node(
    rows: &[[f64; FeatureRow::DIM]],
    indices: &[usize],
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= max_depth || indices.len() <= 1 {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    // candidate features are those with spread left to split on
    let mut bounds = [(f64::INFINITY, f64::NEG_INFINITY); FeatureRow::DIM];
    for &i in indices {
        for (f, bound) in bounds.iter_mut().enumerate() {
            bound.0 = bound.0.min(rows[i][f]);
            bound.1 = bound.1.max(rows[i][f]);
        }
    }
    let candidates: Vec<usize> = (0..FeatureRow::DIM)
        .filter(|&f| bounds[f].1 > bounds[f].0)
        .collect();

    if candidates.is_empty() {
        // all remaining rows identical
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let feature = candidates[rng.random_range(0..candidates.len())];
    let (min, max) = bounds[feature];
    let threshold = min + rng.random::<f64>() * (max - min);

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| rows[i][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_node(rows, &left, depth + 1, max_depth, rng)),
        right: Box::new(build_node(rows, &right, depth + 1, max_depth, rng)),
    }
}

/// Average path length of an unsuccessful BST search over `n` nodes,
/// `c(n)` in the isolation forest literature.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        n => {
            let nf = n as f64;
            2.0 * ((nf - 1.0).ln() + EULER_GAMMA) - 2.0 * (nf - 1.0) / nf
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_average_path_length_known_values() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // c(n) grows roughly like 2 ln(n)
        assert!(average_path_length(256) > average_path_length(16));
    }

    #[test]
    fn test_outlier_has_shorter_path() {
        let rows: Vec<[f64; 3]> = (0..64)
            .map(|i| [10.0 + (i % 4) as f64, 20.0 + (i % 3) as f64, 5.0])
            .chain(std::iter::once([95.0, 90.0, 300.0]))
            .collect();
        let indices: Vec<usize> = (0..rows.len()).collect();
        let mut rng = StdRng::seed_from_u64(7);

        // average over several trees to smooth out individual splits
        let trees: Vec<_> = (0..50)
            .map(|_| IsolationTree::fit(&rows, &indices, 8, &mut rng))
            .collect();
        let mean_path = |row: &[f64; 3]| {
            trees.iter().map(|t| t.path_length(row)).sum::<f64>() / trees.len() as f64
        };

        assert!(mean_path(&[95.0, 90.0, 300.0]) < mean_path(&[11.0, 21.0, 5.0]));
    }

    #[test]
    fn test_identical_rows_collapse_to_leaf() {
        let rows = vec![[1.0, 2.0, 3.0]; 10];
        let indices: Vec<usize> = (0..rows.len()).collect();
        let mut rng = StdRng::seed_from_u64(1);

        let tree = IsolationTree::fit(&rows, &indices, 8, &mut rng);
        // no split possible, so the whole subsample sits in one leaf
        assert_eq!(tree.path_length(&[1.0, 2.0, 3.0]), average_path_length(10));
    }
}
