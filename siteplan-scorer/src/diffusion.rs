//! Synchronous score diffusion over the weighted candidate graph.

use siteplan_core::{ScoringError, WeightedProximityGraph};

/// Blend each score with the affinity-weighted mean of its neighbours.
///
/// Every step reads only the previous step's scores:
/// `next[i] = alpha * prev[i] + (1 - alpha) * Σ w_ij prev[j] / Σ w_ij`.
/// Nodes without neighbours keep their score.
///
/// # Errors
/// Returns [`ScoringError::LengthMismatch`] when `scores` and `graph` differ
/// in size.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use siteplan_core::WeightedProximityGraph;
/// use siteplan_scorer::diffuse;
///
/// let sites = [Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 0.001 }];
/// let graph = WeightedProximityGraph::build(&sites, 1.0);
/// let smoothed = diffuse(&[1.0, 0.0], &graph, 0.5, 1)?;
/// assert_eq!(smoothed, vec![0.5, 0.5]);
/// # Ok::<(), siteplan_core::ScoringError>(())
/// ```
#[expect(
    clippy::float_arithmetic,
    reason = "diffusion is a convex blend of scores"
)]
pub fn diffuse(
    scores: &[f64],
    graph: &WeightedProximityGraph,
    alpha: f64,
    iterations: usize,
) -> Result<Vec<f64>, ScoringError> {
    if scores.len() != graph.len() {
        return Err(ScoringError::LengthMismatch {
            expected: graph.len(),
            actual: scores.len(),
        });
    }
    let adjacency: Vec<Vec<(usize, f64)>> =
        (0..graph.len()).map(|node| graph.neighbours(node)).collect();
    let mut current = scores.to_vec();
    for _ in 0..iterations {
        let next = current
            .iter()
            .zip(&adjacency)
            .map(|(&own, neighbours)| {
                let weight_sum: f64 = neighbours.iter().map(|&(_, w)| w).sum();
                if neighbours.is_empty() || weight_sum <= 0.0 {
                    return own;
                }
                let weighted: f64 = neighbours
                    .iter()
                    .map(|&(j, w)| w * current.get(j).copied().unwrap_or(0.0))
                    .sum();
                alpha * own + (1.0 - alpha) * (weighted / weight_sum)
            })
            .collect();
        current = next;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use rstest::rstest;

    #[rstest]
    fn isolated_nodes_keep_their_score() {
        let sites = [Coord { x: 0.0, y: 0.0 }, Coord { x: 5.0, y: 5.0 }];
        let graph = WeightedProximityGraph::build(&sites, 1.0);
        let smoothed = diffuse(&[0.2, 0.9], &graph, 0.7, 5).expect("sizes match");
        assert_eq!(smoothed, vec![0.2, 0.9]);
    }

    #[rstest]
    fn updates_are_synchronous() {
        // A path a - b - c with equal spacing.
        let sites = [
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 0.0, y: 0.01 },
            Coord { x: 0.0, y: 0.02 },
        ];
        let graph = WeightedProximityGraph::build(&sites, 1.5);
        let smoothed = diffuse(&[1.0, 0.0, 0.0], &graph, 0.5, 1).expect("sizes match");
        // b sees the old a = 1 and c = 0 with equal weights; c sees old b = 0.
        assert!((smoothed[1] - 0.25).abs() < 1e-9);
        assert_eq!(smoothed[2], 0.0);
        assert!((smoothed[0] - 0.5).abs() < 1e-12);
    }

    #[rstest]
    fn rejects_mismatched_lengths() {
        let graph = WeightedProximityGraph::build(&[Coord { x: 0.0, y: 0.0 }], 1.0);
        assert!(diffuse(&[0.1, 0.2], &graph, 0.5, 1).is_err());
    }
}
