//! Proximity graphs over sites.
//!
//! Every graph is built once per run from a coordinate list and an edge
//! radius. Node `i` always refers to `sites[i]`; the graphs never carry site
//! identifiers themselves.
//!
//! - [`ProximityGraph`] is unweighted and drives community detection.
//! - [`WeightedProximityGraph`] carries inverse-distance affinities for score
//!   diffusion.
//! - [`DenseAdjacency`] is the binary adjacency with self-loops consumed by
//!   the message-passing scorers, optionally symmetric-normalised.

use geo::Coord;
use ndarray::{Array2, Axis};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::geodesy::DistanceMatrix;

/// Offset added to distances before inversion so coincident sites keep a
/// finite affinity.
pub const AFFINITY_EPSILON_KM: f64 = 0.05;

fn within_radius_pairs(sites: &[Coord<f64>], radius_km: f64) -> Vec<(usize, usize, f64)> {
    let distances = DistanceMatrix::square(sites);
    let mut pairs = Vec::new();
    for i in 0..sites.len() {
        for (offset, &d) in distances.row(i).iter().enumerate().skip(i + 1) {
            if d <= radius_km {
                pairs.push((i, offset, d));
            }
        }
    }
    pairs
}

/// Undirected graph over `sites` with node weight `i` for `sites[i]` and one
/// edge per pair within `radius_km`, weighted by `edge_weight(distance)`.
fn site_graph(
    sites: &[Coord<f64>],
    radius_km: f64,
    edge_weight: impl Fn(f64) -> f64,
) -> UnGraph<usize, f64> {
    let pairs = within_radius_pairs(sites, radius_km);
    let mut graph = UnGraph::with_capacity(sites.len(), pairs.len());
    for site in 0..sites.len() {
        graph.add_node(site);
    }
    for (a, b, d) in pairs {
        graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), edge_weight(d));
    }
    graph
}

/// Undirected graph with an edge wherever two sites lie within the edge
/// radius. Edge weights hold the haversine distance in kilometres.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use siteplan_core::ProximityGraph;
///
/// let sites = [Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 0.01 }, Coord { x: 1.0, y: 1.0 }];
/// let graph = ProximityGraph::build(&sites, 3.0);
/// assert_eq!(graph.edge_count(), 1);
/// assert_eq!(graph.neighbours(0), vec![1]);
/// assert!(graph.neighbours(2).is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProximityGraph {
    graph: UnGraph<usize, f64>,
}

impl ProximityGraph {
    /// Build the graph over `sites` with edges at distance `<= radius_km`.
    #[must_use]
    pub fn build(sites: &[Coord<f64>], radius_km: f64) -> Self {
        Self {
            graph: site_graph(sites, radius_km, |d| d),
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Report whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Number of undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Neighbours of `node` in ascending index order.
    #[must_use]
    pub fn neighbours(&self, node: usize) -> Vec<usize> {
        if node >= self.len() {
            return Vec::new();
        }
        let mut out: Vec<usize> = self
            .graph
            .neighbors(NodeIndex::new(node))
            .map(|n| n.index())
            .collect();
        out.sort_unstable();
        out
    }

    /// Underlying petgraph structure for traversals.
    #[must_use]
    pub const fn graph(&self) -> &UnGraph<usize, f64> {
        &self.graph
    }
}

/// Undirected graph whose edges carry `1 / (distance + 0.05)` affinities.
#[derive(Debug, Clone, Default)]
pub struct WeightedProximityGraph {
    graph: UnGraph<usize, f64>,
}

impl WeightedProximityGraph {
    /// Build the graph over `sites` with edges at distance `<= radius_km`.
    ///
    /// # Examples
    /// ```
    /// use geo::Coord;
    /// use siteplan_core::WeightedProximityGraph;
    ///
    /// let sites = [Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 0.0 }];
    /// let graph = WeightedProximityGraph::build(&sites, 1.0);
    /// assert_eq!(graph.neighbours(0), vec![(1, 20.0)]);
    /// ```
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "edge affinity is the reciprocal of an offset distance"
    )]
    pub fn build(sites: &[Coord<f64>], radius_km: f64) -> Self {
        Self {
            graph: site_graph(sites, radius_km, |d| 1.0 / (d + AFFINITY_EPSILON_KM)),
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Report whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Weighted neighbours of `node` in ascending index order.
    #[must_use]
    pub fn neighbours(&self, node: usize) -> Vec<(usize, f64)> {
        if node >= self.len() {
            return Vec::new();
        }
        let origin = NodeIndex::new(node);
        let mut out: Vec<(usize, f64)> = self
            .graph
            .edges(origin)
            .map(|edge| {
                let other = if edge.source() == origin {
                    edge.target()
                } else {
                    edge.source()
                };
                (other.index(), *edge.weight())
            })
            .collect();
        out.sort_unstable_by_key(|&(n, _)| n);
        out
    }
}

/// Square dense adjacency matrix.
///
/// [`DenseAdjacency::with_self_loops`] yields the binary matrix with a unit
/// diagonal; [`DenseAdjacency::normalised`] applies `D^-1/2 · A · D^-1/2`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DenseAdjacency {
    matrix: Array2<f64>,
}

impl DenseAdjacency {
    /// Binary adjacency over `sites` with self-loops on the diagonal.
    ///
    /// # Examples
    /// ```
    /// use geo::Coord;
    /// use siteplan_core::DenseAdjacency;
    ///
    /// let sites = [Coord { x: 0.0, y: 0.0 }, Coord { x: 5.0, y: 5.0 }];
    /// let adjacency = DenseAdjacency::with_self_loops(&sites, 3.0);
    /// assert_eq!(adjacency.get(0, 0), 1.0);
    /// assert_eq!(adjacency.get(0, 1), 0.0);
    /// ```
    #[must_use]
    pub fn with_self_loops(sites: &[Coord<f64>], radius_km: f64) -> Self {
        let mut matrix = Array2::eye(sites.len());
        for (a, b, _) in within_radius_pairs(sites, radius_km) {
            for idx in [(a, b), (b, a)] {
                if let Some(cell) = matrix.get_mut(idx) {
                    *cell = 1.0;
                }
            }
        }
        Self { matrix }
    }

    /// Symmetric degree normalisation `D^-1/2 · A · D^-1/2`.
    ///
    /// Degrees are clamped to at least one before the inverse square root.
    #[must_use]
    pub fn normalised(&self) -> Self {
        let inv_sqrt = self
            .matrix
            .sum_axis(Axis(1))
            .mapv(|degree| degree.max(1.0).sqrt().recip());
        let rows = inv_sqrt.view().insert_axis(Axis(1));
        let cols = inv_sqrt.view().insert_axis(Axis(0));
        Self {
            matrix: &self.matrix * &rows * &cols,
        }
    }

    /// Matrix dimension.
    #[must_use]
    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    /// Report whether the matrix has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }

    /// Entry at `(row, col)`, or `0.0` when out of range.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix.get((row, col)).copied().unwrap_or(0.0)
    }

    /// The `n × n` matrix.
    #[must_use]
    pub const fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }
}
