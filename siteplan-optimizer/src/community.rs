//! Connected-component communities over existing and candidate sites.

use geo::Coord;
use log::info;
use petgraph::visit::Dfs;
use siteplan_core::{ExistingSite, FeatureTable, ProximityGraph, ScoreAssignment, mean, percentile};

use crate::coverage::OptimizerError;

/// Percentile of candidate scores a community must reach to be underserved.
pub const UNDERSERVED_SCORE_PERCENTILE: f64 = 0.65;

/// Per-site community membership.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeCluster {
    /// Site identifier.
    pub site_id: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Whether the site already hosts chargers.
    pub is_existing: bool,
    /// Component id in discovery order.
    pub community_id: usize,
    /// Distance to the nearest existing site; zero for existing sites.
    pub distance_to_nearest_existing_km: f64,
    /// Node score; existing sites have none.
    pub node_weight: Option<f64>,
    /// Population score carried from the input, if any.
    pub population_score: Option<f64>,
}

/// Aggregates for one community.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommunitySummary {
    /// Component id in discovery order.
    pub community_id: usize,
    /// Member count.
    pub node_count: usize,
    /// Existing sites among the members.
    pub existing_count: usize,
    /// Mean nearest-existing distance over all members.
    pub mean_distance_to_existing_km: f64,
    /// Mean node score over scored members, or `0.0` without any.
    pub mean_node_weight: f64,
    /// Whether the community is remote or unserved and scores highly.
    pub underserved: bool,
}

/// Output of [`CommunityAnalyzer::analyse`].
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommunityReport {
    /// One row per site, existing sites first.
    pub clusters: Vec<NodeCluster>,
    /// One row per community in id order.
    pub communities: Vec<CommunitySummary>,
    /// Sites in the combined graph.
    pub node_count: usize,
    /// Undirected edges in the combined graph.
    pub edge_count: usize,
    /// Global score cut-off used for the underserved test.
    pub score_cutoff: f64,
}

/// Label each node with the id of its connected component.
///
/// Components are numbered from zero in order of their lowest node index.
/// Traversal is a depth-first walk over the petgraph structure.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use siteplan_core::ProximityGraph;
/// use siteplan_optimizer::connected_components;
///
/// let sites = [
///     Coord { x: 0.0, y: 0.0 },
///     Coord { x: 5.0, y: 0.0 },
///     Coord { x: 0.0, y: 0.001 },
/// ];
/// let graph = ProximityGraph::build(&sites, 1.0);
/// assert_eq!(connected_components(&graph), vec![0, 1, 0]);
/// ```
#[must_use]
pub fn connected_components(graph: &ProximityGraph) -> Vec<usize> {
    let inner = graph.graph();
    let mut labels: Vec<Option<usize>> = vec![None; graph.len()];
    let mut next = 0;
    let mut dfs = Dfs::empty(inner);
    for root in inner.node_indices() {
        if labels.get(root.index()).is_some_and(Option::is_some) {
            continue;
        }
        dfs.move_to(root);
        while let Some(node) = dfs.next(inner) {
            if let Some(slot) = labels.get_mut(node.index()) {
                *slot = Some(next);
            }
        }
        next += 1;
    }
    labels.into_iter().map(Option::unwrap_or_default).collect()
}

/// Partitions sites into proximity communities and flags underserved ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommunityAnalyzer {
    /// Distance in kilometres under which two sites share an edge.
    pub edge_radius_km: f64,
    /// Mean nearest-existing distance at which a community is remote.
    pub underserved_distance_km: f64,
}

#[derive(Debug, Clone, Default)]
struct Members {
    nodes: usize,
    existing: usize,
    distances: Vec<f64>,
    scores: Vec<f64>,
}

impl CommunityAnalyzer {
    /// Create an analyser.
    #[must_use]
    pub const fn new(edge_radius_km: f64, underserved_distance_km: f64) -> Self {
        Self {
            edge_radius_km,
            underserved_distance_km,
        }
    }

    /// Partition `existing` and the candidates of `table` into communities.
    ///
    /// A community is underserved when its mean nearest-existing distance
    /// reaches `underserved_distance_km` or it holds no existing site, and
    /// its mean score reaches the 65th percentile of all candidate scores.
    ///
    /// # Errors
    /// Returns [`OptimizerError::ScoreCountMismatch`] when `scores` does not
    /// cover exactly the candidates in `table`.
    pub fn analyse(
        &self,
        existing: &[ExistingSite],
        table: &FeatureTable,
        scores: &ScoreAssignment,
    ) -> Result<CommunityReport, OptimizerError> {
        if scores.len() != table.len() {
            return Err(OptimizerError::ScoreCountMismatch {
                candidates: table.len(),
                scores: scores.len(),
            });
        }

        let locations: Vec<Coord<f64>> = existing
            .iter()
            .map(ExistingSite::location)
            .chain(table.locations())
            .collect();
        let graph = ProximityGraph::build(&locations, self.edge_radius_km);
        let labels = connected_components(&graph);

        let existing_rows = existing.iter().map(|site| NodeCluster {
            site_id: site.site_id.clone(),
            lat: site.lat,
            lon: site.lon,
            is_existing: true,
            community_id: 0,
            distance_to_nearest_existing_km: 0.0,
            node_weight: None,
            population_score: None,
        });
        let candidate_rows = table.iter().zip(scores.scores()).map(|(c, &score)| NodeCluster {
            site_id: c.site.site_id.clone(),
            lat: c.site.lat,
            lon: c.site.lon,
            is_existing: false,
            community_id: 0,
            distance_to_nearest_existing_km: c.nearest_existing_km,
            node_weight: Some(score),
            population_score: c.site.population_score,
        });
        let clusters: Vec<NodeCluster> = existing_rows
            .chain(candidate_rows)
            .zip(&labels)
            .map(|(row, &community_id)| NodeCluster {
                community_id,
                ..row
            })
            .collect();

        let score_cutoff = percentile(scores.scores(), UNDERSERVED_SCORE_PERCENTILE);
        let communities = self.summarise(&clusters, score_cutoff);
        info!(
            "{} sites with {} edges form {} communities, {} underserved",
            graph.len(),
            graph.edge_count(),
            communities.len(),
            communities.iter().filter(|c| c.underserved).count()
        );
        Ok(CommunityReport {
            clusters,
            communities,
            node_count: graph.len(),
            edge_count: graph.edge_count(),
            score_cutoff,
        })
    }

    fn summarise(&self, clusters: &[NodeCluster], score_cutoff: f64) -> Vec<CommunitySummary> {
        let count = clusters
            .iter()
            .map(|row| row.community_id)
            .max()
            .map_or(0, |top| top + 1);
        let mut members = vec![Members::default(); count];
        for row in clusters {
            let Some(group) = members.get_mut(row.community_id) else {
                continue;
            };
            group.nodes += 1;
            if row.is_existing {
                group.existing += 1;
            }
            group.distances.push(row.distance_to_nearest_existing_km);
            group.scores.extend(row.node_weight);
        }

        members
            .into_iter()
            .enumerate()
            .map(|(community_id, group)| {
                let mean_distance_to_existing_km = mean(&group.distances);
                let mean_node_weight = mean(&group.scores);
                let remote = mean_distance_to_existing_km >= self.underserved_distance_km
                    || group.existing == 0;
                CommunitySummary {
                    community_id,
                    node_count: group.nodes,
                    existing_count: group.existing,
                    mean_distance_to_existing_km,
                    mean_node_weight,
                    underserved: remote && mean_node_weight >= score_cutoff,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use siteplan_core::{CandidateSite, FeatureEngineer};

    struct Scene {
        existing: Vec<ExistingSite>,
        table: FeatureTable,
        scores: ScoreAssignment,
    }

    /// An existing site with one nearby candidate, and a remote pair of
    /// candidates more than 100 km away.
    #[fixture]
    fn scene() -> Scene {
        let existing = vec![ExistingSite::new("EX_1", 0.0, 0.0)];
        let candidates = [
            CandidateSite::new("CA_NEAR", 0.0, 0.01).with_raw_features(1.0, 1.0, 1.0),
            CandidateSite::new("CA_FAR_1", 1.0, 1.0).with_raw_features(2.0, 2.0, 2.0),
            CandidateSite::new("CA_FAR_2", 1.0, 1.01).with_raw_features(3.0, 3.0, 3.0),
        ];
        let table = FeatureEngineer::new(2.0)
            .engineer(&existing, &candidates)
            .expect("existing site present");
        let scores = ScoreAssignment::new(&table, &[0.1, 0.8, 1.0]).expect("aligned scores");
        Scene {
            existing,
            table,
            scores,
        }
    }

    #[rstest]
    fn components_follow_proximity(scene: Scene) {
        let report = CommunityAnalyzer::new(3.0, 2.2)
            .analyse(&scene.existing, &scene.table, &scene.scores)
            .expect("aligned");
        let ids: Vec<usize> = report.clusters.iter().map(|c| c.community_id).collect();
        assert_eq!(ids, vec![0, 0, 1, 1]);
        assert_eq!(report.node_count, 4);
        assert_eq!(report.edge_count, 2);
    }

    #[rstest]
    fn remote_high_scoring_community_is_underserved(scene: Scene) {
        let report = CommunityAnalyzer::new(3.0, 2.2)
            .analyse(&scene.existing, &scene.table, &scene.scores)
            .expect("aligned");
        let [served, remote] = report.communities.as_slice() else {
            panic!("expected two communities, got {:?}", report.communities);
        };
        assert_eq!((served.node_count, served.existing_count), (2, 1));
        assert!(!served.underserved);
        assert_eq!((remote.node_count, remote.existing_count), (2, 0));
        assert!(remote.underserved);
        assert_eq!(report.score_cutoff, 0.8);
    }

    #[rstest]
    fn existing_sites_carry_no_score(scene: Scene) {
        let report = CommunityAnalyzer::new(3.0, 2.2)
            .analyse(&scene.existing, &scene.table, &scene.scores)
            .expect("aligned");
        let existing = report.clusters.first().expect("existing row first");
        assert!(existing.is_existing);
        assert_eq!(existing.node_weight, None);
        assert_eq!(existing.distance_to_nearest_existing_km, 0.0);
        // The served community's mean score covers only its candidate.
        assert_eq!(report.communities.first().map(|c| c.mean_node_weight), Some(0.1));
    }

    #[rstest]
    fn empty_candidates_still_partition_existing_sites() {
        let existing = vec![
            ExistingSite::new("EX_1", 0.0, 0.0),
            ExistingSite::new("EX_2", 5.0, 5.0),
        ];
        let report = CommunityAnalyzer::new(3.0, 2.2)
            .analyse(&existing, &FeatureTable::default(), &ScoreAssignment::default())
            .expect("aligned");
        assert_eq!(report.communities.len(), 2);
        assert!(report.communities.iter().all(|c| !c.underserved));
    }

    #[rstest]
    fn isolated_nodes_get_their_own_component() {
        let sites = [Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }];
        let graph = ProximityGraph::build(&sites, 1.0);
        assert_eq!(connected_components(&graph), vec![0, 1]);
    }
}
