//! Greedy maximum-coverage selection of new sites.
//!
//! Each round scans every unselected candidate and values it by the demand it
//! would newly cover, scaled by its node score. The highest-valued candidate is
//! selected and its service area marked covered. Selections are then replayed
//! from the baseline to report per-rank gains and cumulative coverage.

use log::{debug, info, warn};
use siteplan_core::{DistanceMatrix, FeatureTable, ScoreAssignment};
use thiserror::Error;

use crate::radius::ServiceRadius;

/// Share of a candidate's value that does not depend on its score.
pub const SCORE_FLOOR: f64 = 0.7;
/// Share of a candidate's value scaled by its score.
pub const SCORE_WEIGHT: f64 = 0.3;

/// One selected site in rank order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Recommendation {
    /// 1-based selection order.
    pub rank: usize,
    /// Candidate identifier.
    pub site_id: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Node score of the candidate.
    pub node_weight: f64,
    /// Population score carried from the input, if any.
    pub population_score: Option<f64>,
    /// Demand weight newly covered by this selection.
    pub marginal_demand_gain: f64,
    /// Share of candidates covered after this selection.
    pub cumulative_coverage: f64,
}

/// Aggregate outcome of adding up to `stations_added` sites.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioSummary {
    /// Requested budget.
    pub stations_added: usize,
    /// Number of sites actually selected.
    pub selected_sites: usize,
    /// Coverage after the last selection, or the baseline when none were made.
    pub coverage_ratio: f64,
    /// Sum of marginal demand gains over the selections.
    pub aggregate_marginal_demand_gain: f64,
    /// Coverage before any selection.
    pub baseline_coverage_ratio: f64,
    /// Service radius used, in kilometres.
    pub effective_service_radius_km: f64,
}

/// Ranked selections for one budget.
///
/// Greedy rounds depend only on earlier selections, so the first `k` entries
/// of a plan are exactly the plan for budget `k`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoveragePlan {
    /// Selections in rank order.
    pub recommendations: Vec<Recommendation>,
    /// Coverage before any selection.
    pub baseline_coverage: f64,
    /// Service radius used.
    pub service_radius: ServiceRadius,
}

impl CoveragePlan {
    /// Summarise the first `budget` selections.
    #[must_use]
    pub fn scenario(&self, budget: usize) -> ScenarioSummary {
        let taken = self
            .recommendations
            .get(..budget.min(self.recommendations.len()))
            .unwrap_or_default();
        ScenarioSummary {
            stations_added: budget,
            selected_sites: taken.len(),
            coverage_ratio: taken
                .last()
                .map_or(self.baseline_coverage, |r| r.cumulative_coverage),
            aggregate_marginal_demand_gain: taken.iter().map(|r| r.marginal_demand_gain).sum(),
            baseline_coverage_ratio: self.baseline_coverage,
            effective_service_radius_km: self.service_radius.radius_km,
        }
    }

    /// The first `budget` selections.
    #[must_use]
    pub fn top(&self, budget: usize) -> &[Recommendation] {
        self.recommendations
            .get(..budget.min(self.recommendations.len()))
            .unwrap_or_default()
    }
}

/// Errors raised when optimiser inputs disagree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizerError {
    /// Scores were produced for a different candidate batch.
    #[error("{candidates} candidates but {scores} scores")]
    ScoreCountMismatch {
        /// Candidates in the feature table.
        candidates: usize,
        /// Entries in the score assignment.
        scores: usize,
    },
}

/// Greedy coverage optimiser over one candidate batch.
///
/// Coverage is tracked in a flag per candidate that starts `true` for
/// candidates already within the service radius of an existing site and
/// never reverts.
///
/// # Examples
/// ```
/// use siteplan_core::{ScoreAssignment, test_support::grid_table};
/// use siteplan_optimizer::{CoverageOptimizer, ServiceRadius};
///
/// let table = grid_table(10);
/// let scores = ScoreAssignment::new(&table, &[0.5; 10])?;
/// let optimizer = CoverageOptimizer::new(&table, &scores, ServiceRadius::fixed(2.5))?;
/// let plan = optimizer.plan(3);
/// assert!(plan.recommendations.len() <= 3);
/// assert_eq!(plan.recommendations.first().map(|r| r.rank), Some(1));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct CoverageOptimizer<'a> {
    table: &'a FeatureTable,
    scores: &'a [f64],
    demand: Vec<f64>,
    distances: DistanceMatrix,
    radius: ServiceRadius,
}

impl<'a> CoverageOptimizer<'a> {
    /// Prepare the candidate distance table for `table`.
    ///
    /// # Errors
    /// Returns [`OptimizerError::ScoreCountMismatch`] when `scores` does not
    /// cover exactly the candidates in `table`.
    pub fn new(
        table: &'a FeatureTable,
        scores: &'a ScoreAssignment,
        radius: ServiceRadius,
    ) -> Result<Self, OptimizerError> {
        if scores.len() != table.len() {
            return Err(OptimizerError::ScoreCountMismatch {
                candidates: table.len(),
                scores: scores.len(),
            });
        }
        Ok(Self {
            table,
            scores: scores.scores(),
            demand: table.demand_weights(),
            distances: DistanceMatrix::square(&table.locations()),
            radius,
        })
    }

    /// Service radius in use.
    #[must_use]
    pub const fn service_radius(&self) -> &ServiceRadius {
        &self.radius
    }

    /// Coverage flags before any selection.
    #[must_use]
    pub fn baseline(&self) -> Vec<bool> {
        self.table
            .iter()
            .map(|c| c.nearest_existing_km <= self.radius.radius_km)
            .collect()
    }

    /// Select up to `budget` candidate indices in greedy order.
    ///
    /// Each round picks the candidate with the strictly largest
    /// `uncovered demand × (0.7 + 0.3 × score)`; the lowest index wins ties.
    /// Selection stops early once no candidate adds positive value.
    #[must_use]
    pub fn select(&self, budget: usize) -> Vec<usize> {
        let rounds = budget.min(self.table.len());
        let mut covered = self.baseline();
        let mut chosen = vec![false; self.table.len()];
        let mut selected = Vec::with_capacity(rounds);

        for round in 0..rounds {
            let best = chosen
                .iter()
                .enumerate()
                .filter(|&(_, &taken)| !taken)
                .map(|(site, _)| (site, self.value(site, &covered)))
                .fold(None, |best: Option<(usize, f64)>, (site, value)| {
                    if best.is_none_or(|(_, top)| value > top) {
                        Some((site, value))
                    } else {
                        best
                    }
                });
            let Some((site, value)) = best.filter(|&(_, value)| value > 0.0) else {
                warn!("no candidate adds uncovered demand; stopping after {round} of {rounds}");
                break;
            };
            debug!("round {round}: selected candidate {site} with value {value:.4}");
            if let Some(flag) = chosen.get_mut(site) {
                *flag = true;
            }
            self.mark(site, &mut covered);
            selected.push(site);
        }
        selected
    }

    /// Replay `selected` from the baseline, reporting the demand each
    /// selection newly covers and the coverage reached.
    #[must_use]
    pub fn replay(&self, selected: &[usize]) -> Vec<Recommendation> {
        let mut covered = self.baseline();
        selected
            .iter()
            .zip(1..)
            .filter_map(|(&site, rank)| {
                let candidate = self.table.candidates().get(site)?;
                let marginal_demand_gain = self.uncovered_demand(site, &covered);
                self.mark(site, &mut covered);
                Some(Recommendation {
                    rank,
                    site_id: candidate.site.site_id.clone(),
                    lat: candidate.site.lat,
                    lon: candidate.site.lon,
                    node_weight: self.scores.get(site).copied().unwrap_or(0.0),
                    population_score: candidate.site.population_score,
                    marginal_demand_gain,
                    cumulative_coverage: coverage_ratio(&covered),
                })
            })
            .collect()
    }

    /// Greedy selection for `budget` followed by its replay.
    #[must_use]
    pub fn plan(&self, budget: usize) -> CoveragePlan {
        let recommendations = self.replay(&self.select(budget));
        let baseline_coverage = coverage_ratio(&self.baseline());
        info!(
            "selected {} of {budget} sites at {:.3} km; coverage {baseline_coverage:.3} -> {:.3}",
            recommendations.len(),
            self.radius.radius_km,
            recommendations
                .last()
                .map_or(baseline_coverage, |r| r.cumulative_coverage)
        );
        CoveragePlan {
            recommendations,
            baseline_coverage,
            service_radius: self.radius,
        }
    }

    /// Summaries for each budget, computed from one plan for the largest.
    #[must_use]
    pub fn scenarios(&self, budgets: &[usize]) -> Vec<ScenarioSummary> {
        let largest = budgets.iter().copied().max().unwrap_or(0);
        let plan = self.plan(largest);
        budgets.iter().map(|&budget| plan.scenario(budget)).collect()
    }

    fn within(&self, site: usize) -> impl Iterator<Item = bool> + '_ {
        self.distances
            .row(site)
            .iter()
            .map(|&d| d <= self.radius.radius_km)
    }

    fn uncovered_demand(&self, site: usize, covered: &[bool]) -> f64 {
        self.within(site)
            .zip(covered)
            .zip(&self.demand)
            .filter(|&((reachable, &done), _)| reachable && !done)
            .map(|(_, &weight)| weight)
            .sum()
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "site value scales uncovered demand by score"
    )]
    fn value(&self, site: usize, covered: &[bool]) -> f64 {
        let score = self.scores.get(site).copied().unwrap_or(0.0);
        self.uncovered_demand(site, covered) * (SCORE_FLOOR + SCORE_WEIGHT * score)
    }

    fn mark(&self, site: usize, covered: &mut [bool]) {
        for (flag, reachable) in covered.iter_mut().zip(self.within(site)) {
            *flag |= reachable;
        }
    }
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "coverage is a ratio of candidate counts"
)]
fn coverage_ratio(covered: &[bool]) -> f64 {
    if covered.is_empty() {
        return 0.0;
    }
    covered.iter().filter(|&&c| c).count() as f64 / covered.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use siteplan_core::test_support::grid_table;
    use siteplan_core::{CandidateSite, ExistingSite, FeatureEngineer};

    /// Three candidates: two about 1.1 km apart and one more than 100 km
    /// away, with an existing site out of range of all of them.
    fn worked_example() -> FeatureTable {
        let existing = [ExistingSite::new("EX_FAR", 10.0, 10.0)];
        let candidates = [
            CandidateSite::new("CA_A", 0.0, 0.0).with_raw_features(50.0, 5.0, 50.0),
            CandidateSite::new("CA_B", 0.0, 0.01).with_raw_features(60.0, 5.0, 60.0),
            CandidateSite::new("CA_C", 1.0, 1.0).with_raw_features(10.0, 5.0, 10.0),
        ];
        FeatureEngineer::new(2.0)
            .engineer(&existing, &candidates)
            .expect("existing site present")
    }

    #[rstest]
    #[expect(
        clippy::float_arithmetic,
        reason = "test uses float maths for assertions"
    )]
    fn worked_example_selects_best_of_the_pair() {
        let table = worked_example();
        let scores = ScoreAssignment::new(&table, &[0.2, 0.9, 1.0]).expect("aligned scores");
        let optimizer =
            CoverageOptimizer::new(&table, &scores, ServiceRadius::fixed(2.5)).expect("aligned");

        let plan = optimizer.plan(1);

        let [first] = plan.recommendations.as_slice() else {
            panic!("expected one recommendation, got {:?}", plan.recommendations);
        };
        assert_eq!(first.site_id, "CA_B");
        assert_eq!(first.rank, 1);
        assert!((first.cumulative_coverage - 2.0 / 3.0).abs() < 1e-12);
        // Demand weights are 0.8 and 1.0 for the pair.
        assert!((first.marginal_demand_gain - 1.8).abs() < 1e-12);
        assert_eq!(plan.baseline_coverage, 0.0);
    }

    /// The same three candidates with the existing site on top of `CA_A`.
    fn colocated_example() -> FeatureTable {
        let existing = [ExistingSite::new("EX_ORIGIN", 0.0, 0.0)];
        let candidates = [
            CandidateSite::new("CA_A", 0.0, 0.0).with_raw_features(50.0, 5.0, 50.0),
            CandidateSite::new("CA_B", 0.0, 0.01).with_raw_features(60.0, 5.0, 60.0),
            CandidateSite::new("CA_C", 1.0, 1.0).with_raw_features(10.0, 5.0, 10.0),
        ];
        FeatureEngineer::new(2.0)
            .engineer(&existing, &candidates)
            .expect("existing site present")
    }

    #[rstest]
    #[expect(
        clippy::float_arithmetic,
        reason = "test uses float maths for assertions"
    )]
    fn colocated_existing_site_leaves_its_neighbour_to_select() {
        let table = colocated_example();
        let scores = ScoreAssignment::new(&table, &[0.2, 0.9, 1.0]).expect("aligned scores");
        // Narrower than the 1.1 km gap, so the existing site covers only CA_A.
        let optimizer =
            CoverageOptimizer::new(&table, &scores, ServiceRadius::fixed(0.5)).expect("aligned");

        let plan = optimizer.plan(1);

        assert!((plan.baseline_coverage - 1.0 / 3.0).abs() < 1e-12);
        let [first] = plan.recommendations.as_slice() else {
            panic!("expected one recommendation, got {:?}", plan.recommendations);
        };
        assert_eq!(first.site_id, "CA_B");
        assert!((first.marginal_demand_gain - 1.0).abs() < 1e-12);
        assert!((first.cumulative_coverage - 2.0 / 3.0).abs() < 1e-12);
        assert!((plan.scenario(1).coverage_ratio - 2.0 / 3.0).abs() < 1e-12);
    }

    #[rstest]
    #[expect(
        clippy::float_arithmetic,
        reason = "test uses float maths for assertions"
    )]
    fn colocated_existing_site_covering_the_pair_leaves_nothing_to_gain() {
        let table = colocated_example();
        let scores = ScoreAssignment::new(&table, &[0.2, 0.9, 1.0]).expect("aligned scores");
        let optimizer =
            CoverageOptimizer::new(&table, &scores, ServiceRadius::fixed(2.5)).expect("aligned");

        // CA_A and CA_B start covered and CA_C carries zero demand weight.
        let plan = optimizer.plan(1);

        assert!((plan.baseline_coverage - 2.0 / 3.0).abs() < 1e-12);
        assert!(plan.recommendations.is_empty());
        let summary = plan.scenario(1);
        assert_eq!(summary.selected_sites, 0);
        assert!((summary.coverage_ratio - 2.0 / 3.0).abs() < 1e-12);
    }

    #[rstest]
    fn exact_ties_go_to_the_lowest_index() {
        let table = worked_example();
        let scores = ScoreAssignment::new(&table, &[0.5, 0.5, 0.5]).expect("aligned scores");
        let optimizer =
            CoverageOptimizer::new(&table, &scores, ServiceRadius::fixed(2.5)).expect("aligned");
        assert_eq!(optimizer.select(1), vec![0]);
    }

    #[rstest]
    fn selection_stops_when_nothing_is_left_to_cover() {
        let table = worked_example();
        let scores = ScoreAssignment::new(&table, &[0.5, 0.5, 0.5]).expect("aligned scores");
        let optimizer =
            CoverageOptimizer::new(&table, &scores, ServiceRadius::fixed(2.5)).expect("aligned");
        // CA_C has zero demand weight, so only the pair adds value.
        let plan = optimizer.plan(3);
        assert_eq!(plan.recommendations.len(), 1);
        assert_eq!(plan.scenario(3).selected_sites, 1);
    }

    #[rstest]
    fn scenarios_are_prefixes_of_the_largest_plan() {
        let table = grid_table(30);
        let raw: Vec<f64> = table.iter().map(|c| c.features.traffic).collect();
        let scores = ScoreAssignment::new(&table, &raw).expect("aligned scores");
        let optimizer =
            CoverageOptimizer::new(&table, &scores, ServiceRadius::fixed(1.5)).expect("aligned");

        let summaries = optimizer.scenarios(&[2, 4]);
        let direct = optimizer.plan(2);

        assert_eq!(summaries.first(), Some(&direct.scenario(2)));
        assert_eq!(optimizer.replay(&optimizer.select(4)).get(..2), Some(direct.top(2)));
    }

    #[rstest]
    fn empty_batch_yields_empty_plan() {
        let table = FeatureTable::default();
        let scores = ScoreAssignment::default();
        let optimizer =
            CoverageOptimizer::new(&table, &scores, ServiceRadius::fixed(2.5)).expect("aligned");
        let plan = optimizer.plan(10);
        assert!(plan.recommendations.is_empty());
        assert_eq!(plan.scenario(10).coverage_ratio, 0.0);
    }

    #[rstest]
    fn mismatched_scores_are_rejected() {
        let table = grid_table(3);
        let scores = ScoreAssignment::default();
        assert_eq!(
            CoverageOptimizer::new(&table, &scores, ServiceRadius::fixed(2.5)).err(),
            Some(OptimizerError::ScoreCountMismatch {
                candidates: 3,
                scores: 0
            })
        );
    }
}
