//! End-to-end planning run.

use log::info;
use siteplan_core::{
    CandidateSite, ConfigError, ExistingSite, FeatureEngineer, FeatureError, FeatureTable,
    ModelMetadata, NodeScorer, PipelineConfig, ScoreOutcome, ScoringError,
};
use siteplan_optimizer::{
    CommunityAnalyzer, CommunitySummary, CoverageOptimizer, NodeCluster, OptimizerError,
    Recommendation, ScenarioSummary, ServiceRadius, tune_service_radius,
};
use siteplan_scorer::build_scorer;
use thiserror::Error;

/// Errors returned by [`Pipeline`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Configuration was rejected before any work began.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Features could not be engineered.
    #[error(transparent)]
    Feature(#[from] FeatureError),
    /// The scoring stage failed.
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    /// Optimiser inputs disagreed.
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),
}

/// Per-candidate scoring detail.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeScore {
    /// Candidate identifier.
    pub site_id: String,
    /// Score before graph smoothing, for strategies that smooth.
    pub base_score: Option<f64>,
    /// Final node score.
    pub node_score: f64,
    /// Demand weight used by the optimiser.
    pub demand_weight: f64,
    /// Population score carried from the input, if any.
    pub population_score: Option<f64>,
}

/// Size of the combined existing and candidate graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphSummary {
    /// Sites in the graph.
    pub nodes: usize,
    /// Undirected edges.
    pub edges: usize,
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanReport {
    /// Ranked recommendations for the configured recommendation budget.
    pub recommendations: Vec<Recommendation>,
    /// One summary per configured scenario budget.
    pub scenarios: Vec<ScenarioSummary>,
    /// Community membership of every site.
    pub clusters: Vec<NodeCluster>,
    /// Aggregates per community.
    pub communities: Vec<CommunitySummary>,
    /// Per-candidate scores.
    pub node_scores: Vec<NodeScore>,
    /// Scoring model description.
    pub model: ModelMetadata,
    /// Combined graph size.
    pub graph: GraphSummary,
    /// Service radius used for coverage.
    pub service_radius: ServiceRadius,
}

/// Orchestrates feature engineering, scoring, coverage planning and
/// community analysis for one configuration.
///
/// # Examples
/// ```
/// use siteplan_engine::{ExistingSite, Pipeline, PipelineConfig, ScoringVariant};
/// use siteplan_core::test_support::line_candidates;
///
/// let config = PipelineConfig {
///     variant: ScoringVariant::WeightedSum,
///     ..PipelineConfig::default()
/// };
/// let pipeline = Pipeline::new(config)?;
/// let existing = [ExistingSite::new("EX_1", 0.05, 0.0)];
/// let report = pipeline.run(&existing, &line_candidates(20))?;
/// assert_eq!(report.node_scores.len(), 20);
/// assert_eq!(report.scenarios.len(), 3);
/// # Ok::<(), siteplan_engine::PipelineError>(())
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    scorer: Box<dyn NodeScorer>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("variant", &self.scorer.variant())
            .finish()
    }
}

impl Pipeline {
    /// Validate `config` and build its scorer.
    ///
    /// # Errors
    /// Returns [`PipelineError::Config`] when a parameter is out of range.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let scorer = build_scorer(&config);
        Ok(Self { config, scorer })
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage over one inventory.
    ///
    /// An empty candidate list yields empty recommendations and scores; the
    /// existing sites still form communities.
    ///
    /// # Errors
    /// Returns [`PipelineError::Feature`] when `existing` is empty and
    /// [`PipelineError::Scoring`] when training diverges.
    pub fn run(
        &self,
        existing: &[ExistingSite],
        candidates: &[CandidateSite],
    ) -> Result<PlanReport, PipelineError> {
        let config = &self.config;
        let table = FeatureEngineer::new(config.density_radius_km).engineer(existing, candidates)?;
        info!(
            "engineered {} candidates against {} existing sites",
            table.len(),
            existing.len()
        );

        let outcome = self.scorer.score(&table)?;
        let radius = tune_service_radius(
            &table.nearest_existing_km(),
            config.service_radius_km,
            config.min_uncovered_ratio,
        );

        let optimizer = CoverageOptimizer::new(&table, &outcome.assignment, radius)?;
        let largest = config
            .scenario_budgets
            .iter()
            .copied()
            .chain([config.recommendation_budget])
            .max()
            .unwrap_or(config.recommendation_budget);
        let plan = optimizer.plan(largest);

        let communities = CommunityAnalyzer::new(config.edge_radius_km, config.underserved_distance_km)
            .analyse(existing, &table, &outcome.assignment)?;

        Ok(PlanReport {
            recommendations: plan.top(config.recommendation_budget).to_vec(),
            scenarios: config
                .scenario_budgets
                .iter()
                .map(|&budget| plan.scenario(budget))
                .collect(),
            node_scores: node_scores(&table, &outcome),
            graph: GraphSummary {
                nodes: communities.node_count,
                edges: communities.edge_count,
            },
            clusters: communities.clusters,
            communities: communities.communities,
            model: outcome.metadata,
            service_radius: radius,
        })
    }
}

fn node_scores(table: &FeatureTable, outcome: &ScoreOutcome) -> Vec<NodeScore> {
    let base = outcome.base_scores.as_deref().unwrap_or_default();
    table
        .iter()
        .zip(outcome.assignment.scores())
        .enumerate()
        .map(|(idx, (candidate, &node_score))| NodeScore {
            site_id: candidate.site.site_id.clone(),
            base_score: base.get(idx).copied(),
            node_score,
            demand_weight: candidate.demand_weight,
            population_score: candidate.site.population_score,
        })
        .collect()
}
