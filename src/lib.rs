//! Facade crate for the siteplan engine.
//!
//! This crate re-exports the core domain types, the scoring strategies and
//! the coverage planner, and ties them together in [`Pipeline`].

#![forbid(unsafe_code)]

mod pipeline;

pub use pipeline::{GraphSummary, NodeScore, Pipeline, PipelineError, PlanReport};

pub use siteplan_core::{
    CandidateSite, ConfigError, ExistingSite, Feature, FeatureError, FeatureTable, GnnConfig,
    ModelMetadata, NodeScorer, PipelineConfig, RidgeConfig, ScoreAssignment, ScoreOutcome,
    ScoringError, ScoringVariant, SiteInventory, TargetLabels, TargetSource,
};
pub use siteplan_optimizer::{
    CommunityAnalyzer, CommunitySummary, CoverageOptimizer, CoveragePlan, NodeCluster,
    OptimizerError, Recommendation, ScenarioSummary, ServiceRadius, tune_service_radius,
};
pub use siteplan_scorer::{GnnArchitecture, GnnScorer, RidgeDiffusionScorer, WeightedSumScorer, build_scorer};
