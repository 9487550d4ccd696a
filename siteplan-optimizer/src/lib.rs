//! Coverage planning over scored candidate sites.
//!
//! This crate turns a scored candidate batch into placement decisions:
//! - [`tune_service_radius`] shrinks the configured radius when existing
//!   sites already cover too much of the batch.
//! - [`CoverageOptimizer`] greedily selects new sites that cover the most
//!   uncovered demand, biased by node score, and summarises budget
//!   scenarios.
//! - [`CommunityAnalyzer`] partitions existing and candidate sites into
//!   proximity communities and flags the underserved ones.
//!
//! The greedy objective multiplies covered demand by `0.7 + 0.3 × score`, so
//! it is not submodular; only non-decreasing coverage is guaranteed.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod community;
mod coverage;
mod radius;

pub use community::{
    CommunityAnalyzer, CommunityReport, CommunitySummary, NodeCluster,
    UNDERSERVED_SCORE_PERCENTILE, connected_components,
};
pub use coverage::{
    CoverageOptimizer, CoveragePlan, OptimizerError, Recommendation, SCORE_FLOOR, SCORE_WEIGHT,
    ScenarioSummary,
};
pub use radius::{MIN_SERVICE_RADIUS_KM, ServiceRadius, tune_service_radius};
