//! Core domain types for the siteplan engine.
//!
//! The crate holds everything the scoring and optimisation stages share:
//! - site records for existing and candidate facilities,
//! - the haversine distance primitive and the proximity graph variants built
//!   on it,
//! - batch feature engineering and min-max scaling,
//! - the [`NodeScorer`] capability together with [`ScoringVariant`] and the
//!   per-run [`PipelineConfig`].
//!
//! # Examples
//!
//! ```
//! use siteplan_core::{CandidateSite, ExistingSite, FeatureEngineer, ProximityGraph};
//!
//! let existing = [ExistingSite::new("EX_1", 30.26, -97.74)];
//! let candidates = [
//!     CandidateSite::new("CA_1", 30.27, -97.74).with_raw_features(80.0, 40.0, 60.0),
//!     CandidateSite::new("CA_2", 30.30, -97.70).with_raw_features(20.0, 10.0, 90.0),
//! ];
//! let table = FeatureEngineer::new(2.0).engineer(&existing, &candidates)?;
//! let graph = ProximityGraph::build(&table.locations(), 3.0);
//! assert_eq!(graph.len(), 2);
//! # Ok::<(), siteplan_core::FeatureError>(())
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
mod features;
mod geodesy;
mod graph;
mod scorer;
mod site;
mod stats;
mod variant;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(all(docsrs, not(test)), doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use config::{ConfigError, GnnConfig, PipelineConfig, RidgeConfig};
pub use features::{
    EngineeredCandidate, FEATURE_COUNT, Feature, FeatureEngineer, FeatureError, FeatureTable,
    FeatureVector,
};
pub use geodesy::{DistanceMatrix, EARTH_RADIUS_KM, haversine_km};
pub use graph::{AFFINITY_EPSILON_KM, DenseAdjacency, ProximityGraph, WeightedProximityGraph};
pub use scorer::{
    ModelMetadata, NodeScorer, ScoreAssignment, ScoreOutcome, ScoringError, TargetSource,
    sanitise,
};
pub use site::{CandidateSite, ExistingSite, SiteInventory, TargetLabels};
pub use stats::{mean, min_max_scale, percentile, rank_index};
pub use variant::ScoringVariant;
