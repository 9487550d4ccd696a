//! Node scorers for candidate sites.
//!
//! Every strategy implements [`NodeScorer`](siteplan_core::NodeScorer) and
//! returns scores in `[0.0, 1.0]`:
//! - [`WeightedSumScorer`] applies a fixed convex combination of the scaled
//!   features.
//! - [`RidgeDiffusionScorer`] fits a closed-form ridge regression to the
//!   derived target and smooths the predictions over the inverse-distance
//!   candidate graph.
//! - [`GnnScorer`] trains a GCN, GraphSAGE or GAT regressor with Adam and
//!   keeps the weights with the lowest validation error.
//!
//! The learned strategies share [`derive_target`], which prefers observed
//! labels and falls back to a fixed feature blend.
//!
//! # Examples
//!
//! ```
//! use siteplan_core::{NodeScorer, PipelineConfig, ScoringVariant, test_support::grid_table};
//! use siteplan_scorer::build_scorer;
//!
//! let config = PipelineConfig {
//!     variant: ScoringVariant::RidgeDiffusion,
//!     ..PipelineConfig::default()
//! };
//! let scorer = build_scorer(&config);
//! let outcome = scorer.score(&grid_table(10))?;
//! assert_eq!(outcome.metadata.variant, ScoringVariant::RidgeDiffusion);
//! assert!(outcome.base_scores.is_some());
//! # Ok::<(), siteplan_core::ScoringError>(())
//! ```

#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use log::debug;
use siteplan_core::{NodeScorer, PipelineConfig, ScoringVariant};

mod diffusion;
mod gnn;
mod linalg;
mod ridge;
mod target;
mod weighted;

pub use diffusion::diffuse;
pub use gnn::{GnnArchitecture, GnnScorer};
pub use ridge::{RidgeDiffusionScorer, RidgeFit, fit_ridge};
pub use target::{Target, derive_target};
pub use weighted::{FeatureWeights, WeightedSumScorer};

/// Build the scorer selected by `config.variant`.
///
/// Variant identifiers are parsed into [`ScoringVariant`] before this point,
/// so construction cannot fail.
#[must_use]
pub fn build_scorer(config: &PipelineConfig) -> Box<dyn NodeScorer> {
    debug!("building {} scorer", config.variant);
    match config.variant {
        ScoringVariant::WeightedSum => Box::new(WeightedSumScorer::default()),
        ScoringVariant::RidgeDiffusion => Box::new(RidgeDiffusionScorer::new(
            config.ridge.clone(),
            config.edge_radius_km,
        )),
        ScoringVariant::Gcn => gnn_scorer(GnnArchitecture::Gcn, config),
        ScoringVariant::GraphSage => gnn_scorer(GnnArchitecture::GraphSage, config),
        ScoringVariant::Gat => gnn_scorer(GnnArchitecture::Gat, config),
    }
}

fn gnn_scorer(architecture: GnnArchitecture, config: &PipelineConfig) -> Box<dyn NodeScorer> {
    Box::new(GnnScorer::new(
        architecture,
        config.gnn.clone(),
        config.edge_radius_km,
        config.seed,
    ))
}

#[cfg(test)]
mod tests;
