//! Deterministic site fixtures shared by unit, behaviour and property tests.
//!
//! Candidates are laid out along the equator so distances are easy to reason
//! about: `0.01` degrees of longitude is roughly 1.11 km.

use crate::features::{FeatureEngineer, FeatureTable};
use crate::site::{CandidateSite, ExistingSite};

/// Longitude step between consecutive fixture candidates, in degrees.
pub const CANDIDATE_SPACING_DEG: f64 = 0.01;

/// A single existing site far from every fixture candidate.
#[must_use]
pub fn remote_existing() -> Vec<ExistingSite> {
    vec![ExistingSite::new("EX_REMOTE", 1.0, 0.0)]
}

/// `n` candidates spaced [`CANDIDATE_SPACING_DEG`] apart with varied raw
/// features.
///
/// Raw values come from low-discrepancy sequences so every column spans a
/// non-degenerate range once `n >= 3`.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "fixture coordinates and features are derived from the index"
)]
pub fn line_candidates(n: usize) -> Vec<CandidateSite> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            CandidateSite::new(format!("CA_{i:03}"), 0.0, t * CANDIDATE_SPACING_DEG)
                .with_raw_features(
                    (t * 0.618_034).fract() * 100.0,
                    (t * 0.414_214).fract() * 50.0,
                    (t * 0.732_051).fract() * 80.0,
                )
        })
        .collect()
}

/// Engineer [`line_candidates`] against [`remote_existing`].
#[must_use]
pub fn grid_table(n: usize) -> FeatureTable {
    FeatureEngineer::new(2.0)
        .engineer(&remote_existing(), &line_candidates(n))
        .unwrap_or_default()
}
