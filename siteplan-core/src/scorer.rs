//! Score candidate sites from their engineered features.
//!
//! The [`NodeScorer`] trait is the capability every scoring strategy
//! implements: given a [`FeatureTable`] it returns one score per candidate in
//! `[0.0, 1.0]` together with [`ModelMetadata`] describing how the scores
//! were produced.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::features::{Feature, FeatureTable};
use crate::variant::ScoringVariant;

/// Which column supervised a learned scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum TargetSource {
    /// Externally supplied impact label.
    TargetImpact,
    /// Historical charging session counts.
    HistoricalSessions,
    /// Observed utilisation.
    Utilization,
    /// Fixed linear blend of scaled features.
    #[cfg_attr(feature = "serde", serde(rename = "proxy_target"))]
    Proxy,
}

impl TargetSource {
    /// Return the source name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TargetImpact => "target_impact",
            Self::HistoricalSessions => "historical_sessions",
            Self::Utilization => "utilization",
            Self::Proxy => "proxy_target",
        }
    }
}

impl std::fmt::Display for TargetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of the model behind a [`ScoreOutcome`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelMetadata {
    /// Strategy that produced the scores.
    pub variant: ScoringVariant,
    /// Feature columns consumed, in model order.
    pub feature_names: Vec<String>,
    /// Supervision target, for learned strategies.
    pub target_source: Option<TargetSource>,
    /// Hyperparameters in effect.
    pub hyperparameters: BTreeMap<String, f64>,
    /// Fitted linear coefficients keyed by column, intercept included.
    pub coefficients: Option<BTreeMap<String, f64>>,
    /// Best validation mean squared error reached during training.
    pub validation_mse: Option<f64>,
}

impl ModelMetadata {
    /// Metadata for `variant` over the canonical feature columns.
    #[must_use]
    pub fn new(variant: ScoringVariant) -> Self {
        Self {
            variant,
            feature_names: Feature::names(),
            target_source: None,
            hyperparameters: BTreeMap::new(),
            coefficients: None,
            validation_mse: None,
        }
    }

    /// Record a hyperparameter.
    #[must_use]
    pub fn with_hyperparameter(mut self, name: &str, value: f64) -> Self {
        self.hyperparameters.insert(name.to_owned(), value);
        self
    }

    /// Record the supervision target.
    #[must_use]
    pub fn with_target(mut self, source: TargetSource) -> Self {
        self.target_source = Some(source);
        self
    }
}

/// Mapping from candidate `site_id` to its score in `[0.0, 1.0]`.
///
/// Entries keep the candidate order of the [`FeatureTable`] they were built
/// from.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreAssignment {
    site_ids: Vec<String>,
    scores: Vec<f64>,
}

impl ScoreAssignment {
    /// Pair `scores` with the candidates of `table`, sanitising each value.
    ///
    /// # Errors
    /// Returns [`ScoringError::LengthMismatch`] when the score count differs
    /// from the candidate count.
    pub fn new(table: &FeatureTable, scores: &[f64]) -> Result<Self, ScoringError> {
        if scores.len() != table.len() {
            return Err(ScoringError::LengthMismatch {
                expected: table.len(),
                actual: scores.len(),
            });
        }
        Ok(Self {
            site_ids: table.iter().map(|c| c.site.site_id.clone()).collect(),
            scores: scores.iter().copied().map(sanitise).collect(),
        })
    }

    /// Score of `site_id`, if it is a scored candidate.
    #[must_use]
    pub fn get(&self, site_id: &str) -> Option<f64> {
        self.site_ids
            .iter()
            .position(|id| id == site_id)
            .and_then(|idx| self.scores.get(idx).copied())
    }

    /// Scores in candidate order.
    #[must_use]
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Candidate identifiers in order.
    #[must_use]
    pub fn site_ids(&self) -> &[String] {
        &self.site_ids
    }

    /// Number of scored candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Report whether nothing was scored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Iterate `(site_id, score)` pairs in candidate order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.site_ids
            .iter()
            .map(String::as_str)
            .zip(self.scores.iter().copied())
    }
}

/// Result of scoring a candidate batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutcome {
    /// Final candidate scores.
    pub assignment: ScoreAssignment,
    /// Pre-smoothing scores, for strategies with a separate base stage.
    pub base_scores: Option<Vec<f64>>,
    /// Model description.
    pub metadata: ModelMetadata,
}

/// Errors returned by [`NodeScorer::score`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    /// A stage produced a different number of scores than candidates.
    #[error("expected {expected} scores, got {actual}")]
    LengthMismatch {
        /// Candidate count.
        expected: usize,
        /// Produced count.
        actual: usize,
    },
    /// Training diverged.
    #[error("training loss became non-finite at epoch {epoch}")]
    NonFiniteLoss {
        /// Epoch at which the loss diverged.
        epoch: usize,
    },
}

/// Clamp a raw score into `[0.0, 1.0]`, mapping non-finite values to `0.0`.
///
/// # Examples
/// ```
/// use siteplan_core::sanitise;
///
/// assert_eq!(sanitise(f64::NAN), 0.0);
/// assert_eq!(sanitise(1.5), 1.0);
/// assert_eq!(sanitise(0.25), 0.25);
/// ```
#[must_use]
pub fn sanitise(score: f64) -> f64 {
    if !score.is_finite() {
        return 0.0;
    }
    score.clamp(0.0, 1.0)
}

/// Produce a score in `[0.0, 1.0]` for every candidate of a feature table.
///
/// Implementations must be deterministic for a fixed configuration and
/// thread-safe (`Send` + `Sync`). An empty table yields an empty assignment
/// rather than an error.
///
/// # Examples
///
/// ```rust
/// use siteplan_core::{
///     FeatureTable, ModelMetadata, NodeScorer, ScoreAssignment, ScoreOutcome, ScoringError,
///     ScoringVariant,
/// };
///
/// struct Flat;
///
/// impl NodeScorer for Flat {
///     fn variant(&self) -> ScoringVariant {
///         ScoringVariant::WeightedSum
///     }
///
///     fn score(&self, table: &FeatureTable) -> Result<ScoreOutcome, ScoringError> {
///         let scores = vec![0.5; table.len()];
///         Ok(ScoreOutcome {
///             assignment: ScoreAssignment::new(table, &scores)?,
///             base_scores: None,
///             metadata: ModelMetadata::new(self.variant()),
///         })
///     }
/// }
///
/// let outcome = Flat.score(&FeatureTable::default()).expect("empty table scores");
/// assert!(outcome.assignment.is_empty());
/// ```
pub trait NodeScorer: Send + Sync {
    /// Strategy identifier.
    fn variant(&self) -> ScoringVariant;

    /// Score every candidate in `table`.
    ///
    /// # Errors
    /// Returns [`ScoringError`] when a stage produces inconsistent output or
    /// training diverges.
    fn score(&self, table: &FeatureTable) -> Result<ScoreOutcome, ScoringError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::grid_table;
    use rstest::rstest;

    #[rstest]
    fn assignment_rejects_length_mismatch() {
        let table = grid_table(3);
        let err = ScoreAssignment::new(&table, &[0.1, 0.2]).expect_err("mismatch");
        assert_eq!(
            err,
            ScoringError::LengthMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[rstest]
    fn assignment_sanitises_and_looks_up_by_id() {
        let table = grid_table(3);
        let assignment =
            ScoreAssignment::new(&table, &[f64::INFINITY, -2.0, 0.4]).expect("lengths match");
        assert_eq!(assignment.scores(), &[0.0, 0.0, 0.4]);
        let last = table.candidates().last().map(|c| c.site.site_id.clone());
        assert_eq!(last.and_then(|id| assignment.get(&id)), Some(0.4));
        assert!(assignment.get("missing").is_none());
    }

    #[rstest]
    fn metadata_lists_canonical_features() {
        let metadata = ModelMetadata::new(ScoringVariant::Gat).with_target(TargetSource::Proxy);
        assert_eq!(metadata.feature_names.len(), 5);
        assert_eq!(metadata.target_source.map(|s| s.as_str()), Some("proxy_target"));
    }
}
