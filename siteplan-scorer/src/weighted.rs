//! Fixed convex combination of scaled features.

use siteplan_core::{
    Feature, FeatureTable, ModelMetadata, NodeScorer, ScoreAssignment, ScoreOutcome, ScoringError,
    ScoringVariant,
};

/// Per-feature weights for [`WeightedSumScorer`].
///
/// The defaults sum to one so scores stay in `[0.0, 1.0]` without rescaling.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureWeights {
    /// Weight on [`Feature::Traffic`].
    pub traffic: f64,
    /// Weight on [`Feature::Parking`].
    pub parking: f64,
    /// Weight on [`Feature::ChargerGap`].
    pub charger_gap: f64,
    /// Weight on [`Feature::Distance`].
    pub distance: f64,
    /// Weight on [`Feature::Demand`].
    pub demand: f64,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self {
            traffic: 0.30,
            parking: 0.20,
            charger_gap: 0.20,
            distance: 0.15,
            demand: 0.15,
        }
    }
}

impl FeatureWeights {
    /// Weight applied to `feature`.
    #[must_use]
    pub const fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Traffic => self.traffic,
            Feature::Parking => self.parking,
            Feature::ChargerGap => self.charger_gap,
            Feature::Distance => self.distance,
            Feature::Demand => self.demand,
        }
    }
}

/// Stateless scorer returning the weighted sum of each candidate's features.
///
/// # Examples
/// ```
/// use siteplan_core::{NodeScorer, test_support::grid_table};
/// use siteplan_scorer::WeightedSumScorer;
///
/// let outcome = WeightedSumScorer::default().score(&grid_table(5))?;
/// assert!(outcome.assignment.scores().iter().all(|s| (0.0..=1.0).contains(s)));
/// # Ok::<(), siteplan_core::ScoringError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeightedSumScorer {
    weights: FeatureWeights,
}

impl WeightedSumScorer {
    /// Create a scorer with custom weights.
    #[must_use]
    pub const fn new(weights: FeatureWeights) -> Self {
        Self { weights }
    }

    /// Weights in use.
    #[must_use]
    pub const fn weights(&self) -> &FeatureWeights {
        &self.weights
    }
}

impl NodeScorer for WeightedSumScorer {
    fn variant(&self) -> ScoringVariant {
        ScoringVariant::WeightedSum
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "the score is a dot product of weights and features"
    )]
    fn score(&self, table: &FeatureTable) -> Result<ScoreOutcome, ScoringError> {
        let scores: Vec<f64> = table
            .iter()
            .map(|c| {
                Feature::ALL
                    .iter()
                    .map(|&f| self.weights.get(f) * c.features.get(f))
                    .sum()
            })
            .collect();
        let metadata = Feature::ALL.iter().fold(
            ModelMetadata::new(self.variant()),
            |metadata, &f| metadata.with_hyperparameter(&format!("weight_{f}"), self.weights.get(f)),
        );
        Ok(ScoreOutcome {
            assignment: ScoreAssignment::new(table, &scores)?,
            base_scores: None,
            metadata,
        })
    }
}
