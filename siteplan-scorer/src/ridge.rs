//! Closed-form ridge regression followed by graph diffusion.

use std::collections::BTreeMap;

use log::{debug, info};
use ndarray::{Array1, Array2, arr2, s};
use siteplan_core::{
    FEATURE_COUNT, Feature, FeatureTable, ModelMetadata, NodeScorer, RidgeConfig, ScoreAssignment,
    ScoreOutcome, ScoringError, ScoringVariant, WeightedProximityGraph, min_max_scale,
};

use crate::diffusion::diffuse;
use crate::linalg::solve;
use crate::target::derive_target;

/// Fitted linear model over the canonical feature columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RidgeFit {
    /// Intercept term.
    pub intercept: f64,
    /// One coefficient per [`Feature::ALL`] column.
    pub coefficients: [f64; FEATURE_COUNT],
}

impl RidgeFit {
    /// Predict the raw response for one feature row.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "linear prediction is a dot product"
    )]
    pub fn predict(&self, row: &[f64; FEATURE_COUNT]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }

    /// Coefficients keyed by column name, intercept included.
    #[must_use]
    pub fn named(&self) -> BTreeMap<String, f64> {
        let mut named: BTreeMap<String, f64> = Feature::ALL
            .iter()
            .zip(self.coefficients)
            .map(|(f, w)| (f.as_str().to_owned(), w))
            .collect();
        named.insert("intercept".to_owned(), self.intercept);
        named
    }
}

/// Solve `(XᵀX + λI) · w = Xᵀy` where `X` is `rows` with a leading
/// intercept column.
///
/// The penalty applies to the intercept as well. Columns that leave the
/// system singular receive a zero coefficient.
///
/// # Examples
/// ```
/// use siteplan_scorer::fit_ridge;
///
/// let rows = [
///     [0.0, 0.0, 0.0, 0.0, 0.0],
///     [1.0, 0.0, 0.0, 0.0, 0.0],
///     [0.0, 1.0, 0.0, 0.0, 0.0],
///     [0.0, 0.0, 1.0, 0.0, 0.0],
///     [0.0, 0.0, 0.0, 1.0, 0.0],
///     [0.0, 0.0, 0.0, 0.0, 1.0],
/// ];
/// let y: Vec<f64> = rows.iter().map(|r| 1.0 + 2.0 * r[0] - r[4]).collect();
/// let fit = fit_ridge(&rows, &y, 0.0);
/// assert!((fit.intercept - 1.0).abs() < 1e-9);
/// assert!((fit.coefficients[0] - 2.0).abs() < 1e-9);
/// assert!((fit.coefficients[4] + 1.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn fit_ridge(rows: &[[f64; FEATURE_COUNT]], target: &[f64], lambda: f64) -> RidgeFit {
    const WIDTH: usize = FEATURE_COUNT + 1;
    let len = rows.len().min(target.len());
    let features: Vec<[f64; FEATURE_COUNT]> = rows.iter().take(len).copied().collect();
    let mut design = Array2::<f64>::ones((len, WIDTH));
    design.slice_mut(s![.., 1..]).assign(&arr2(features.as_slice()));
    let response: Array1<f64> = target.iter().take(len).copied().collect();

    let gram = design.t().dot(&design) + Array2::<f64>::eye(WIDTH) * lambda;
    let moment = design.t().dot(&response);
    let solution = solve(&gram, &moment);

    let mut coefficients = [0.0; FEATURE_COUNT];
    for (slot, &w) in coefficients.iter_mut().zip(solution.values.iter().skip(1)) {
        *slot = w;
    }
    RidgeFit {
        intercept: solution.values.first().copied().unwrap_or(0.0),
        coefficients,
    }
}

/// Ridge regression on the derived target, smoothed over the weighted
/// candidate graph.
///
/// Base scores are the min-max scaled ridge predictions; final scores are the
/// min-max scaled result of [`RidgeConfig::smoothing_iterations`] diffusion
/// steps.
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeDiffusionScorer {
    ridge: RidgeConfig,
    edge_radius_km: f64,
}

impl RidgeDiffusionScorer {
    /// Create a scorer using `ridge` hyperparameters and candidate edges
    /// within `edge_radius_km`.
    #[must_use]
    pub const fn new(ridge: RidgeConfig, edge_radius_km: f64) -> Self {
        Self {
            ridge,
            edge_radius_km,
        }
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "iteration counts are small"
    )]
    fn metadata(&self) -> ModelMetadata {
        ModelMetadata::new(self.variant())
            .with_hyperparameter("ridge_lambda", self.ridge.lambda)
            .with_hyperparameter("smoothing_alpha", self.ridge.smoothing_alpha)
            .with_hyperparameter(
                "smoothing_iterations",
                self.ridge.smoothing_iterations as f64,
            )
            .with_hyperparameter("edge_radius_km", self.edge_radius_km)
    }
}

impl NodeScorer for RidgeDiffusionScorer {
    fn variant(&self) -> ScoringVariant {
        ScoringVariant::RidgeDiffusion
    }

    fn score(&self, table: &FeatureTable) -> Result<ScoreOutcome, ScoringError> {
        let target = derive_target(table);
        let fit = fit_ridge(&table.rows(), &target.values, self.ridge.lambda);
        debug!("ridge coefficients: {fit:?}");

        let raw: Vec<f64> = table.rows().iter().map(|row| fit.predict(row)).collect();
        let base = min_max_scale(&raw);
        let graph = WeightedProximityGraph::build(&table.locations(), self.edge_radius_km);
        let smoothed = diffuse(
            &base,
            &graph,
            self.ridge.smoothing_alpha,
            self.ridge.smoothing_iterations,
        )?;
        let scores = min_max_scale(&smoothed);
        info!(
            "ridge diffusion scored {} candidates from {}",
            scores.len(),
            target.source
        );

        let mut metadata = self.metadata().with_target(target.source);
        metadata.coefficients = Some(fit.named());
        Ok(ScoreOutcome {
            assignment: ScoreAssignment::new(table, &scores)?,
            base_scores: Some(base),
            metadata,
        })
    }
}
