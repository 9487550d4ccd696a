//! Per-run configuration.
//!
//! A single [`PipelineConfig`] value is threaded by reference through every
//! stage; nothing reads ambient state.

use thiserror::Error;

use crate::variant::ScoringVariant;

/// Ridge regression and diffusion hyperparameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct RidgeConfig {
    /// L2 penalty added to the normal-equations diagonal.
    pub lambda: f64,
    /// Weight kept on a node's own score per diffusion step.
    pub smoothing_alpha: f64,
    /// Number of synchronous diffusion steps.
    pub smoothing_iterations: usize,
}

impl Default for RidgeConfig {
    fn default() -> Self {
        Self {
            lambda: 0.05,
            smoothing_alpha: 0.70,
            smoothing_iterations: 2,
        }
    }
}

/// Message-passing network hyperparameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct GnnConfig {
    /// Width of the hidden layer.
    pub hidden_dim: usize,
    /// Number of training epochs.
    pub epochs: usize,
    /// Adam step size.
    pub learning_rate: f64,
    /// L2 penalty added to every gradient.
    pub weight_decay: f64,
    /// Drop probability applied during training.
    pub dropout: f64,
}

impl Default for GnnConfig {
    fn default() -> Self {
        Self {
            hidden_dim: 32,
            epochs: 250,
            learning_rate: 0.01,
            weight_decay: 1e-4,
            dropout: 0.15,
        }
    }
}

/// Configuration for one planning run.
///
/// # Examples
/// ```
/// use siteplan_core::{PipelineConfig, ScoringVariant};
///
/// let config = PipelineConfig {
///     variant: ScoringVariant::WeightedSum,
///     ..PipelineConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.scenario_budgets, vec![10, 25, 50]);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct PipelineConfig {
    /// Distance in kilometres under which two sites share a graph edge.
    pub edge_radius_km: f64,
    /// Configured coverage radius in kilometres, before tuning.
    pub service_radius_km: f64,
    /// Radius in kilometres for counting nearby existing sites.
    pub density_radius_km: f64,
    /// Mean nearest-existing distance at which a community looks remote.
    pub underserved_distance_km: f64,
    /// Minimum share of candidates that must remain uncovered at baseline.
    pub min_uncovered_ratio: f64,
    /// Number of sites in the ranked recommendation list.
    pub recommendation_budget: usize,
    /// Budgets evaluated as scenarios.
    pub scenario_budgets: Vec<usize>,
    /// Scoring strategy.
    pub variant: ScoringVariant,
    /// Ridge and diffusion hyperparameters.
    pub ridge: RidgeConfig,
    /// Message-passing hyperparameters.
    pub gnn: GnnConfig,
    /// Seed for every stochastic step.
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            edge_radius_km: 3.0,
            service_radius_km: 2.5,
            density_radius_km: 2.0,
            underserved_distance_km: 2.2,
            min_uncovered_ratio: 0.15,
            recommendation_budget: 50,
            scenario_budgets: vec![10, 25, 50],
            variant: ScoringVariant::default(),
            ridge: RidgeConfig::default(),
            gnn: GnnConfig::default(),
            seed: 42,
        }
    }
}

/// Errors raised while parsing or validating configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The scoring variant identifier is not recognised.
    #[error(
        "unknown scoring variant '{0}' (expected one of: weighted_sum, ridge_diffusion, gcn, graphsage, gat)"
    )]
    UnknownVariant(String),
    /// A distance parameter was zero, negative or not finite.
    #[error("{field} must be a positive finite distance, got {value}")]
    NonPositiveDistance {
        /// Offending field name.
        field: &'static str,
        /// Supplied value.
        value: f64,
    },
    /// A ratio or probability fell outside its permitted interval.
    #[error("{field} must lie in {range}, got {value}")]
    OutOfRange {
        /// Offending field name.
        field: &'static str,
        /// Human-readable interval.
        range: &'static str,
        /// Supplied value.
        value: f64,
    },
    /// A count that must be positive was zero.
    #[error("{field} must be greater than zero")]
    ZeroCount {
        /// Offending field name.
        field: &'static str,
    },
}

impl PipelineConfig {
    /// Check every parameter against its permitted range.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("edge_radius_km", self.edge_radius_km),
            ("service_radius_km", self.service_radius_km),
            ("density_radius_km", self.density_radius_km),
            ("underserved_distance_km", self.underserved_distance_km),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositiveDistance { field, value });
            }
        }
        check_closed_unit("min_uncovered_ratio", self.min_uncovered_ratio)?;
        check_closed_unit("ridge.smoothing_alpha", self.ridge.smoothing_alpha)?;
        if !(self.ridge.lambda.is_finite() && self.ridge.lambda >= 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "ridge.lambda",
                range: "[0, inf)",
                value: self.ridge.lambda,
            });
        }
        if !(0.0..1.0).contains(&self.gnn.dropout) {
            return Err(ConfigError::OutOfRange {
                field: "gnn.dropout",
                range: "[0, 1)",
                value: self.gnn.dropout,
            });
        }
        if !(self.gnn.learning_rate.is_finite() && self.gnn.learning_rate > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "gnn.learning_rate",
                range: "(0, inf)",
                value: self.gnn.learning_rate,
            });
        }
        if !(self.gnn.weight_decay.is_finite() && self.gnn.weight_decay >= 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "gnn.weight_decay",
                range: "[0, inf)",
                value: self.gnn.weight_decay,
            });
        }
        if self.gnn.hidden_dim == 0 {
            return Err(ConfigError::ZeroCount {
                field: "gnn.hidden_dim",
            });
        }
        Ok(())
    }
}

fn check_closed_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            range: "[0, 1]",
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_are_valid() {
        assert_eq!(PipelineConfig::default().validate(), Ok(()));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::NAN)]
    fn rejects_non_positive_service_radius(#[case] value: f64) {
        let config = PipelineConfig {
            service_radius_km: value,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveDistance {
                field: "service_radius_km",
                ..
            })
        ));
    }

    #[rstest]
    #[case(1.0)]
    #[case(-0.1)]
    fn rejects_dropout_outside_half_open_unit(#[case] dropout: f64) {
        let config = PipelineConfig {
            gnn: GnnConfig {
                dropout,
                ..GnnConfig::default()
            },
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "gnn.dropout",
                ..
            })
        ));
    }

    #[rstest]
    fn rejects_zero_hidden_width() {
        let config = PipelineConfig {
            gnn: GnnConfig {
                hidden_dim: 0,
                ..GnnConfig::default()
            },
            ..PipelineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroCount {
                field: "gnn.hidden_dim"
            })
        );
    }

    #[rstest]
    fn accepts_zero_ridge_lambda() {
        let config = PipelineConfig {
            ridge: RidgeConfig {
                lambda: 0.0,
                ..RidgeConfig::default()
            },
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
