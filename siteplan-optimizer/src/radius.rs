//! Adaptive service-radius selection.

use log::info;
use siteplan_core::rank_index;

/// Smallest radius the tuner will return, in kilometres.
pub const MIN_SERVICE_RADIUS_KM: f64 = 0.01;

/// Service radius chosen for one optimisation run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServiceRadius {
    /// Radius used by the optimiser, in kilometres.
    pub radius_km: f64,
    /// Radius requested by configuration, in kilometres.
    pub configured_km: f64,
    /// Share of candidates within the configured radius of an existing site.
    pub baseline_coverage: f64,
    /// Whether the radius was shrunk from the configured value.
    pub tuned: bool,
}

impl ServiceRadius {
    /// Use `radius_km` as is.
    #[must_use]
    pub const fn fixed(radius_km: f64) -> Self {
        Self {
            radius_km,
            configured_km: radius_km,
            baseline_coverage: 0.0,
            tuned: false,
        }
    }
}

/// Choose the service radius for candidates whose nearest existing sites lie
/// `nearest_km` away.
///
/// Baseline coverage is the share of candidates within `configured_km`. When
/// it exceeds `1 - min_uncovered_ratio`, the radius shrinks to the
/// nearest-rank order statistic of `nearest_km` at that coverage level,
/// clamped to [`MIN_SERVICE_RADIUS_KM`]. Otherwise the configured radius is
/// kept.
///
/// # Examples
/// ```
/// use siteplan_optimizer::tune_service_radius;
///
/// // Every candidate is within 2.5 km, so the radius shrinks.
/// let nearest = [0.5, 1.0, 1.5, 2.0];
/// let radius = tune_service_radius(&nearest, 2.5, 0.5);
/// assert!(radius.tuned);
/// assert_eq!(radius.baseline_coverage, 1.0);
/// assert_eq!(radius.radius_km, 1.0);
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "coverage is a ratio of candidate counts"
)]
pub fn tune_service_radius(
    nearest_km: &[f64],
    configured_km: f64,
    min_uncovered_ratio: f64,
) -> ServiceRadius {
    if nearest_km.is_empty() {
        return ServiceRadius::fixed(configured_km);
    }
    let within = nearest_km.iter().filter(|&&d| d <= configured_km).count();
    let baseline_coverage = within as f64 / nearest_km.len() as f64;
    let max_coverage = (1.0 - min_uncovered_ratio).clamp(0.0, 1.0);
    if baseline_coverage <= max_coverage {
        return ServiceRadius {
            baseline_coverage,
            ..ServiceRadius::fixed(configured_km)
        };
    }

    let mut sorted = nearest_km.to_vec();
    sorted.sort_by(f64::total_cmp);
    let order_statistic = sorted
        .get(rank_index(sorted.len(), max_coverage))
        .copied()
        .unwrap_or(configured_km);
    let radius_km = order_statistic.max(MIN_SERVICE_RADIUS_KM);
    info!(
        "baseline coverage {baseline_coverage:.3} exceeds {max_coverage:.3}; \
         service radius tuned from {configured_km} km to {radius_km:.3} km"
    );
    ServiceRadius {
        radius_km,
        configured_km,
        baseline_coverage,
        tuned: true,
    }
}
