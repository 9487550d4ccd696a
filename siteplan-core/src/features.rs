//! Per-candidate feature derivation.
//!
//! [`FeatureEngineer::engineer`] measures each candidate against the existing
//! network, then min-max scales every feature across the candidate batch.
//! Scaling is a property of the batch: the same site engineered alongside a
//! different candidate set receives different values.

use geo::Coord;
use log::debug;
use thiserror::Error;

use crate::geodesy::DistanceMatrix;
use crate::site::{CandidateSite, ExistingSite};
use crate::stats::min_max_scale;

/// Number of model features per candidate.
pub const FEATURE_COUNT: usize = 5;

/// Named model features in canonical column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Scaled traffic intensity.
    Traffic,
    /// Scaled parking availability.
    Parking,
    /// One minus the scaled count of nearby existing sites.
    ChargerGap,
    /// Scaled distance to the nearest existing site.
    Distance,
    /// Scaled demand proxy.
    Demand,
}

impl Feature {
    /// Every feature in column order.
    pub const ALL: [Self; FEATURE_COUNT] = [
        Self::Traffic,
        Self::Parking,
        Self::ChargerGap,
        Self::Distance,
        Self::Demand,
    ];

    /// Column name reported in model metadata.
    ///
    /// # Examples
    /// ```
    /// use siteplan_core::Feature;
    ///
    /// assert_eq!(Feature::ChargerGap.as_str(), "charger_gap_score");
    /// ```
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Traffic => "traffic_score",
            Self::Parking => "parking_score",
            Self::ChargerGap => "charger_gap_score",
            Self::Distance => "distance_to_nearest_existing",
            Self::Demand => "demand_proxy",
        }
    }

    /// Column names of [`Feature::ALL`].
    #[must_use]
    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|f| f.as_str().to_owned()).collect()
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scaled features of one candidate, each in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector {
    /// See [`Feature::Traffic`].
    pub traffic: f64,
    /// See [`Feature::Parking`].
    pub parking: f64,
    /// See [`Feature::ChargerGap`].
    pub charger_gap: f64,
    /// See [`Feature::Distance`].
    pub distance: f64,
    /// See [`Feature::Demand`].
    pub demand: f64,
}

impl FeatureVector {
    /// Value of a single feature.
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

    /// Values in [`Feature::ALL`] order.
    #[must_use]
    pub const fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.traffic,
            self.parking,
            self.charger_gap,
            self.distance,
            self.demand,
        ]
    }
}

/// A candidate with its derived measurements and scaled features.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineeredCandidate {
    /// Source record.
    pub site: CandidateSite,
    /// Raw distance in kilometres to the closest existing site.
    pub nearest_existing_km: f64,
    /// Number of existing sites within the density radius.
    pub existing_density: usize,
    /// Scaled model features.
    pub features: FeatureVector,
    /// Optimizer demand weight, `0.6 * traffic + 0.4 * demand`.
    pub demand_weight: f64,
}

/// Engineered candidates in input order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureTable {
    candidates: Vec<EngineeredCandidate>,
}

impl FeatureTable {
    /// Wrap engineered candidates.
    #[must_use]
    pub const fn new(candidates: Vec<EngineeredCandidate>) -> Self {
        Self { candidates }
    }

    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Report whether the table has no candidates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Engineered candidates in input order.
    #[must_use]
    pub fn candidates(&self) -> &[EngineeredCandidate] {
        &self.candidates
    }

    /// Iterate over engineered candidates.
    pub fn iter(&self) -> std::slice::Iter<'_, EngineeredCandidate> {
        self.candidates.iter()
    }

    /// Candidate positions in input order.
    #[must_use]
    pub fn locations(&self) -> Vec<Coord<f64>> {
        self.candidates.iter().map(|c| c.site.location()).collect()
    }

    /// Feature rows in [`Feature::ALL`] column order.
    #[must_use]
    pub fn rows(&self) -> Vec<[f64; FEATURE_COUNT]> {
        self.candidates.iter().map(|c| c.features.to_array()).collect()
    }

    /// One feature across all candidates.
    #[must_use]
    pub fn column(&self, feature: Feature) -> Vec<f64> {
        self.candidates.iter().map(|c| c.features.get(feature)).collect()
    }

    /// Raw nearest-existing distances in kilometres.
    #[must_use]
    pub fn nearest_existing_km(&self) -> Vec<f64> {
        self.candidates.iter().map(|c| c.nearest_existing_km).collect()
    }

    /// Optimizer demand weights.
    #[must_use]
    pub fn demand_weights(&self) -> Vec<f64> {
        self.candidates.iter().map(|c| c.demand_weight).collect()
    }
}

impl<'a> IntoIterator for &'a FeatureTable {
    type Item = &'a EngineeredCandidate;
    type IntoIter = std::slice::Iter<'a, EngineeredCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Errors returned by [`FeatureEngineer::engineer`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    /// Distances to the existing network are undefined without any sites.
    #[error("at least one existing site is required")]
    NoExistingSites,
}

/// Derive and scale candidate features against the existing network.
///
/// # Examples
/// ```
/// use siteplan_core::{CandidateSite, ExistingSite, FeatureEngineer};
///
/// let existing = [ExistingSite::new("EX_1", 0.0, 0.0)];
/// let candidates = [
///     CandidateSite::new("CA_1", 0.0, 0.01).with_raw_features(10.0, 1.0, 5.0),
///     CandidateSite::new("CA_2", 0.0, 0.05).with_raw_features(20.0, 1.0, 5.0),
/// ];
/// let table = FeatureEngineer::new(2.0).engineer(&existing, &candidates)?;
/// assert_eq!(table.candidates()[1].features.traffic, 1.0);
/// assert_eq!(table.candidates()[0].features.parking, 0.5);
/// # Ok::<(), siteplan_core::FeatureError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureEngineer {
    /// Radius in kilometres within which existing sites count toward density.
    pub density_radius_km: f64,
}

impl FeatureEngineer {
    /// Create an engineer with the given density radius.
    #[must_use]
    pub const fn new(density_radius_km: f64) -> Self {
        Self { density_radius_km }
    }

    /// Engineer features for `candidates`.
    ///
    /// # Errors
    /// Returns [`FeatureError::NoExistingSites`] when `existing` is empty,
    /// regardless of the candidate count.
    #[expect(
        clippy::float_arithmetic,
        reason = "gap and demand weight are arithmetic over scaled features"
    )]
    pub fn engineer(
        &self,
        existing: &[ExistingSite],
        candidates: &[CandidateSite],
    ) -> Result<FeatureTable, FeatureError> {
        if existing.is_empty() {
            return Err(FeatureError::NoExistingSites);
        }
        let origins: Vec<Coord<f64>> = candidates.iter().map(CandidateSite::location).collect();
        let sites: Vec<Coord<f64>> = existing.iter().map(ExistingSite::location).collect();
        let distances = DistanceMatrix::between(&origins, &sites);
        let nearest = distances
            .row_minima()
            .ok_or(FeatureError::NoExistingSites)?;
        let density: Vec<usize> = (0..candidates.len())
            .map(|i| {
                distances
                    .row(i)
                    .iter()
                    .filter(|&&d| d <= self.density_radius_km)
                    .count()
            })
            .collect();

        let traffic = scaled(candidates, |c| c.traffic_score);
        let parking = scaled(candidates, |c| c.parking_score);
        let demand = scaled(candidates, |c| c.demand_proxy);
        let distance = min_max_scale(&nearest);
        let density_scaled = min_max_scale(&density.iter().map(|&d| count_as_f64(d)).collect::<Vec<_>>());

        let engineered = candidates
            .iter()
            .enumerate()
            .map(|(i, site)| {
                let at = |column: &[f64]| column.get(i).copied().unwrap_or(0.5);
                let features = FeatureVector {
                    traffic: at(&traffic),
                    parking: at(&parking),
                    charger_gap: 1.0 - at(&density_scaled),
                    distance: at(&distance),
                    demand: at(&demand),
                };
                EngineeredCandidate {
                    site: site.clone(),
                    nearest_existing_km: nearest.get(i).copied().unwrap_or(0.0),
                    existing_density: density.get(i).copied().unwrap_or(0),
                    demand_weight: 0.6 * features.traffic + 0.4 * features.demand,
                    features,
                }
            })
            .collect();
        debug!(
            "engineered {} candidates against {} existing sites",
            candidates.len(),
            existing.len()
        );
        Ok(FeatureTable::new(engineered))
    }
}

fn scaled(candidates: &[CandidateSite], raw: impl Fn(&CandidateSite) -> f64) -> Vec<f64> {
    min_max_scale(&candidates.iter().map(raw).collect::<Vec<_>>())
}

#[expect(
    clippy::cast_precision_loss,
    reason = "site counts are far below the f64 mantissa limit"
)]
const fn count_as_f64(count: usize) -> f64 {
    count as f64
}
