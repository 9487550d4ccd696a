//! Existing and candidate facility sites.
//!
//! Coordinates are WGS84 degrees. [`ExistingSite::location`] and
//! [`CandidateSite::location`] expose them as a [`Coord`] with
//! `x = longitude` and `y = latitude`.

use geo::Coord;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A facility that is already operating.
///
/// # Examples
/// ```
/// use siteplan_core::ExistingSite;
///
/// let site = ExistingSite::new("EX_001", 30.2672, -97.7431);
/// assert_eq!(site.location().x, -97.7431);
/// assert_eq!(site.charger_count, 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExistingSite {
    /// Identifier unique across existing and candidate sites.
    pub site_id: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Number of chargers installed at the site.
    #[cfg_attr(feature = "serde", serde(default = "default_charger_count"))]
    pub charger_count: u32,
    /// Charger technology, e.g. `L2` or `DCFC`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub charger_type: Option<String>,
    /// Operating network name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub network: Option<String>,
}

#[cfg(feature = "serde")]
const fn default_charger_count() -> u32 {
    1
}

impl ExistingSite {
    /// Construct an existing site with a single charger and no metadata.
    pub fn new(site_id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            site_id: site_id.into(),
            lat,
            lon,
            charger_count: 1,
            charger_type: None,
            network: None,
        }
    }

    /// Return the site position as a `geo` coordinate.
    #[must_use]
    pub const fn location(&self) -> Coord<f64> {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }
}

/// Observed outcome labels that can supervise the learned scorers.
///
/// Each label is optional per candidate; a label only becomes the training
/// target when every candidate in the batch carries it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TargetLabels {
    /// Externally supplied impact estimate.
    #[cfg_attr(feature = "serde", serde(default))]
    pub target_impact: Option<f64>,
    /// Historical charging session count.
    #[cfg_attr(feature = "serde", serde(default))]
    pub historical_sessions: Option<f64>,
    /// Observed utilisation ratio.
    #[cfg_attr(feature = "serde", serde(default))]
    pub utilization: Option<f64>,
}

/// A location where a new facility could be placed.
///
/// Raw feature values may be on any scale; the feature engineer rescales them
/// across the candidate batch.
///
/// # Examples
/// ```
/// use siteplan_core::CandidateSite;
///
/// let site = CandidateSite::new("CA_001", 30.27, -97.74)
///     .with_raw_features(80.0, 40.0, 65.0);
/// assert_eq!(site.traffic_score, 80.0);
/// assert!(site.labels.target_impact.is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CandidateSite {
    /// Identifier unique across existing and candidate sites.
    pub site_id: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Raw traffic intensity.
    pub traffic_score: f64,
    /// Raw parking availability.
    pub parking_score: f64,
    /// Raw demand proxy, e.g. residential density.
    pub demand_proxy: f64,
    /// Optional population score carried through to reports.
    #[cfg_attr(feature = "serde", serde(default))]
    pub population_score: Option<f64>,
    /// Optional supervision labels.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub labels: TargetLabels,
}

impl CandidateSite {
    /// Construct a candidate with zeroed raw features and no labels.
    pub fn new(site_id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            site_id: site_id.into(),
            lat,
            lon,
            traffic_score: 0.0,
            parking_score: 0.0,
            demand_proxy: 0.0,
            population_score: None,
            labels: TargetLabels::default(),
        }
    }

    /// Set the raw traffic, parking and demand values.
    #[must_use]
    pub fn with_raw_features(mut self, traffic: f64, parking: f64, demand: f64) -> Self {
        self.traffic_score = traffic;
        self.parking_score = parking;
        self.demand_proxy = demand;
        self
    }

    /// Attach supervision labels.
    #[must_use]
    pub fn with_labels(mut self, labels: TargetLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Return the site position as a `geo` coordinate.
    #[must_use]
    pub const fn location(&self) -> Coord<f64> {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }
}

/// Existing and candidate sites for one planning run.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SiteInventory {
    /// Operating facilities.
    #[cfg_attr(feature = "serde", serde(default))]
    pub existing: Vec<ExistingSite>,
    /// Potential new facilities.
    #[cfg_attr(feature = "serde", serde(default))]
    pub candidates: Vec<CandidateSite>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn location_maps_lon_to_x() {
        let site = CandidateSite::new("c", 1.5, -2.5);
        assert_eq!(site.location(), Coord { x: -2.5, y: 1.5 });
    }

    #[cfg(feature = "serde")]
    #[rstest]
    fn inventory_accepts_flat_label_fields() {
        let json = r#"{
            "existing": [{"site_id": "EX_1", "lat": 0.0, "lon": 0.0}],
            "candidates": [{
                "site_id": "CA_1", "lat": 0.1, "lon": 0.1,
                "traffic_score": 10.0, "parking_score": 5.0, "demand_proxy": 3.0,
                "utilization": 0.4
            }]
        }"#;
        let inventory: SiteInventory = serde_json::from_str(json).expect("valid inventory");
        assert_eq!(inventory.existing[0].charger_count, 1);
        assert_eq!(inventory.candidates[0].labels.utilization, Some(0.4));
        assert!(inventory.candidates[0].labels.target_impact.is_none());
    }
}
