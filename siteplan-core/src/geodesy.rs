//! Great-circle distances between sites.
//!
//! All stages share [`haversine_km`] so edge membership, coverage and radius
//! percentiles agree on the same metric.

use geo::Coord;

/// Sphere radius used by [`haversine_km`], in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Return the haversine distance in kilometres between two WGS84 coordinates.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use siteplan_core::haversine_km;
///
/// let a = Coord { x: 0.0, y: 0.0 };
/// let b = Coord { x: 0.0, y: 1.0 };
/// assert!((haversine_km(a, b) - 111.195).abs() < 1e-3);
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "great-circle distance is floating-point trigonometry"
)]
pub fn haversine_km(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let phi_a = a.y.to_radians();
    let phi_b = b.y.to_radians();
    let d_phi = phi_b - phi_a;
    let d_lambda = (b.x - a.x).to_radians();
    let h = (d_phi / 2.0).sin().powi(2) + phi_a.cos() * phi_b.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Dense row-major table of distances from one site list to another.
///
/// `get(i, j)` is the distance from `from[i]` to `to[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// Compute all pairwise distances from `from` to `to`.
    #[must_use]
    pub fn between(from: &[Coord<f64>], to: &[Coord<f64>]) -> Self {
        let values = from
            .iter()
            .flat_map(|&a| to.iter().map(move |&b| haversine_km(a, b)))
            .collect();
        Self {
            rows: from.len(),
            cols: to.len(),
            values,
        }
    }

    /// Compute the symmetric distance table of a site list with itself.
    #[must_use]
    pub fn square(sites: &[Coord<f64>]) -> Self {
        Self::between(sites, sites)
    }

    /// Number of origin sites.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of destination sites.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Distance from origin `row` to destination `col`, if both are in range.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.values.get(row * self.cols + col).copied()
    }

    /// Distances from origin `row` to every destination.
    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row.saturating_mul(self.cols);
        self.values
            .get(start..start.saturating_add(self.cols))
            .unwrap_or(&[])
    }

    /// Minimum distance from each origin to any destination.
    ///
    /// Returns `None` when there are no destinations.
    #[must_use]
    pub fn row_minima(&self) -> Option<Vec<f64>> {
        if self.cols == 0 {
            return None;
        }
        Some(
            (0..self.rows)
                .map(|row| self.row(row).iter().copied().fold(f64::INFINITY, f64::min))
                .collect(),
        )
    }
}
