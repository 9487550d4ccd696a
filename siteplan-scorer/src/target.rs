//! Supervision target for the learned scorers.

use log::info;
use siteplan_core::{Feature, FeatureTable, TargetLabels, TargetSource, min_max_scale};

/// Proxy blend applied when no label covers the whole batch.
const PROXY_WEIGHTS: [(Feature, f64); 4] = [
    (Feature::Traffic, 0.40),
    (Feature::Demand, 0.35),
    (Feature::Parking, 0.15),
    (Feature::Distance, 0.10),
];

/// Label columns in order of preference.
const LABEL_PREFERENCE: [(TargetSource, fn(&TargetLabels) -> Option<f64>); 3] = [
    (TargetSource::TargetImpact, |l| l.target_impact),
    (TargetSource::HistoricalSessions, |l| l.historical_sessions),
    (TargetSource::Utilization, |l| l.utilization),
];

/// Min-max scaled training target and the column it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// Scaled values in candidate order.
    pub values: Vec<f64>,
    /// Column that supplied the values.
    pub source: TargetSource,
}

/// Pick the first label present on every candidate, else the feature proxy,
/// and scale it to `[0.0, 1.0]`.
///
/// An empty table falls back to [`TargetSource::Proxy`] with no values.
///
/// # Examples
/// ```
/// use siteplan_core::{TargetSource, test_support::grid_table};
/// use siteplan_scorer::derive_target;
///
/// let target = derive_target(&grid_table(4));
/// assert_eq!(target.source, TargetSource::Proxy);
/// assert_eq!(target.values.len(), 4);
/// ```
#[must_use]
pub fn derive_target(table: &FeatureTable) -> Target {
    let labelled = if table.is_empty() {
        None
    } else {
        LABEL_PREFERENCE.iter().find_map(|(source, read)| {
            table
                .iter()
                .map(|c| read(&c.site.labels))
                .collect::<Option<Vec<f64>>>()
                .map(|values| (*source, values))
        })
    };
    let (source, raw) = labelled.unwrap_or_else(|| (TargetSource::Proxy, proxy_target(table)));
    info!("training target source: {source}");
    Target {
        values: min_max_scale(&raw),
        source,
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "proxy target is a weighted sum of scaled features"
)]
fn proxy_target(table: &FeatureTable) -> Vec<f64> {
    table
        .iter()
        .map(|c| {
            PROXY_WEIGHTS
                .iter()
                .map(|&(feature, weight)| weight * c.features.get(feature))
                .sum()
        })
        .collect()
}
