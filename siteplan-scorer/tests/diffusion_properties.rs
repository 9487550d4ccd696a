//! Property-based tests for score diffusion.
//!
//! # Invariants tested
//!
//! - **Bounded blend:** smoothed scores never leave the range of the inputs.
//! - **Isolation:** with no edges every score is returned unchanged.

use geo::Coord;
use proptest::prelude::*;
use siteplan_core::WeightedProximityGraph;
use siteplan_scorer::diffuse;

/// Sites along the equator with random longitudes inside a ~20 km strip.
fn sites_strategy() -> impl Strategy<Value = Vec<Coord<f64>>> {
    proptest::collection::vec(0.0_f64..0.2, 1..30)
        .prop_map(|lons| lons.into_iter().map(|x| Coord { x, y: 0.0 }).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    #[expect(
        clippy::float_arithmetic,
        reason = "bounds are compared with a small tolerance"
    )]
    fn smoothed_scores_stay_within_input_range(
        (sites, scores) in sites_strategy().prop_flat_map(|sites| {
            let n = sites.len();
            (Just(sites), proptest::collection::vec(0.0_f64..=1.0, n))
        }),
        alpha in 0.0_f64..=1.0,
        iterations in 0_usize..5,
    ) {
        let graph = WeightedProximityGraph::build(&sites, 3.0);
        let smoothed = diffuse(&scores, &graph, alpha, iterations)
            .expect("scores match graph size");
        let lo = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        for value in smoothed {
            prop_assert!(value >= lo - 1e-12 && value <= hi + 1e-12);
        }
    }

    #[test]
    fn isolated_sites_keep_their_scores(
        scores in proptest::collection::vec(0.0_f64..=1.0, 1..20),
        alpha in 0.0_f64..=1.0,
    ) {
        // One degree of longitude apart is far beyond the edge radius.
        let sites: Vec<Coord<f64>> = scores
            .iter()
            .zip(0_u32..)
            .map(|(_, i)| Coord { x: f64::from(i), y: 0.0 })
            .collect();
        let graph = WeightedProximityGraph::build(&sites, 3.0);
        prop_assert_eq!(diffuse(&scores, &graph, alpha, 3).expect("sizes match"), scores);
    }
}
