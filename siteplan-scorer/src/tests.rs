//! Unit coverage for the scoring strategies.

use rstest::{fixture, rstest};
use siteplan_core::test_support::{grid_table, line_candidates, remote_existing};
use siteplan_core::{
    CandidateSite, FEATURE_COUNT, Feature, FeatureEngineer, FeatureTable, NodeScorer,
    PipelineConfig, ScoringVariant, TargetLabels, TargetSource,
};

use crate::{
    FeatureWeights, RidgeDiffusionScorer, WeightedSumScorer, build_scorer, derive_target,
    fit_ridge,
};

fn engineer(candidates: &[CandidateSite]) -> FeatureTable {
    FeatureEngineer::new(2.0)
        .engineer(&remote_existing(), candidates)
        .expect("existing sites present")
}

#[fixture]
fn table() -> FeatureTable {
    grid_table(12)
}

#[rstest]
#[expect(
    clippy::float_arithmetic,
    reason = "test uses float maths for assertions"
)]
fn identical_column_contributes_exactly_half_its_weight() {
    // Parking is identical everywhere, so its scaled value is 0.5.
    let candidates: Vec<CandidateSite> = line_candidates(6)
        .into_iter()
        .map(|mut c| {
            c.parking_score = 7.0;
            c
        })
        .collect();
    let table = engineer(&candidates);
    let weights = FeatureWeights::default();
    let outcome = WeightedSumScorer::default()
        .score(&table)
        .expect("weighted sum succeeds");

    for (candidate, &score) in table.iter().zip(outcome.assignment.scores()) {
        assert_eq!(candidate.features.parking, 0.5);
        let others: f64 = Feature::ALL
            .iter()
            .filter(|&&f| f != Feature::Parking)
            .map(|&f| weights.get(f) * candidate.features.get(f))
            .sum();
        assert!((score - others - 0.5 * weights.parking).abs() < 1e-12);
    }
}

#[rstest]
#[expect(
    clippy::float_arithmetic,
    reason = "test uses float maths for assertions"
)]
fn default_weights_form_a_convex_combination() {
    let weights = FeatureWeights::default();
    let total: f64 = Feature::ALL.iter().map(|&f| weights.get(f)).sum();
    assert!((total - 1.0).abs() < 1e-12);
}

#[rstest]
#[expect(
    clippy::float_arithmetic,
    reason = "synthetic design rows and targets are float expressions"
)]
fn ridge_without_penalty_recovers_generating_weights() {
    let rows: Vec<[f64; FEATURE_COUNT]> = (0..20)
        .map(|i| {
            let t = f64::from(i);
            [
                (t * 0.37).sin().abs(),
                (t * 1.13).cos().abs(),
                (t * 0.71 + 0.2).sin().abs(),
                (t * 2.03).cos().abs(),
                (t * 0.53 + 1.0).sin().abs(),
            ]
        })
        .collect();
    let truth = [0.4, -0.2, 0.1, 0.75, -0.3];
    let intercept = 0.25;
    let y: Vec<f64> = rows
        .iter()
        .map(|r| intercept + r.iter().zip(truth).map(|(x, w)| x * w).sum::<f64>())
        .collect();

    let fit = fit_ridge(&rows, &y, 0.0);

    assert!((fit.intercept - intercept).abs() < 1e-8);
    for (estimated, expected) in fit.coefficients.iter().zip(truth) {
        assert!((estimated - expected).abs() < 1e-8, "{estimated} vs {expected}");
    }
}

#[rstest]
fn ridge_diffusion_reports_base_scores_and_coefficients(table: FeatureTable) {
    let scorer = RidgeDiffusionScorer::new(PipelineConfig::default().ridge, 3.0);
    let outcome = scorer.score(&table).expect("ridge succeeds");
    let base = outcome.base_scores.expect("base scores recorded");
    assert_eq!(base.len(), table.len());

    let scores = outcome.assignment.scores();
    let lo = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert_eq!((lo, hi), (0.0, 1.0));

    let coefficients = outcome.metadata.coefficients.expect("coefficients recorded");
    assert!(coefficients.contains_key("intercept"));
    assert!(coefficients.contains_key("charger_gap_score"));
    assert_eq!(outcome.metadata.target_source, Some(TargetSource::Proxy));
}

#[rstest]
fn empty_table_scores_nothing_for_closed_form_variants() {
    let empty = FeatureTable::default();
    for variant in [ScoringVariant::WeightedSum, ScoringVariant::RidgeDiffusion] {
        let config = PipelineConfig {
            variant,
            ..PipelineConfig::default()
        };
        let outcome = build_scorer(&config).score(&empty).expect("empty batch scores");
        assert!(outcome.assignment.is_empty());
    }
}

#[rstest]
fn target_prefers_labels_present_on_every_candidate() {
    let candidates: Vec<CandidateSite> = line_candidates(4)
        .into_iter()
        .zip([0.0, 1.0, 2.0, 3.0])
        .enumerate()
        .map(|(i, (c, utilization))| {
            c.with_labels(TargetLabels {
                target_impact: (i != 2).then_some(1.0),
                historical_sessions: None,
                utilization: Some(utilization),
            })
        })
        .collect();
    let target = derive_target(&engineer(&candidates));
    assert_eq!(target.source, TargetSource::Utilization);
    assert_eq!(target.values.first(), Some(&0.0));
    assert_eq!(target.values.last(), Some(&1.0));
}

#[rstest]
fn target_falls_back_to_proxy_without_labels(table: FeatureTable) {
    let target = derive_target(&table);
    assert_eq!(target.source, TargetSource::Proxy);
    assert!(target.values.iter().all(|v| (0.0..=1.0).contains(v)));
}

#[rstest]
#[case(ScoringVariant::WeightedSum)]
#[case(ScoringVariant::RidgeDiffusion)]
#[case(ScoringVariant::Gcn)]
#[case(ScoringVariant::GraphSage)]
#[case(ScoringVariant::Gat)]
fn factory_builds_the_requested_variant(#[case] variant: ScoringVariant) {
    let config = PipelineConfig {
        variant,
        ..PipelineConfig::default()
    };
    assert_eq!(build_scorer(&config).variant(), variant);
}
