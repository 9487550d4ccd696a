//! Seeded full-batch training with best-validation model tracking.

use log::{debug, info};
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use siteplan_core::{GnnConfig, ScoringError};

use super::GraphModel;
use super::adam::Adam;
use super::layers::Dropout;

/// Share of candidates assigned to the training split.
const TRAIN_FRACTION: f64 = 0.8;

/// Trained model and the best validation error it reached.
pub(crate) struct Trained<M> {
    pub(crate) model: M,
    pub(crate) validation_mse: Option<f64>,
}

/// Seeded shuffle split into training and validation indices.
///
/// The training split holds `max(1, floor(0.8 * n))` indices; when that is
/// everything, validation reuses the first shuffled index.
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "split size is a floored fraction of the candidate count"
)]
pub(crate) fn split_indices(n: usize, rng: &mut ChaCha8Rng) -> (Vec<usize>, Vec<usize>) {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let cut = ((n as f64 * TRAIN_FRACTION).floor() as usize).max(1).min(n);
    let (train, rest) = order.split_at(cut);
    let validation = if rest.is_empty() {
        train.iter().copied().take(1).collect()
    } else {
        rest.to_vec()
    };
    (train.to_vec(), validation)
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "mean squared error averages float residuals"
)]
fn mse(predictions: &[f64], target: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let total: f64 = indices
        .iter()
        .map(|&i| {
            let p = predictions.get(i).copied().unwrap_or(0.0);
            let y = target.get(i).copied().unwrap_or(0.0);
            (p - y) * (p - y)
        })
        .sum();
    total / indices.len() as f64
}

/// Gradient of [`mse`] with respect to each prediction, zero off the split.
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "loss gradient scales residuals by the split size"
)]
fn mse_gradient(predictions: &[f64], target: &[f64], indices: &[usize]) -> Array2<f64> {
    let mut grad = Array2::zeros((predictions.len(), 1));
    let scale = 2.0 / indices.len().max(1) as f64;
    for &i in indices {
        let p = predictions.get(i).copied().unwrap_or(0.0);
        let y = target.get(i).copied().unwrap_or(0.0);
        if let Some(slot) = grad.get_mut((i, 0)) {
            *slot = scale * (p - y);
        }
    }
    grad
}

/// Inference-mode predictions.
pub(crate) fn predict<M: GraphModel>(model: &M, x: &Array2<f64>, graph: &Array2<f64>) -> Vec<f64> {
    first_column(&model.forward(x, graph, &mut Dropout::inactive()).0)
}

fn first_column(out: &Array2<f64>) -> Vec<f64> {
    out.rows().into_iter().map(|row| row.first().copied().unwrap_or(0.0)).collect()
}

/// Train `model` on `target` for `config.epochs` epochs.
///
/// Each epoch takes one Adam step on the training-split MSE, then evaluates
/// the validation split without dropout. The model with the lowest
/// validation error is returned; training never stops early.
///
/// # Errors
/// Returns [`ScoringError::NonFiniteLoss`] if the training loss diverges.
pub(crate) fn train<M: GraphModel>(
    mut model: M,
    x: &Array2<f64>,
    graph: &Array2<f64>,
    target: &[f64],
    config: &GnnConfig,
    rng: &mut ChaCha8Rng,
) -> Result<Trained<M>, ScoringError> {
    let (train_idx, validation_idx) = split_indices(target.len(), rng);
    let mut optimiser = Adam::new(config.learning_rate, config.weight_decay);
    let mut best: Option<(f64, M)> = None;

    for epoch in 0..config.epochs {
        let (out, trace) = model.forward(x, graph, &mut Dropout::training(config.dropout, rng));
        let predictions = first_column(&out);
        let loss = mse(&predictions, target, &train_idx);
        if !loss.is_finite() {
            return Err(ScoringError::NonFiniteLoss { epoch });
        }
        let grad = mse_gradient(&predictions, target, &train_idx);
        let grads = model.backward(x, graph, &trace, &grad);
        optimiser.step(model.parameters_mut(), &grads);

        let validation = mse(&predict(&model, x, graph), target, &validation_idx);
        debug!("epoch {epoch}: train mse {loss:.6}, validation mse {validation:.6}");
        if best.as_ref().is_none_or(|(score, _)| validation < *score) {
            best = Some((validation, model.clone()));
        }
    }

    let (validation_mse, model) = match best {
        Some((score, kept)) => (Some(score), kept),
        None => (None, model),
    };
    if let Some(score) = validation_mse {
        info!("best validation mse {score:.6}");
    }
    Ok(Trained {
        model,
        validation_mse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rstest::rstest;

    #[rstest]
    #[case(10, 8, 2)]
    #[case(5, 4, 1)]
    #[case(1, 1, 1)]
    #[case(2, 1, 1)]
    fn split_sizes_follow_training_fraction(
        #[case] n: usize,
        #[case] train_len: usize,
        #[case] validation_len: usize,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let (train, validation) = split_indices(n, &mut rng);
        assert_eq!(train.len(), train_len);
        assert_eq!(validation.len(), validation_len);
    }

    #[rstest]
    fn single_candidate_validates_on_its_training_index() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (train, validation) = split_indices(1, &mut rng);
        assert_eq!(train, vec![0]);
        assert_eq!(validation, vec![0]);
    }

    #[rstest]
    fn split_is_reproducible_for_a_seed() {
        let a = split_indices(20, &mut ChaCha8Rng::seed_from_u64(9));
        let b = split_indices(20, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[rstest]
    fn gradient_is_zero_outside_training_split() {
        let grad = mse_gradient(&[1.0, 1.0, 1.0], &[0.0, 0.0, 0.0], &[1]);
        assert_eq!(first_column(&grad), vec![0.0, 2.0, 0.0]);
    }
}
