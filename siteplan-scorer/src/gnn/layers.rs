//! Trainable building blocks shared by the message-passing models.

use ndarray::{Array2, Axis, Zip, s};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

/// Standard deviation of the attention vector initialisation.
const ATTENTION_INIT_STD: f64 = 0.1;

/// Negative slope of the attention logit activation.
const LEAKY_SLOPE: f64 = 0.2;

/// Logit assigned to non-edges before the attention softmax.
const MASKED_LOGIT: f64 = -1e9;

#[expect(
    clippy::float_arithmetic,
    reason = "uniform sampling rescales a unit draw"
)]
fn uniform(rng: &mut ChaCha8Rng, bound: f64) -> f64 {
    (rng.r#gen::<f64>() * 2.0 - 1.0) * bound
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "initialisation bounds depend on layer widths"
)]
fn fan_in_bound(fan_in: usize) -> f64 {
    1.0 / (fan_in.max(1) as f64).sqrt()
}

/// Affine layer `x · W + b`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Linear {
    pub(crate) weight: Array2<f64>,
    pub(crate) bias: Array2<f64>,
}

/// Gradients of a [`Linear`] layer and its input.
pub(crate) struct LinearGrads {
    pub(crate) weight: Array2<f64>,
    pub(crate) bias: Array2<f64>,
    pub(crate) input: Array2<f64>,
}

impl Linear {
    /// Weights and bias drawn from `U(-1/√fan_in, 1/√fan_in)`.
    pub(crate) fn new(inputs: usize, outputs: usize, rng: &mut ChaCha8Rng) -> Self {
        let bound = fan_in_bound(inputs);
        let weight = Array2::from_shape_fn((inputs, outputs), |_| uniform(rng, bound));
        let bias = Array2::from_shape_fn((1, outputs), |_| uniform(rng, bound));
        Self { weight, bias }
    }

    pub(crate) fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weight) + &self.bias
    }

    pub(crate) fn backward(&self, x: &Array2<f64>, grad: &Array2<f64>) -> LinearGrads {
        LinearGrads {
            weight: x.t().dot(grad),
            bias: grad.sum_axis(Axis(0)).insert_axis(Axis(0)),
            input: grad.dot(&self.weight.t()),
        }
    }
}

/// Join `left` and `right` column-wise.
pub(crate) fn hstack(left: &Array2<f64>, right: &Array2<f64>) -> Array2<f64> {
    let split = left.ncols();
    let mut joined = Array2::zeros((left.nrows(), split + right.ncols()));
    joined.slice_mut(s![.., ..split]).assign(left);
    joined.slice_mut(s![.., split..]).assign(right);
    joined
}

/// Single-head graph attention layer without bias.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Attention {
    pub(crate) weight: Array2<f64>,
    pub(crate) a_src: Array2<f64>,
    pub(crate) a_dst: Array2<f64>,
}

/// Intermediate values of one attention forward pass.
pub(crate) struct AttentionTrace {
    projected: Array2<f64>,
    logits: Array2<f64>,
    alpha: Array2<f64>,
    mask: Array2<f64>,
}

/// Gradients of an [`Attention`] layer and its input.
pub(crate) struct AttentionGrads {
    pub(crate) weight: Array2<f64>,
    pub(crate) a_src: Array2<f64>,
    pub(crate) a_dst: Array2<f64>,
    pub(crate) input: Array2<f64>,
}

impl Attention {
    /// Xavier-uniform projection and `N(0, 0.1)` attention vectors.
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_precision_loss,
        reason = "Xavier bound depends on layer widths"
    )]
    pub(crate) fn new(inputs: usize, outputs: usize, rng: &mut ChaCha8Rng) -> Self {
        let bound = (6.0 / (inputs + outputs).max(1) as f64).sqrt();
        let weight = Array2::from_shape_fn((inputs, outputs), |_| uniform(rng, bound));
        let mut normal =
            |_: (usize, usize)| rng.sample::<f64, _>(StandardNormal) * ATTENTION_INIT_STD;
        let a_src = Array2::from_shape_fn((outputs, 1), &mut normal);
        let a_dst = Array2::from_shape_fn((outputs, 1), &mut normal);
        Self {
            weight,
            a_src,
            a_dst,
        }
    }

    /// Attend over `adjacency`, which doubles as the edge mask.
    ///
    /// `dropout` multiplies the attention coefficients after the softmax.
    pub(crate) fn forward(
        &self,
        x: &Array2<f64>,
        adjacency: &Array2<f64>,
        dropout: &mut Dropout<'_>,
    ) -> (Array2<f64>, AttentionTrace) {
        let projected = x.dot(&self.weight);
        let src = projected.dot(&self.a_src);
        let dst = projected.dot(&self.a_dst);
        let logits = &src + &dst.t();
        let masked = Zip::from(&logits)
            .and(adjacency)
            .map_collect(|&logit, &edge| {
                if edge > 0.0 {
                    leaky_relu(logit)
                } else {
                    MASKED_LOGIT
                }
            });
        let alpha = softmax_rows(masked);
        let n = alpha.nrows();
        let mask = dropout.mask(n, n);
        let out = (&alpha * &mask).dot(&projected);
        (
            out,
            AttentionTrace {
                projected,
                logits,
                alpha,
                mask,
            },
        )
    }

    /// Backpropagate through the softmax, whose row Jacobian contracts
    /// `d_alpha` against `alpha` once per row.
    #[expect(
        clippy::float_arithmetic,
        reason = "softmax and activation derivatives are floating-point"
    )]
    pub(crate) fn backward(
        &self,
        x: &Array2<f64>,
        adjacency: &Array2<f64>,
        trace: &AttentionTrace,
        grad: &Array2<f64>,
    ) -> AttentionGrads {
        let dropped = &trace.alpha * &trace.mask;
        let d_alpha = grad.dot(&trace.projected.t()) * &trace.mask;
        let row_dot = (&trace.alpha * &d_alpha)
            .sum_axis(Axis(1))
            .insert_axis(Axis(1));
        let centred = &d_alpha - &row_dot;
        let d_logits = Zip::from(&trace.alpha)
            .and(&centred)
            .and(&trace.logits)
            .and(adjacency)
            .map_collect(|&alpha, &centred_grad, &logit, &edge| {
                if edge > 0.0 {
                    alpha * centred_grad * leaky_relu_slope(logit)
                } else {
                    0.0
                }
            });

        let d_src = d_logits.sum_axis(Axis(1)).insert_axis(Axis(1));
        let d_dst = d_logits.sum_axis(Axis(0)).insert_axis(Axis(1));
        let d_projected = dropped.t().dot(grad)
            + d_src.dot(&self.a_src.t())
            + d_dst.dot(&self.a_dst.t());

        AttentionGrads {
            weight: x.t().dot(&d_projected),
            a_src: trace.projected.t().dot(&d_src),
            a_dst: trace.projected.t().dot(&d_dst),
            input: d_projected.dot(&self.weight.t()),
        }
    }
}

#[expect(clippy::float_arithmetic, reason = "leaky activation scales negatives")]
fn leaky_relu(x: f64) -> f64 {
    if x > 0.0 { x } else { LEAKY_SLOPE * x }
}

fn leaky_relu_slope(x: f64) -> f64 {
    if x > 0.0 { 1.0 } else { LEAKY_SLOPE }
}

#[expect(
    clippy::float_arithmetic,
    reason = "softmax exponentiates shifted logits"
)]
fn softmax_rows(mut logits: Array2<f64>) -> Array2<f64> {
    for mut row in logits.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let total = row.sum();
        if total > 0.0 {
            row.mapv_inplace(|v| v / total);
        }
    }
    logits
}

/// Inverted dropout driven by the training RNG.
///
/// An inactive instance yields all-ones masks so the same forward code
/// serves training and inference.
pub(crate) struct Dropout<'a> {
    rate: f64,
    rng: Option<&'a mut ChaCha8Rng>,
}

impl<'a> Dropout<'a> {
    pub(crate) const fn training(rate: f64, rng: &'a mut ChaCha8Rng) -> Self {
        Self {
            rate,
            rng: Some(rng),
        }
    }

    pub(crate) const fn inactive() -> Self {
        Self { rate: 0.0, rng: None }
    }

    /// Mask of `0` (dropped) or `1 / (1 - rate)` (kept) entries.
    #[expect(
        clippy::float_arithmetic,
        reason = "kept entries are rescaled by the keep probability"
    )]
    pub(crate) fn mask(&mut self, rows: usize, cols: usize) -> Array2<f64> {
        let rate = self.rate;
        match self.rng.as_deref_mut() {
            Some(rng) if rate > 0.0 => {
                let keep = 1.0 / (1.0 - rate);
                Array2::from_shape_fn((rows, cols), |_| {
                    if rng.r#gen::<f64>() < rate { 0.0 } else { keep }
                })
            }
            _ => Array2::ones((rows, cols)),
        }
    }
}

/// Rectified linear unit.
pub(crate) fn relu(x: f64) -> f64 {
    x.max(0.0)
}

/// Derivative of [`relu`] evaluated at the pre-activation.
pub(crate) fn relu_slope(x: f64) -> f64 {
    if x > 0.0 { 1.0 } else { 0.0 }
}

/// Exponential linear unit with unit scale.
#[expect(clippy::float_arithmetic, reason = "ELU is exp(x) - 1 for negatives")]
pub(crate) fn elu(x: f64) -> f64 {
    if x > 0.0 { x } else { x.exp_m1() }
}

/// Derivative of [`elu`] evaluated at the pre-activation.
pub(crate) fn elu_slope(x: f64) -> f64 {
    if x > 0.0 { 1.0 } else { x.exp() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rstest::rstest;

    #[rstest]
    fn softmax_rows_sum_to_one_and_ignore_masked_entries() {
        let logits = array![[0.0, MASKED_LOGIT, 1.0], [2.0, 2.0, 2.0]];
        let alpha = softmax_rows(logits);
        for row in alpha.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        assert_eq!(alpha[[0, 1]], 0.0);
        assert!((alpha[[1, 0]] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[rstest]
    fn dropout_mask_rescales_kept_entries() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut dropout = Dropout::training(0.5, &mut rng);
        let mask = dropout.mask(20, 20);
        assert!(mask.iter().all(|&v| v == 0.0 || v == 2.0));
        assert!(mask.iter().any(|&v| v == 0.0));
        assert!(Dropout::inactive().mask(2, 2).iter().all(|&v| v == 1.0));
    }

    #[rstest]
    fn linear_init_respects_fan_in_bound() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let layer = Linear::new(4, 3, &mut rng);
        assert!(layer.weight.iter().all(|w| w.abs() <= 0.5));
        assert!(layer.bias.iter().all(|b| b.abs() <= 0.5));
    }

    #[rstest]
    fn linear_broadcasts_bias_over_rows() {
        let layer = Linear {
            weight: array![[1.0, 0.0], [0.0, 2.0]],
            bias: array![[0.5, -1.0]],
        };
        let out = layer.forward(&array![[1.0, 1.0], [3.0, 0.0]]);
        assert_eq!(out, array![[1.5, 1.0], [3.5, -1.0]]);
        let grads = layer.backward(&array![[1.0, 1.0], [3.0, 0.0]], &array![[1.0, 0.0], [1.0, 1.0]]);
        assert_eq!(grads.bias, array![[2.0, 1.0]]);
        assert_eq!(grads.weight, array![[4.0, 3.0], [1.0, 0.0]]);
        assert_eq!(grads.input, array![[1.0, 0.0], [1.0, 2.0]]);
    }

    #[rstest]
    fn hstack_places_right_columns_after_left() {
        let joined = hstack(&array![[1.0], [2.0]], &array![[3.0, 4.0], [5.0, 6.0]]);
        assert_eq!(joined, array![[1.0, 3.0, 4.0], [2.0, 5.0, 6.0]]);
    }

    /// Reference softmax-row gradient that recomputes the row reduction for
    /// every entry.
    #[expect(clippy::float_arithmetic, reason = "reference gradient maths")]
    fn naive_logit_gradient(alpha: &Array2<f64>, d_alpha: &Array2<f64>) -> Array2<f64> {
        Array2::from_shape_fn(alpha.raw_dim(), |(i, j)| {
            let row_dot: f64 = alpha.row(i).iter().zip(d_alpha.row(i)).map(|(a, d)| a * d).sum();
            alpha[[i, j]] * (d_alpha[[i, j]] - row_dot)
        })
    }

    #[rstest]
    #[expect(clippy::float_arithmetic, reason = "gradient comparison")]
    fn attention_backward_matches_per_entry_softmax_gradient() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let layer = Attention::new(2, 3, &mut rng);
        let x = array![[0.2, -0.4], [1.0, 0.3], [-0.5, 0.8], [0.1, 0.1]];
        let adjacency = Array2::ones((4, 4));
        let (_, trace) = layer.forward(&x, &adjacency, &mut Dropout::inactive());
        let grad = array![[0.3, -0.1, 0.2], [0.0, 0.5, -0.2], [0.1, 0.1, 0.1], [-0.3, 0.2, 0.0]];
        let grads = layer.backward(&x, &adjacency, &trace, &grad);

        let d_alpha = grad.dot(&trace.projected.t());
        let d_logits = naive_logit_gradient(&trace.alpha, &d_alpha)
            * &trace.logits.mapv(leaky_relu_slope);
        let d_src = d_logits.sum_axis(Axis(1)).insert_axis(Axis(1));
        let expected = trace.projected.t().dot(&d_src);
        for (got, want) in grads.a_src.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-12, "{got} vs {want}");
        }
    }
}
