//! Two-layer graph convolution regressor.

use ndarray::Array2;
use rand_chacha::ChaCha8Rng;

use super::GraphModel;
use super::layers::{Dropout, Linear, relu, relu_slope};

/// `Â · drop(relu(Â · X · W1 + b1)) · W2 + b2` over the normalised adjacency.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Gcn {
    hidden: Linear,
    output: Linear,
}

pub(crate) struct GcnTrace {
    propagated: Array2<f64>,
    pre: Array2<f64>,
    mask: Array2<f64>,
    smoothed: Array2<f64>,
}

impl Gcn {
    pub(crate) fn new(inputs: usize, hidden: usize, rng: &mut ChaCha8Rng) -> Self {
        let hidden_layer = Linear::new(inputs, hidden, rng);
        let output = Linear::new(hidden, 1, rng);
        Self {
            hidden: hidden_layer,
            output,
        }
    }
}

impl GraphModel for Gcn {
    type Trace = GcnTrace;

    fn forward(
        &self,
        x: &Array2<f64>,
        graph: &Array2<f64>,
        dropout: &mut Dropout<'_>,
    ) -> (Array2<f64>, GcnTrace) {
        let propagated = graph.dot(x);
        let pre = self.hidden.forward(&propagated);
        let mask = dropout.mask(pre.nrows(), pre.ncols());
        let activated = pre.mapv(relu) * &mask;
        let smoothed = graph.dot(&activated);
        let out = self.output.forward(&smoothed);
        (
            out,
            GcnTrace {
                propagated,
                pre,
                mask,
                smoothed,
            },
        )
    }

    fn backward(
        &self,
        _x: &Array2<f64>,
        graph: &Array2<f64>,
        trace: &GcnTrace,
        grad: &Array2<f64>,
    ) -> Vec<Array2<f64>> {
        let output = self.output.backward(&trace.smoothed, grad);
        let d_activated = graph.t().dot(&output.input);
        let d_pre = d_activated * &trace.mask * &trace.pre.mapv(relu_slope);
        let hidden = self.hidden.backward(&trace.propagated, &d_pre);
        vec![hidden.weight, hidden.bias, output.weight, output.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Array2<f64>> {
        vec![
            &mut self.hidden.weight,
            &mut self.hidden.bias,
            &mut self.output.weight,
            &mut self.output.bias,
        ]
    }
}
