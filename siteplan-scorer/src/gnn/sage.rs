//! Two-layer GraphSAGE regressor with mean aggregation.

use ndarray::{Array2, Axis};
use rand_chacha::ChaCha8Rng;

use super::GraphModel;
use super::layers::{Dropout, Linear, hstack, relu, relu_slope};

/// Each layer sees `[H | P · H]`, where `P` divides every adjacency row by
/// its sum (clamped to at least one).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GraphSage {
    hidden: Linear,
    output: Linear,
}

pub(crate) struct SageTrace {
    operator: Array2<f64>,
    input: Array2<f64>,
    pre: Array2<f64>,
    mask: Array2<f64>,
    joined: Array2<f64>,
}

impl GraphSage {
    pub(crate) fn new(inputs: usize, hidden: usize, rng: &mut ChaCha8Rng) -> Self {
        let hidden_layer = Linear::new(inputs * 2, hidden, rng);
        let output = Linear::new(hidden * 2, 1, rng);
        Self {
            hidden: hidden_layer,
            output,
        }
    }
}

fn mean_operator(graph: &Array2<f64>) -> Array2<f64> {
    let inverse = graph
        .sum_axis(Axis(1))
        .mapv(|total| total.max(1.0).recip())
        .insert_axis(Axis(1));
    graph * &inverse
}

impl GraphModel for GraphSage {
    type Trace = SageTrace;

    fn forward(
        &self,
        x: &Array2<f64>,
        graph: &Array2<f64>,
        dropout: &mut Dropout<'_>,
    ) -> (Array2<f64>, SageTrace) {
        let operator = mean_operator(graph);
        let input = hstack(x, &operator.dot(x));
        let pre = self.hidden.forward(&input);
        let mask = dropout.mask(pre.nrows(), pre.ncols());
        let activated = pre.mapv(relu) * &mask;
        let joined = hstack(&activated, &operator.dot(&activated));
        let out = self.output.forward(&joined);
        (
            out,
            SageTrace {
                operator,
                input,
                pre,
                mask,
                joined,
            },
        )
    }

    fn backward(
        &self,
        _x: &Array2<f64>,
        _graph: &Array2<f64>,
        trace: &SageTrace,
        grad: &Array2<f64>,
    ) -> Vec<Array2<f64>> {
        let output = self.output.backward(&trace.joined, grad);
        let (d_self, d_neighbours) = output.input.view().split_at(Axis(1), trace.pre.ncols());
        let d_activated = &d_self + &trace.operator.t().dot(&d_neighbours);
        let d_pre = d_activated * &trace.mask * &trace.pre.mapv(relu_slope);
        let hidden = self.hidden.backward(&trace.input, &d_pre);
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
