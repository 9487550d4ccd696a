//! Two-layer graph attention regressor.

use ndarray::Array2;
use rand_chacha::ChaCha8Rng;

use super::GraphModel;
use super::layers::{Attention, AttentionTrace, Dropout, elu, elu_slope};

/// `att2(drop(elu(att1(X))))`, attending over the raw adjacency with
/// self-loops.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Gat {
    first: Attention,
    second: Attention,
}

pub(crate) struct GatTrace {
    first: AttentionTrace,
    pre: Array2<f64>,
    mask: Array2<f64>,
    hidden: Array2<f64>,
    second: AttentionTrace,
}

impl Gat {
    pub(crate) fn new(inputs: usize, hidden: usize, rng: &mut ChaCha8Rng) -> Self {
        let first = Attention::new(inputs, hidden, rng);
        let second = Attention::new(hidden, 1, rng);
        Self { first, second }
    }
}

impl GraphModel for Gat {
    type Trace = GatTrace;

    fn forward(
        &self,
        x: &Array2<f64>,
        graph: &Array2<f64>,
        dropout: &mut Dropout<'_>,
    ) -> (Array2<f64>, GatTrace) {
        let (pre, first) = self.first.forward(x, graph, dropout);
        let mask = dropout.mask(pre.nrows(), pre.ncols());
        let hidden = pre.mapv(elu) * &mask;
        let (out, second) = self.second.forward(&hidden, graph, dropout);
        (
            out,
            GatTrace {
                first,
                pre,
                mask,
                hidden,
                second,
            },
        )
    }

    fn backward(
        &self,
        x: &Array2<f64>,
        graph: &Array2<f64>,
        trace: &GatTrace,
        grad: &Array2<f64>,
    ) -> Vec<Array2<f64>> {
        let second = self
            .second
            .backward(&trace.hidden, graph, &trace.second, grad);
        let d_pre = second.input * &trace.mask * &trace.pre.mapv(elu_slope);
        let first = self.first.backward(x, graph, &trace.first, &d_pre);
        vec![
            first.weight,
            first.a_src,
            first.a_dst,
            second.weight,
            second.a_src,
            second.a_dst,
        ]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Array2<f64>> {
        vec![
            &mut self.first.weight,
            &mut self.first.a_src,
            &mut self.first.a_dst,
            &mut self.second.weight,
            &mut self.second.a_src,
            &mut self.second.a_dst,
        ]
    }
}
