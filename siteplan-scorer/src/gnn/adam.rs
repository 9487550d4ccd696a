//! Adam optimiser with coupled L2 weight decay.

use ndarray::{Array2, Zip};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-8;

/// Per-parameter first and second moment estimates.
#[derive(Debug, Clone)]
pub(crate) struct Adam {
    learning_rate: f64,
    weight_decay: f64,
    beta1_power: f64,
    beta2_power: f64,
    first: Vec<Array2<f64>>,
    second: Vec<Array2<f64>>,
}

impl Adam {
    pub(crate) const fn new(learning_rate: f64, weight_decay: f64) -> Self {
        Self {
            learning_rate,
            weight_decay,
            beta1_power: 1.0,
            beta2_power: 1.0,
            first: Vec::new(),
            second: Vec::new(),
        }
    }

    /// Apply one update. `grads` must follow the order of `params`.
    ///
    /// The decay term `weight_decay * param` is added to each gradient before
    /// the moment updates.
    #[expect(
        clippy::float_arithmetic,
        reason = "Adam moment updates are floating-point"
    )]
    pub(crate) fn step(&mut self, params: Vec<&mut Array2<f64>>, grads: &[Array2<f64>]) {
        if self.first.len() != params.len() {
            self.first = params.iter().map(|p| Array2::zeros(p.raw_dim())).collect();
            self.second = self.first.clone();
        }
        self.beta1_power *= BETA1;
        self.beta2_power *= BETA2;
        let correction1 = 1.0 - self.beta1_power;
        let correction2 = 1.0 - self.beta2_power;
        let (learning_rate, weight_decay) = (self.learning_rate, self.weight_decay);

        for (((param, grad), first), second) in params
            .into_iter()
            .zip(grads)
            .zip(&mut self.first)
            .zip(&mut self.second)
        {
            Zip::from(param)
                .and(grad)
                .and(first)
                .and(second)
                .for_each(|p, &g, m, v| {
                    let decayed = g + weight_decay * *p;
                    *m = BETA1 * *m + (1.0 - BETA1) * decayed;
                    *v = BETA2 * *v + (1.0 - BETA2) * decayed * decayed;
                    let m_hat = *m / correction1;
                    let v_hat = *v / correction2;
                    *p -= learning_rate * m_hat / (v_hat.sqrt() + EPSILON);
                });
        }
    }
}
