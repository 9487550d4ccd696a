//! Message-passing scorers trained on the derived target.
//!
//! Three architectures share the ndarray layers, one Adam optimiser and one
//! trainer:
//! - [`GnnArchitecture::Gcn`] propagates over the symmetric-normalised
//!   adjacency before each linear layer.
//! - [`GnnArchitecture::GraphSage`] concatenates each node's features with the
//!   row-mean of its neighbourhood.
//! - [`GnnArchitecture::Gat`] learns attention over the raw adjacency with
//!   self-loops.
//!
//! A single `ChaCha8Rng` seeded from the run seed drives weight
//! initialisation, the train/validation shuffle and every dropout mask, in
//! that order.

use log::info;
use ndarray::{Array2, arr2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use siteplan_core::{
    DenseAdjacency, FEATURE_COUNT, FeatureTable, GnnConfig, ModelMetadata, NodeScorer,
    ScoreAssignment, ScoreOutcome, ScoringError, ScoringVariant, min_max_scale,
};

use crate::target::derive_target;

mod adam;
mod gat;
mod gcn;
mod layers;
mod sage;
mod train;

use gat::Gat;
use gcn::Gcn;
use layers::Dropout;
use sage::GraphSage;

/// A differentiable model mapping node features and a graph operator to one
/// output per node.
pub(crate) trait GraphModel: Clone {
    /// Intermediate values needed by [`GraphModel::backward`].
    type Trace;

    /// Compute the `n × 1` output.
    fn forward(
        &self,
        x: &Array2<f64>,
        graph: &Array2<f64>,
        dropout: &mut Dropout<'_>,
    ) -> (Array2<f64>, Self::Trace);

    /// Gradients of every parameter, in [`GraphModel::parameters_mut`] order.
    fn backward(
        &self,
        x: &Array2<f64>,
        graph: &Array2<f64>,
        trace: &Self::Trace,
        grad: &Array2<f64>,
    ) -> Vec<Array2<f64>>;

    /// Mutable views of every trainable parameter.
    fn parameters_mut(&mut self) -> Vec<&mut Array2<f64>>;
}

/// Message-passing architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GnnArchitecture {
    /// Graph convolution.
    Gcn,
    /// GraphSAGE with mean aggregation.
    GraphSage,
    /// Graph attention.
    Gat,
}

impl GnnArchitecture {
    /// Architecture for a graph-network variant, `None` otherwise.
    #[must_use]
    pub const fn from_variant(variant: ScoringVariant) -> Option<Self> {
        match variant {
            ScoringVariant::Gcn => Some(Self::Gcn),
            ScoringVariant::GraphSage => Some(Self::GraphSage),
            ScoringVariant::Gat => Some(Self::Gat),
            ScoringVariant::WeightedSum | ScoringVariant::RidgeDiffusion => None,
        }
    }

    /// Matching scoring variant.
    #[must_use]
    pub const fn variant(self) -> ScoringVariant {
        match self {
            Self::Gcn => ScoringVariant::Gcn,
            Self::GraphSage => ScoringVariant::GraphSage,
            Self::Gat => ScoringVariant::Gat,
        }
    }
}

/// Scorer that trains a two-layer message-passing network per run.
///
/// # Examples
/// ```
/// use siteplan_core::{GnnConfig, NodeScorer, test_support::grid_table};
/// use siteplan_scorer::{GnnArchitecture, GnnScorer};
///
/// let config = GnnConfig { epochs: 5, hidden_dim: 4, ..GnnConfig::default() };
/// let scorer = GnnScorer::new(GnnArchitecture::Gcn, config, 3.0, 42);
/// let outcome = scorer.score(&grid_table(6))?;
/// assert_eq!(outcome.assignment.len(), 6);
/// assert!(outcome.metadata.validation_mse.is_some());
/// # Ok::<(), siteplan_core::ScoringError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GnnScorer {
    architecture: GnnArchitecture,
    config: GnnConfig,
    edge_radius_km: f64,
    seed: u64,
}

impl GnnScorer {
    /// Create a scorer for `architecture` with candidate edges within
    /// `edge_radius_km`.
    #[must_use]
    pub const fn new(
        architecture: GnnArchitecture,
        config: GnnConfig,
        edge_radius_km: f64,
        seed: u64,
    ) -> Self {
        Self {
            architecture,
            config,
            edge_radius_km,
            seed,
        }
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "layer widths and epoch counts are small"
    )]
    fn metadata(&self) -> ModelMetadata {
        ModelMetadata::new(self.variant())
            .with_hyperparameter("hidden_dim", self.config.hidden_dim as f64)
            .with_hyperparameter("epochs", self.config.epochs as f64)
            .with_hyperparameter("learning_rate", self.config.learning_rate)
            .with_hyperparameter("weight_decay", self.config.weight_decay)
            .with_hyperparameter("dropout", self.config.dropout)
            .with_hyperparameter("edge_radius_km", self.edge_radius_km)
    }

    fn fit<M: GraphModel>(
        &self,
        model: M,
        x: &Array2<f64>,
        graph: &Array2<f64>,
        target: &[f64],
        rng: &mut ChaCha8Rng,
    ) -> Result<(Vec<f64>, Option<f64>), ScoringError> {
        let trained = train::train(model, x, graph, target, &self.config, rng)?;
        Ok((
            train::predict(&trained.model, x, graph),
            trained.validation_mse,
        ))
    }
}

impl NodeScorer for GnnScorer {
    fn variant(&self) -> ScoringVariant {
        self.architecture.variant()
    }

    fn score(&self, table: &FeatureTable) -> Result<ScoreOutcome, ScoringError> {
        let target = derive_target(table);
        let mut metadata = self.metadata().with_target(target.source);
        if table.is_empty() {
            return Ok(ScoreOutcome {
                assignment: ScoreAssignment::default(),
                base_scores: None,
                metadata,
            });
        }

        let n = table.len();
        let x = arr2(table.rows().as_slice());
        let adjacency = DenseAdjacency::with_self_loops(&table.locations(), self.edge_radius_km);
        let graph = match self.architecture {
            GnnArchitecture::Gat => adjacency.matrix().clone(),
            GnnArchitecture::Gcn | GnnArchitecture::GraphSage => {
                adjacency.normalised().matrix().clone()
            }
        };

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let hidden = self.config.hidden_dim;
        let (predictions, validation_mse) = match self.architecture {
            GnnArchitecture::Gcn => {
                let model = Gcn::new(FEATURE_COUNT, hidden, &mut rng);
                self.fit(model, &x, &graph, &target.values, &mut rng)?
            }
            GnnArchitecture::GraphSage => {
                let model = GraphSage::new(FEATURE_COUNT, hidden, &mut rng);
                self.fit(model, &x, &graph, &target.values, &mut rng)?
            }
            GnnArchitecture::Gat => {
                let model = Gat::new(FEATURE_COUNT, hidden, &mut rng);
                self.fit(model, &x, &graph, &target.values, &mut rng)?
            }
        };
        info!(
            "{} trained on {n} candidates from {}",
            self.architecture.variant(),
            target.source
        );

        metadata.validation_mse = validation_mse;
        let scores = min_max_scale(&predictions);
        Ok(ScoreOutcome {
            assignment: ScoreAssignment::new(table, &scores)?,
            base_scores: None,
            metadata,
        })
    }
}
