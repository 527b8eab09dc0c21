//! Portable checkpoint artifact.
//!
//! A checkpoint is a snapshot of the network parameters plus the metadata
//! needed to reproduce or consume the run. Two checkpoints persist per
//! training run: "final" (last epoch, unconditionally overwritten) and
//! "best" (overwritten only when an epoch's mean loss strictly improves on
//! the running minimum). Checkpoints are never mutated after creation.

use chrono::{DateTime, Utc};
use helmsman_replay::schema::Schema;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::{linear::Linear, network::QNetwork};

/// Snapshot of trained parameters plus training metadata, serialized as
/// JSON.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Checkpoint {
    /// Length of the state vectors the network was trained on.
    pub state_dim: usize,
    /// Number of discrete actions.
    pub num_actions: usize,
    /// Epoch (1-indexed) at which the snapshot was taken.
    pub epoch: usize,
    /// Mean batch loss of that epoch.
    pub loss: f32,
    /// Discount factor the run used.
    pub gamma: f32,
    /// Whether Double-DQN target computation was used.
    pub double_dqn: bool,
    /// When the snapshot was taken.
    pub trained_at: DateTime<Utc>,
    /// Layer parameters, input side first.
    pub layers: Vec<LayerParams>,
}

/// One linear layer's parameters; weight shape is `[out_dim][in_dim]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LayerParams {
    /// Weight matrix rows, one per output unit.
    pub weight: Vec<Vec<f32>>,
    /// Bias vector, one entry per output unit.
    pub bias: Vec<f32>,
}

/// A loaded checkpoint whose layer shapes do not form a valid network.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum CheckpointError {
    /// Wrong number of layers for the three-layer architecture.
    #[display("checkpoint has {actual} layers, expected {expected}")]
    LayerCount {
        /// Expected layer count.
        expected: usize,
        /// Observed layer count.
        actual: usize,
    },
    /// A layer's weight rows or bias length are inconsistent, or adjacent
    /// layers do not chain.
    #[display("checkpoint layer {index} has an inconsistent shape")]
    LayerShape {
        /// Index of the offending layer, input side first.
        index: usize,
    },
}

impl Checkpoint {
    /// Snapshots a network's parameters with the run's metadata.
    #[must_use]
    pub fn from_network(
        network: &QNetwork,
        epoch: usize,
        loss: f32,
        gamma: f32,
        double_dqn: bool,
    ) -> Self {
        let schema = network.schema();
        let layers = network
            .layers()
            .iter()
            .map(|layer| LayerParams {
                weight: layer.weight().rows().into_iter().map(|r| r.to_vec()).collect(),
                bias: layer.bias().to_vec(),
            })
            .collect();
        Self {
            state_dim: schema.state_dim,
            num_actions: schema.num_actions,
            epoch,
            loss,
            gamma,
            double_dqn,
            trained_at: Utc::now(),
            layers,
        }
    }

    /// The schema recorded in the checkpoint.
    #[must_use]
    pub fn schema(&self) -> Schema {
        Schema {
            state_dim: self.state_dim,
            num_actions: self.num_actions,
        }
    }

    /// Reconstructs the network from the stored parameters, validating all
    /// layer shapes.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] if the layer count is not three, a
    /// layer's rows are ragged, a bias length disagrees with its weight, or
    /// the layer dimensions do not chain from `state_dim` to `num_actions`.
    pub fn to_network(&self) -> Result<QNetwork, CheckpointError> {
        if self.layers.len() != 3 {
            return Err(CheckpointError::LayerCount {
                expected: 3,
                actual: self.layers.len(),
            });
        }
        let mut linears = vec![];
        for (index, params) in self.layers.iter().enumerate() {
            linears.push(layer_from_params(params).ok_or(CheckpointError::LayerShape { index })?);
        }
        let l3 = linears.pop().expect("three layers were built");
        let l2 = linears.pop().expect("three layers were built");
        let l1 = linears.pop().expect("three layers were built");
        QNetwork::from_layers(l1, l2, l3, self.schema())
            .ok_or(CheckpointError::LayerShape { index: 0 })
    }
}

fn layer_from_params(params: &LayerParams) -> Option<Linear> {
    let out_dim = params.weight.len();
    let in_dim = params.weight.first()?.len();
    if params.weight.iter().any(|row| row.len() != in_dim) {
        return None;
    }
    let mut weight = Array2::zeros((out_dim, in_dim));
    for (i, row) in params.weight.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            weight[[i, j]] = v;
        }
    }
    Linear::from_params(weight, Array1::from_vec(params.bias.clone()))
}
