//! The Q-value function approximator.
//!
//! A feed-forward network mapping a state vector to one value per discrete
//! action: `state_dim -> 128 -> ReLU -> 128 -> ReLU -> num_actions`. The
//! network holds no state beyond its parameters; evaluation takes `&self`
//! and is safe to call from read-only contexts.

use helmsman_replay::schema::Schema;
use ndarray::{Array1, Array2, Axis};
use rand::Rng;

use crate::linear::Linear;

/// Width of both hidden layers.
pub const HIDDEN_DIM: usize = 128;

/// Feed-forward Q-network: `state_dim -> 128 -> 128 -> num_actions`.
#[derive(Debug, Clone)]
pub struct QNetwork {
    pub(crate) l1: Linear,
    pub(crate) l2: Linear,
    pub(crate) l3: Linear,
    schema: Schema,
}

impl QNetwork {
    /// Builds a freshly initialized network for the given schema
    /// (Xavier-uniform weights, zero biases).
    #[must_use]
    pub fn new<R>(schema: Schema, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self {
            l1: Linear::xavier_uniform(schema.state_dim, HIDDEN_DIM, rng),
            l2: Linear::xavier_uniform(HIDDEN_DIM, HIDDEN_DIM, rng),
            l3: Linear::xavier_uniform(HIDDEN_DIM, schema.num_actions, rng),
            schema,
        }
    }

    /// Wraps three existing layers, checking that their dimensions chain
    /// correctly and match the schema.
    #[must_use]
    pub fn from_layers(l1: Linear, l2: Linear, l3: Linear, schema: Schema) -> Option<Self> {
        let chains = l1.in_dim() == schema.state_dim
            && l2.in_dim() == l1.out_dim()
            && l3.in_dim() == l2.out_dim()
            && l3.out_dim() == schema.num_actions;
        chains.then_some(Self { l1, l2, l3, schema })
    }

    /// The schema this network was built for.
    #[must_use]
    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// The three linear layers, input side first.
    #[must_use]
    pub fn layers(&self) -> [&Linear; 3] {
        [&self.l1, &self.l2, &self.l3]
    }

    /// Evaluates Q-values for a batch of states (`N x state_dim`), returning
    /// one row of `num_actions` values per state.
    #[must_use]
    pub fn forward(&self, states: &Array2<f32>) -> Array2<f32> {
        let a1 = relu(self.l1.forward(states));
        let a2 = relu(self.l2.forward(&a1));
        self.l3.forward(&a2)
    }

    /// Forward pass that keeps the intermediate activations needed for
    /// backpropagation.
    pub(crate) fn forward_cached(&self, states: &Array2<f32>) -> ForwardCache {
        let z1 = self.l1.forward(states);
        let a1 = relu(z1.clone());
        let z2 = self.l2.forward(&a1);
        let a2 = relu(z2.clone());
        let q = self.l3.forward(&a2);
        ForwardCache {
            x: states.clone(),
            z1,
            a1,
            z2,
            a2,
            q,
        }
    }

    /// Backpropagates `dq` (gradient of the loss with respect to the output
    /// Q-values) through the cached forward pass.
    pub(crate) fn backward(&self, cache: &ForwardCache, dq: &Array2<f32>) -> NetworkGrads {
        let l3 = LinearGrads {
            weight: dq.t().dot(&cache.a2),
            bias: dq.sum_axis(Axis(0)),
        };
        let dz2 = dq.dot(&self.l3.weight) * relu_mask(&cache.z2);
        let l2 = LinearGrads {
            weight: dz2.t().dot(&cache.a1),
            bias: dz2.sum_axis(Axis(0)),
        };
        let dz1 = dz2.dot(&self.l2.weight) * relu_mask(&cache.z1);
        let l1 = LinearGrads {
            weight: dz1.t().dot(&cache.x),
            bias: dz1.sum_axis(Axis(0)),
        };
        NetworkGrads { l1, l2, l3 }
    }

    /// Copies `other`'s parameters into this network verbatim (hard sync).
    ///
    /// # Panics
    ///
    /// Panics if the two networks have different schemas.
    pub fn sync_from(&mut self, other: &QNetwork) {
        assert_eq!(self.schema, other.schema, "cannot sync across schemas");
        self.l1 = other.l1.clone();
        self.l2 = other.l2.clone();
        self.l3 = other.l3.clone();
    }
}

fn relu(z: Array2<f32>) -> Array2<f32> {
    z.mapv(|v| v.max(0.0))
}

fn relu_mask(z: &Array2<f32>) -> Array2<f32> {
    z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
}

/// Intermediate activations from one forward pass.
pub(crate) struct ForwardCache {
    pub x: Array2<f32>,
    pub z1: Array2<f32>,
    pub a1: Array2<f32>,
    pub z2: Array2<f32>,
    pub a2: Array2<f32>,
    pub q: Array2<f32>,
}

/// Per-parameter gradients, shaped like the network.
#[derive(Debug, Clone)]
pub(crate) struct NetworkGrads {
    pub l1: LinearGrads,
    pub l2: LinearGrads,
    pub l3: LinearGrads,
}

#[derive(Debug, Clone)]
pub(crate) struct LinearGrads {
    pub weight: Array2<f32>,
    pub bias: Array1<f32>,
}

impl NetworkGrads {
    /// Zero gradients shaped like `network`'s parameters.
    pub fn zeros_like(network: &QNetwork) -> Self {
        let zeros = |layer: &Linear| LinearGrads {
            weight: Array2::zeros(layer.weight.dim()),
            bias: Array1::zeros(layer.bias.len()),
        };
        Self {
            l1: zeros(&network.l1),
            l2: zeros(&network.l2),
            l3: zeros(&network.l3),
        }
    }

    /// Sum of squares over every gradient entry.
    pub fn squared_norm(&self) -> f32 {
        [&self.l1, &self.l2, &self.l3]
            .iter()
            .map(|g| {
                g.weight.iter().map(|v| v * v).sum::<f32>()
                    + g.bias.iter().map(|v| v * v).sum::<f32>()
            })
            .sum()
    }

    /// Scales every gradient entry by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for g in [&mut self.l1, &mut self.l2, &mut self.l3] {
            g.weight.mapv_inplace(|v| v * factor);
            g.bias.mapv_inplace(|v| v * factor);
        }
    }
}
