use ndarray::{Array1, Array2};
use rand::Rng;

/// A fully-connected layer: `y = x W^T + b`.
///
/// The weight matrix is stored `[out_dim, in_dim]`, matching the checkpoint
/// and export formats.
#[derive(Debug, Clone)]
pub struct Linear {
    pub(crate) weight: Array2<f32>,
    pub(crate) bias: Array1<f32>,
}

impl Linear {
    /// Creates a layer with Xavier/Glorot-uniform weights and zero biases.
    ///
    /// Weights are sampled uniformly from `[-limit, limit]` with
    /// `limit = sqrt(6 / (in_dim + out_dim))`, keeping initial output
    /// magnitudes small and stable.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn xavier_uniform<R>(in_dim: usize, out_dim: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let limit = (6.0 / (in_dim + out_dim) as f32).sqrt();
        let mut weight = Array2::zeros((out_dim, in_dim));
        for w in &mut weight {
            *w = rng.random_range(-limit..=limit);
        }
        Self {
            weight,
            bias: Array1::zeros(out_dim),
        }
    }

    /// Wraps existing parameters, checking that the bias length matches the
    /// weight's output dimension.
    #[must_use]
    pub fn from_params(weight: Array2<f32>, bias: Array1<f32>) -> Option<Self> {
        (weight.nrows() == bias.len()).then_some(Self { weight, bias })
    }

    /// Applies the layer to a batch of row vectors (`N x in_dim`).
    #[must_use]
    pub fn forward(&self, x: &Array2<f32>) -> Array2<f32> {
        x.dot(&self.weight.t()) + &self.bias
    }

    /// Input dimension.
    #[must_use]
    pub fn in_dim(&self) -> usize {
        self.weight.ncols()
    }

    /// Output dimension.
    #[must_use]
    pub fn out_dim(&self) -> usize {
        self.weight.nrows()
    }

    /// The weight matrix, `[out_dim, in_dim]`.
    #[must_use]
    pub fn weight(&self) -> &Array2<f32> {
        &self.weight
    }

    /// The bias vector, `[out_dim]`.
    #[must_use]
    pub fn bias(&self) -> &Array1<f32> {
        &self.bias
    }
}
