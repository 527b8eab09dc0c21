//! Adam optimizer over the Q-network's parameters.
//!
//! Standard first/second-moment adaptive gradient steps with bias
//! correction; moment estimates are shaped like the network and owned by
//! the optimizer.

use ndarray::{Array, Dimension, Zip};

use crate::network::{NetworkGrads, QNetwork};

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const EPSILON: f32 = 1e-8;

#[derive(Debug)]
pub(crate) struct Adam {
    learning_rate: f32,
    timestep: i32,
    m: NetworkGrads,
    v: NetworkGrads,
}

impl Adam {
    pub fn new(learning_rate: f32, network: &QNetwork) -> Self {
        Self {
            learning_rate,
            timestep: 0,
            m: NetworkGrads::zeros_like(network),
            v: NetworkGrads::zeros_like(network),
        }
    }

    /// Applies one optimization step to `network` given `grads`.
    pub fn step(&mut self, network: &mut QNetwork, grads: &NetworkGrads) {
        self.timestep += 1;
        let bias1 = 1.0 - BETA1.powi(self.timestep);
        let bias2 = 1.0 - BETA2.powi(self.timestep);
        let lr = self.learning_rate;

        update(&mut network.l1.weight, &grads.l1.weight, &mut self.m.l1.weight, &mut self.v.l1.weight, lr, bias1, bias2);
        update(&mut network.l1.bias, &grads.l1.bias, &mut self.m.l1.bias, &mut self.v.l1.bias, lr, bias1, bias2);
        update(&mut network.l2.weight, &grads.l2.weight, &mut self.m.l2.weight, &mut self.v.l2.weight, lr, bias1, bias2);
        update(&mut network.l2.bias, &grads.l2.bias, &mut self.m.l2.bias, &mut self.v.l2.bias, lr, bias1, bias2);
        update(&mut network.l3.weight, &grads.l3.weight, &mut self.m.l3.weight, &mut self.v.l3.weight, lr, bias1, bias2);
        update(&mut network.l3.bias, &grads.l3.bias, &mut self.m.l3.bias, &mut self.v.l3.bias, lr, bias1, bias2);
    }
}

fn update<D>(
    param: &mut Array<f32, D>,
    grad: &Array<f32, D>,
    m: &mut Array<f32, D>,
    v: &mut Array<f32, D>,
    lr: f32,
    bias1: f32,
    bias2: f32,
) where
    D: Dimension,
{
    Zip::from(param)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = BETA1 * *m + (1.0 - BETA1) * g;
            *v = BETA2 * *v + (1.0 - BETA2) * g * g;
            let m_hat = *m / bias1;
            let v_hat = *v / bias2;
            *p -= lr * m_hat / (v_hat.sqrt() + EPSILON);
        });
}

#[cfg(test)]
mod tests {
    use helmsman_replay::schema::Schema;
    use rand::{SeedableRng as _, rngs::StdRng};

    use super::*;

    #[test]
    fn test_step_moves_against_gradient() {
        let mut rng = StdRng::seed_from_u64(5);
        let schema = Schema {
            state_dim: 2,
            num_actions: 2,
        };
        let mut net = QNetwork::new(schema, &mut rng);
        let before = net.l1.weight[[0, 0]];

        let mut grads = NetworkGrads::zeros_like(&net);
        grads.l1.weight[[0, 0]] = 1.0;
        let mut adam = Adam::new(1e-2, &net);
        adam.step(&mut net, &grads);

        // First step with bias correction moves by ~lr against the gradient.
        let delta = net.l1.weight[[0, 0]] - before;
        assert!(delta < 0.0);
        assert!((delta + 1e-2).abs() < 1e-4);
    }

    #[test]
    fn test_zero_gradient_leaves_params_unchanged() {
        let mut rng = StdRng::seed_from_u64(6);
        let schema = Schema {
            state_dim: 3,
            num_actions: 2,
        };
        let mut net = QNetwork::new(schema, &mut rng);
        let snapshot = net.clone();

        let grads = NetworkGrads::zeros_like(&net);
        let mut adam = Adam::new(1e-2, &net);
        adam.step(&mut net, &grads);

        assert_eq!(net.l1.weight, snapshot.l1.weight);
        assert_eq!(net.l3.bias, snapshot.l3.bias);
    }
}
