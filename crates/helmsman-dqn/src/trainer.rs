//! The optimization loop.
//!
//! The trainer owns the online network, a periodically-synchronized target
//! network, and the optimizer. Each epoch iterates shuffled mini-batches
//! drawn without replacement from the curated transition set (a fresh
//! shuffle per epoch). The caller drives the epoch loop and decides when to
//! write the checkpoints the trainer produces:
//!
//! ```rust,ignore
//! let mut trainer = Trainer::new(batch.schema, TrainConfig::default(), &mut rng);
//! for epoch in 1..=config.num_epochs {
//!     let loss = trainer.run_epoch(&batch, &mut rng)?;
//!     eprintln!("Epoch {epoch} - avg loss: {loss:.6}");
//! }
//! let best = trainer.best_checkpoint();
//! let last = trainer.final_checkpoint();
//! ```
//!
//! Both network instances are mutated only by the trainer. Target
//! parameters are read-only during batch processing and bulk-overwritten at
//! the epoch boundary - a single stop-the-world synchronization point
//! rather than fine-grained locking.

use helmsman_replay::{flatten::TransitionBatch, schema::Schema};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, seq::SliceRandom};

use crate::{
    adam::Adam,
    checkpoint::Checkpoint,
    loss::{huber, huber_grad},
    network::QNetwork,
};

/// Immutable configuration for one training run.
///
/// A run is fully reproducible from this value plus the RNG seed; there are
/// no other free parameters.
#[derive(Debug, Clone, Copy)]
pub struct TrainConfig {
    /// Mini-batch size.
    pub batch_size: usize,
    /// Number of epochs to run.
    pub num_epochs: usize,
    /// Discount factor for the bootstrapped target.
    pub gamma: f32,
    /// Adam learning rate.
    pub learning_rate: f32,
    /// Global gradient L2-norm ceiling.
    pub grad_clip_norm: f32,
    /// Double-DQN target computation (online selects, target evaluates)
    /// instead of vanilla max-based bootstrapping.
    pub double_dqn: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            num_epochs: 12,
            gamma: 0.95,
            learning_rate: 1e-4,
            grad_clip_norm: 1.0,
            double_dqn: true,
        }
    }
}

/// Errors raised by the training loop.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum TrainError {
    /// The transition set holds zero transitions.
    #[display("cannot train on an empty transition set")]
    EmptyDataset,
    /// The batch was flattened against a different schema than the trainer
    /// was built for.
    #[display("batch schema {actual:?} does not match trainer schema {expected:?}")]
    SchemaMismatch {
        /// The trainer's schema.
        expected: Schema,
        /// The batch's schema.
        actual: Schema,
    },
}

#[derive(Debug, Clone)]
struct EpochSnapshot {
    epoch: usize,
    loss: f32,
    network: QNetwork,
}

/// Owns both networks and the optimizer; runs epochs and tracks the best
/// parameter snapshot by mean epoch loss.
#[derive(Debug)]
pub struct Trainer {
    config: TrainConfig,
    schema: Schema,
    online: QNetwork,
    target: QNetwork,
    optimizer: Adam,
    epochs_run: usize,
    last: Option<EpochSnapshot>,
    best: Option<EpochSnapshot>,
}

impl Trainer {
    /// Builds a trainer with a freshly initialized online network and a
    /// target network starting as its verbatim copy.
    #[must_use]
    pub fn new<R>(schema: Schema, config: TrainConfig, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let online = QNetwork::new(schema, rng);
        let target = online.clone();
        let optimizer = Adam::new(config.learning_rate, &online);
        Self {
            config,
            schema,
            online,
            target,
            optimizer,
            epochs_run: 0,
            last: None,
            best: None,
        }
    }

    /// The configuration this trainer runs with.
    #[must_use]
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// The schema both networks were built for.
    #[must_use]
    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Number of epochs completed so far.
    #[must_use]
    pub fn epochs_run(&self) -> usize {
        self.epochs_run
    }

    /// The online network's current parameters.
    #[must_use]
    pub fn online(&self) -> &QNetwork {
        &self.online
    }

    /// Runs one epoch over the transition set and returns the mean batch
    /// loss.
    ///
    /// Mini-batch indices are reshuffled, each mini-batch is regressed
    /// toward its bootstrapped target, and at the epoch boundary the target
    /// network is hard-synced from the online network. The best snapshot is
    /// updated only when this epoch's mean loss strictly improves on the
    /// running minimum.
    ///
    /// # Errors
    ///
    /// * [`TrainError::EmptyDataset`] if `batch` holds no transitions
    /// * [`TrainError::SchemaMismatch`] if `batch` was flattened against a
    ///   different schema
    #[expect(clippy::cast_precision_loss)]
    pub fn run_epoch<R>(&mut self, batch: &TransitionBatch, rng: &mut R) -> Result<f32, TrainError>
    where
        R: Rng + ?Sized,
    {
        if batch.is_empty() {
            return Err(TrainError::EmptyDataset);
        }
        if batch.schema != self.schema {
            return Err(TrainError::SchemaMismatch {
                expected: self.schema,
                actual: batch.schema,
            });
        }

        let mut indices: Vec<usize> = (0..batch.len()).collect();
        indices.shuffle(rng);

        let mut total_loss = 0.0;
        let mut num_batches = 0usize;
        for chunk in indices.chunks(self.config.batch_size.max(1)) {
            total_loss += self.train_batch(batch, chunk);
            num_batches += 1;
        }
        let avg_loss = total_loss / num_batches.max(1) as f32;

        // Hard sync: the bootstrap target moves once per epoch, not per step.
        self.target.sync_from(&self.online);

        self.epochs_run += 1;
        let snapshot = EpochSnapshot {
            epoch: self.epochs_run,
            loss: avg_loss,
            network: self.online.clone(),
        };
        if self.best.as_ref().is_none_or(|b| avg_loss < b.loss) {
            self.best = Some(snapshot.clone());
        }
        self.last = Some(snapshot);

        Ok(avg_loss)
    }

    /// Checkpoint of the lowest-loss epoch seen so far, if any epoch ran.
    #[must_use]
    pub fn best_checkpoint(&self) -> Option<Checkpoint> {
        self.best.as_ref().map(|s| self.snapshot_checkpoint(s))
    }

    /// Checkpoint of the most recent epoch, if any epoch ran.
    #[must_use]
    pub fn final_checkpoint(&self) -> Option<Checkpoint> {
        self.last.as_ref().map(|s| self.snapshot_checkpoint(s))
    }

    fn snapshot_checkpoint(&self, snapshot: &EpochSnapshot) -> Checkpoint {
        Checkpoint::from_network(
            &snapshot.network,
            snapshot.epoch,
            snapshot.loss,
            self.config.gamma,
            self.config.double_dqn,
        )
    }

    /// One gradient step on a mini-batch; returns its mean Huber loss.
    #[expect(clippy::cast_precision_loss)]
    fn train_batch(&mut self, batch: &TransitionBatch, chunk: &[usize]) -> f32 {
        let states = batch.states.select(Axis(0), chunk);
        let next_states = batch.next_states.select(Axis(0), chunk);
        let rewards = Array1::from_iter(chunk.iter().map(|&i| batch.rewards[i]));
        let dones = Array1::from_iter(chunk.iter().map(|&i| batch.dones[i]));
        let actions: Vec<usize> = chunk.iter().map(|&i| batch.actions[i]).collect();

        let cache = self.online.forward_cached(&states);
        let targets = bootstrap_targets(
            &self.online,
            &self.target,
            &next_states,
            &rewards,
            &dones,
            self.config.gamma,
            self.config.double_dqn,
        );

        let n = chunk.len() as f32;
        let mut total_loss = 0.0;
        let mut dq = Array2::<f32>::zeros(cache.q.dim());
        for (row, (&action, &target)) in actions.iter().zip(targets.iter()).enumerate() {
            let residual = cache.q[[row, action]] - target;
            total_loss += huber(residual);
            dq[[row, action]] = huber_grad(residual) / n;
        }

        let mut grads = self.online.backward(&cache, &dq);
        clip_global_norm(&mut grads, self.config.grad_clip_norm);
        self.optimizer.step(&mut self.online, &grads);

        total_loss / n
    }
}

/// Computes the bootstrapped regression targets for a mini-batch.
///
/// This is a plain evaluation path: neither network is updated here, so no
/// gradient-suppression construct is needed. Double-DQN selects the next
/// action with the online network and evaluates it with the target network;
/// vanilla takes the target network's row maximum. The `(1 - done)` mask
/// zeroes the bootstrap on terminal transitions.
pub(crate) fn bootstrap_targets(
    online: &QNetwork,
    target: &QNetwork,
    next_states: &Array2<f32>,
    rewards: &Array1<f32>,
    dones: &Array1<f32>,
    gamma: f32,
    double_dqn: bool,
) -> Array1<f32> {
    let target_q = target.forward(next_states);
    let next_value: Array1<f32> = if double_dqn {
        let online_q = online.forward(next_states);
        let selected = argmax_rows(&online_q);
        Array1::from_iter(
            selected
                .iter()
                .enumerate()
                .map(|(row, &action)| target_q[[row, action]]),
        )
    } else {
        Array1::from_iter(
            target_q
                .rows()
                .into_iter()
                .map(|row| row.iter().copied().fold(f32::NEG_INFINITY, f32::max)),
        )
    };

    let mask = dones.mapv(|d| 1.0 - d);
    rewards + &(mask * next_value * gamma)
}

fn argmax_rows(q: &Array2<f32>) -> Vec<usize> {
    q.rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
                .map_or(0, |(i, _)| i)
        })
        .collect()
}

fn clip_global_norm(grads: &mut crate::network::NetworkGrads, max_norm: f32) {
    let norm = grads.squared_norm().sqrt();
    if norm > max_norm {
        grads.scale(max_norm / norm);
    }
}

#[cfg(test)]
mod tests {
    use helmsman_replay::{flatten, schema::Schema, transition::Transition};
    use ndarray::array;
    use rand::{SeedableRng as _, rngs::StdRng};

    use super::*;
    use crate::network::NetworkGrads;

    fn schema(state_dim: usize, num_actions: usize) -> Schema {
        Schema {
            state_dim,
            num_actions,
        }
    }

    fn toy_batch() -> TransitionBatch {
        // A two-state chain: action 1 from state [0] reaches the terminal
        // state [1] with reward 1; action 2 stays with reward 0.
        let transitions = vec![
            Transition {
                state: vec![0.0],
                action: 1,
                reward: 1.0,
                next_state: vec![1.0],
                done: true,
            },
            Transition {
                state: vec![0.0],
                action: 2,
                reward: 0.0,
                next_state: vec![0.0],
                done: false,
            },
        ];
        flatten::flatten(&transitions, schema(1, 2)).unwrap()
    }

    #[test]
    fn test_terminal_target_equals_reward_exactly() {
        let mut rng = StdRng::seed_from_u64(20);
        let online = QNetwork::new(schema(2, 3), &mut rng);
        let target = QNetwork::new(schema(2, 3), &mut rng);

        let next_states = array![[0.4, -0.2]];
        let rewards = array![1.0];
        let dones = array![1.0];
        let targets =
            bootstrap_targets(&online, &target, &next_states, &rewards, &dones, 0.95, true);
        assert_eq!(targets[0], 1.0);
    }

    #[test]
    fn test_nonterminal_target_includes_bootstrap() {
        let mut rng = StdRng::seed_from_u64(21);
        let online = QNetwork::new(schema(2, 3), &mut rng);
        let target = online.clone();

        let next_states = array![[0.4, -0.2]];
        let rewards = array![0.5];
        let dones = array![0.0];
        let targets =
            bootstrap_targets(&online, &target, &next_states, &rewards, &dones, 0.95, true);

        let q = target.forward(&next_states);
        let max_q = q.row(0).iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!((targets[0] - (0.5 + 0.95 * max_q)).abs() < 1e-6);
    }

    #[test]
    fn test_double_and_vanilla_agree_with_identical_networks() {
        let mut rng = StdRng::seed_from_u64(22);
        let online = QNetwork::new(schema(3, 4), &mut rng);
        let target = online.clone();

        let next_states = array![[0.1, 0.2, 0.3], [-0.5, 0.0, 0.5], [1.0, 1.0, 1.0]];
        let rewards = array![0.0, 1.0, -1.0];
        let dones = array![0.0, 0.0, 0.0];

        let double =
            bootstrap_targets(&online, &target, &next_states, &rewards, &dones, 0.95, true);
        let vanilla =
            bootstrap_targets(&online, &target, &next_states, &rewards, &dones, 0.95, false);
        assert_eq!(double, vanilla);
    }

    #[test]
    fn test_empty_dataset_is_fatal() {
        let mut rng = StdRng::seed_from_u64(23);
        let empty = flatten::flatten(&[], schema(1, 2)).unwrap();
        let mut trainer = Trainer::new(schema(1, 2), TrainConfig::default(), &mut rng);
        assert!(matches!(
            trainer.run_epoch(&empty, &mut rng),
            Err(TrainError::EmptyDataset)
        ));
        assert!(trainer.best_checkpoint().is_none());
        assert!(trainer.final_checkpoint().is_none());
    }

    #[test]
    fn test_schema_mismatch_is_rejected() {
        let mut rng = StdRng::seed_from_u64(24);
        let batch = toy_batch();
        let mut trainer = Trainer::new(schema(1, 3), TrainConfig::default(), &mut rng);
        assert!(matches!(
            trainer.run_epoch(&batch, &mut rng),
            Err(TrainError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_target_network_syncs_at_epoch_end() {
        let mut rng = StdRng::seed_from_u64(25);
        let batch = toy_batch();
        let mut trainer = Trainer::new(batch.schema, TrainConfig::default(), &mut rng);
        trainer.run_epoch(&batch, &mut rng).unwrap();

        let states = array![[0.5]];
        assert_eq!(
            trainer.online.forward(&states),
            trainer.target.forward(&states)
        );
    }

    #[test]
    fn test_best_checkpoint_loss_is_running_minimum() {
        let mut rng = StdRng::seed_from_u64(26);
        let batch = toy_batch();
        let config = TrainConfig {
            num_epochs: 8,
            learning_rate: 1e-2,
            ..TrainConfig::default()
        };
        let mut trainer = Trainer::new(batch.schema, config, &mut rng);

        let mut best_so_far = f32::INFINITY;
        for _ in 0..config.num_epochs {
            let loss = trainer.run_epoch(&batch, &mut rng).unwrap();
            best_so_far = best_so_far.min(loss);
            let best = trainer.best_checkpoint().unwrap();
            assert_eq!(best.loss, best_so_far);
        }
    }

    #[test]
    fn test_training_reduces_loss_on_toy_problem() {
        let mut rng = StdRng::seed_from_u64(27);
        let batch = toy_batch();
        let config = TrainConfig {
            learning_rate: 1e-2,
            ..TrainConfig::default()
        };
        let mut trainer = Trainer::new(batch.schema, config, &mut rng);

        let first = trainer.run_epoch(&batch, &mut rng).unwrap();
        let mut last = first;
        for _ in 0..40 {
            last = trainer.run_epoch(&batch, &mut rng).unwrap();
        }
        assert!(last.is_finite());
        assert!(last < first, "loss did not improve: {first} -> {last}");
    }

    #[test]
    fn test_final_checkpoint_tracks_last_epoch() {
        let mut rng = StdRng::seed_from_u64(28);
        let batch = toy_batch();
        let mut trainer = Trainer::new(batch.schema, TrainConfig::default(), &mut rng);
        trainer.run_epoch(&batch, &mut rng).unwrap();
        let second = trainer.run_epoch(&batch, &mut rng).unwrap();

        let last = trainer.final_checkpoint().unwrap();
        assert_eq!(last.epoch, 2);
        assert_eq!(last.loss, second);
        assert_eq!(last.schema(), batch.schema);
        assert_eq!(last.layers.len(), 3);
    }

    #[test]
    fn test_clip_global_norm() {
        let mut rng = StdRng::seed_from_u64(29);
        let net = QNetwork::new(schema(2, 2), &mut rng);
        let mut grads = NetworkGrads::zeros_like(&net);
        grads.l1.weight[[0, 0]] = 3.0;
        grads.l2.bias[0] = 4.0;

        clip_global_norm(&mut grads, 1.0);
        let norm = grads.squared_norm().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);

        // Already-small gradients are left untouched.
        let mut small = NetworkGrads::zeros_like(&net);
        small.l1.weight[[0, 0]] = 0.25;
        clip_global_norm(&mut small, 1.0);
        assert_eq!(small.l1.weight[[0, 0]], 0.25);
    }
}
