//! Offline Double-DQN training engine.
//!
//! This crate trains a small value-based policy from a fixed, curated
//! transition set - there is no environment interaction, exploration, or
//! replay-buffer growth. Training is supervised-regression-style over the
//! batch produced by `helmsman-replay`.
//!
//! # Architecture
//!
//! ```text
//! TransitionBatch (helmsman-replay)
//!     ↓ consumed by
//! Trainer
//!     ├─ online QNetwork   (updated every mini-batch)
//!     ├─ target QNetwork   (hard-synced once per epoch)
//!     └─ Adam optimizer
//!     ↓ produces
//! Checkpoint ("final" + "best" by mean epoch loss)
//! ```
//!
//! # Target computation
//!
//! Per mini-batch, the bootstrapped regression target is
//! `r + gamma * (1 - done) * target_q`, where `target_q` comes from the
//! target network. In Double-DQN mode (the default) the *online* network
//! selects the next action and the target network only evaluates it, which
//! reduces the overestimation bias of vanilla max-based bootstrapping. The
//! `(1 - done)` mask zeroes the bootstrap at episode termination, so
//! terminal transitions regress purely toward the observed reward.
//!
//! Target evaluation is a plain forward pass with no gradient side effects;
//! only the online network is updated by the optimizer.
//!
//! # Stability choices
//!
//! - Huber (smooth-L1) loss instead of squared error, robust to the
//!   reward/Q-value outliers common in sparse-reward navigation logs
//! - global gradient-norm clipping at 1.0
//! - hard target sync once per epoch, so the bootstrap target moves at
//!   epoch granularity rather than every step
//! - Xavier-uniform weight init with zero biases, keeping initial Q-value
//!   magnitudes small under the Huber loss

mod adam;
pub mod checkpoint;
pub mod linear;
pub mod loss;
pub mod network;
pub mod trainer;
