//! Tensor flattening: curated transitions to index-aligned arrays.
//!
//! Flattening is pure and deterministic: the same curated transition list
//! always produces bit-identical arrays. All schema validation happens here,
//! before any training starts - an inconsistent state length indicates an
//! upstream environment or logging change and aborts the run.

use ndarray::{Array1, Array2};

use crate::{schema::Schema, transition::Transition};

/// Errors raised while flattening transitions against a schema.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum FlattenError {
    /// A transition's state or next-state length disagrees with the schema.
    #[display(
        "inconsistent state dimension at transition {index}: expected {expected}, \
         got s={state_len}, ns={next_state_len}"
    )]
    DimensionMismatch {
        /// Index of the offending transition in the curated set.
        index: usize,
        /// The schema's `state_dim`.
        expected: usize,
        /// Observed state length.
        state_len: usize,
        /// Observed next-state length.
        next_state_len: usize,
    },
    /// A transition's action id falls outside `1..=num_actions`.
    #[display("action id {action} out of range [1, {num_actions}] at transition {index}")]
    ActionOutOfRange {
        /// Index of the offending transition in the curated set.
        index: usize,
        /// The 1-indexed action id observed.
        action: i64,
        /// The schema's action count.
        num_actions: usize,
    },
}

/// The curated transition set as five index-aligned arrays.
///
/// Row `i` of every field describes the same transition. Actions are
/// 0-indexed here; `dones` uses `{0.0, 1.0}` so the trainer can use it
/// directly as a bootstrap mask.
#[derive(Debug, Clone)]
pub struct TransitionBatch {
    /// States, one row per transition (`N x state_dim`).
    pub states: Array2<f32>,
    /// 0-indexed action taken per transition.
    pub actions: Array1<usize>,
    /// Reward per transition.
    pub rewards: Array1<f32>,
    /// Next states, one row per transition (`N x state_dim`).
    pub next_states: Array2<f32>,
    /// Termination flag per transition as `{0.0, 1.0}`.
    pub dones: Array1<f32>,
    /// The schema the batch was validated against.
    pub schema: Schema,
}

impl TransitionBatch {
    /// Number of transitions in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Whether the batch holds no transitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

/// Flattens curated transitions into index-aligned arrays.
///
/// Validates each transition's dimensions against `schema`, converts actions
/// from the wire's 1-indexed form to 0-indexed, and converts termination
/// flags to `{0.0, 1.0}`.
///
/// # Errors
///
/// * [`FlattenError::DimensionMismatch`] if a state or next-state length
///   disagrees with `schema.state_dim`
/// * [`FlattenError::ActionOutOfRange`] if an action id is outside
///   `1..=schema.num_actions`
pub fn flatten(transitions: &[Transition], schema: Schema) -> Result<TransitionBatch, FlattenError> {
    let n = transitions.len();
    let d = schema.state_dim;

    let mut states = Array2::<f32>::zeros((n, d));
    let mut actions = Array1::<usize>::zeros(n);
    let mut rewards = Array1::<f32>::zeros(n);
    let mut next_states = Array2::<f32>::zeros((n, d));
    let mut dones = Array1::<f32>::zeros(n);

    for (index, t) in transitions.iter().enumerate() {
        if t.state.len() != d || t.next_state.len() != d {
            return Err(FlattenError::DimensionMismatch {
                index,
                expected: d,
                state_len: t.state.len(),
                next_state_len: t.next_state.len(),
            });
        }
        let action_ok = usize::try_from(t.action)
            .ok()
            .filter(|&a| a >= 1 && a <= schema.num_actions);
        let Some(action) = action_ok else {
            return Err(FlattenError::ActionOutOfRange {
                index,
                action: t.action,
                num_actions: schema.num_actions,
            });
        };

        for (j, &v) in t.state.iter().enumerate() {
            states[[index, j]] = v;
        }
        for (j, &v) in t.next_state.iter().enumerate() {
            next_states[[index, j]] = v;
        }
        actions[index] = action - 1;
        rewards[index] = t.reward;
        dones[index] = if t.done { 1.0 } else { 0.0 };
    }

    Ok(TransitionBatch {
        states,
        actions,
        rewards,
        next_states,
        dones,
        schema,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(state: Vec<f32>, action: i64, reward: f32, next: Vec<f32>, done: bool) -> Transition {
        Transition {
            state,
            action,
            reward,
            next_state: next,
            done,
        }
    }

    fn schema(state_dim: usize, num_actions: usize) -> Schema {
        Schema {
            state_dim,
            num_actions,
        }
    }

    #[test]
    fn test_action_mapping_is_one_based_to_zero_based() {
        let transitions = vec![
            transition(vec![0.0], 1, 0.0, vec![0.0], false),
            transition(vec![0.0], 3, 0.0, vec![0.0], false),
            transition(vec![0.0], 5, 0.0, vec![0.0], false),
        ];
        let batch = flatten(&transitions, schema(1, 5)).unwrap();
        assert_eq!(batch.actions.to_vec(), vec![0, 2, 4]);
        assert!(batch.actions.iter().all(|&a| a < batch.schema.num_actions));
    }

    #[test]
    fn test_dimension_mismatch_is_fatal() {
        let transitions = vec![
            transition(vec![0.0, 0.0], 1, 0.0, vec![0.0, 0.0], false),
            transition(vec![0.0, 0.0, 0.0], 1, 0.0, vec![0.0, 0.0], false),
        ];
        let err = flatten(&transitions, schema(2, 1)).unwrap_err();
        assert_eq!(
            err,
            FlattenError::DimensionMismatch {
                index: 1,
                expected: 2,
                state_len: 3,
                next_state_len: 2,
            }
        );
    }

    #[test]
    fn test_next_state_mismatch_is_fatal() {
        let transitions = vec![transition(vec![0.0], 1, 0.0, vec![0.0, 0.0], false)];
        let err = flatten(&transitions, schema(1, 1)).unwrap_err();
        assert!(matches!(err, FlattenError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_action_out_of_range() {
        let zero = flatten(
            &[transition(vec![0.0], 0, 0.0, vec![0.0], false)],
            schema(1, 3),
        );
        assert!(matches!(
            zero.unwrap_err(),
            FlattenError::ActionOutOfRange { action: 0, .. }
        ));

        let high = flatten(
            &[transition(vec![0.0], 4, 0.0, vec![0.0], false)],
            schema(1, 3),
        );
        assert!(matches!(
            high.unwrap_err(),
            FlattenError::ActionOutOfRange { action: 4, .. }
        ));
    }

    #[test]
    fn test_done_flags_become_unit_floats() {
        let transitions = vec![
            transition(vec![0.5], 1, 1.0, vec![0.6], true),
            transition(vec![0.6], 1, -1.0, vec![0.7], false),
        ];
        let batch = flatten(&transitions, schema(1, 1)).unwrap();
        assert_eq!(batch.dones.to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let transitions = vec![
            transition(vec![0.1, 0.2], 2, 0.5, vec![0.2, 0.3], false),
            transition(vec![0.2, 0.3], 1, -0.5, vec![0.3, 0.4], true),
        ];
        let a = flatten(&transitions, schema(2, 2)).unwrap();
        let b = flatten(&transitions, schema(2, 2)).unwrap();
        assert_eq!(a.states, b.states);
        assert_eq!(a.actions, b.actions);
        assert_eq!(a.rewards, b.rewards);
        assert_eq!(a.next_states, b.next_states);
        assert_eq!(a.dones, b.dones);
    }
}
