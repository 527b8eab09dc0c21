use serde::{Deserialize, Serialize};

use crate::transition::Transition;

/// Network input/output shape inferred from curated transition data.
///
/// `state_dim` comes from the first transition's state length; `num_actions`
/// is the largest 1-indexed action id observed. The inferred schema is the
/// source of truth for network construction. Callers that expect a specific
/// shape should compare against the inferred value and warn on mismatch,
/// never silently substitute their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Schema {
    /// Length of every state and next-state vector.
    pub state_dim: usize,
    /// Number of discrete actions (actions are `1..=num_actions` on the wire).
    pub num_actions: usize,
}

impl Schema {
    /// Infers the schema from a transition set.
    ///
    /// Returns `None` if the set is empty. Action ids below 1 do not
    /// contribute to `num_actions`; they are rejected later by the
    /// flattener rather than coerced here.
    #[must_use]
    pub fn infer(transitions: &[Transition]) -> Option<Self> {
        let first = transitions.first()?;
        let num_actions = transitions
            .iter()
            .filter_map(|t| usize::try_from(t.action).ok())
            .max()
            .unwrap_or(0);
        Some(Self {
            state_dim: first.state.len(),
            num_actions,
        })
    }
}
