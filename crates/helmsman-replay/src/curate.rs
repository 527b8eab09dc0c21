//! Episode curation: quality-based filtering with a population floor.
//!
//! Training on raw logs tends to drown the learner in failure episodes, so
//! curation runs in two stages:
//!
//! 1. **Progress gate** - keep episodes whose `max_progress` reaches the
//!    threshold. These episodes demonstrably moved toward the goal.
//! 2. **Return-ranking fallback** - if the gate keeps fewer than
//!    `ceil(elite_fraction * total)` episodes, discard the gate's result and
//!    instead keep the highest-return `elite_fraction` of all episodes
//!    (stable ascending sort by return, tail slice). This guarantees a
//!    minimum training population even when the gate is too strict for the
//!    current data.
//!
//! The curated output is the flat transition list of the selected episodes,
//! in episode order, plus the schema inferred from those transitions.

use crate::{episode::Episode, schema::Schema, transition::Transition};

/// Episode selection parameters.
#[derive(Debug, Clone, Copy)]
pub struct CurationConfig {
    /// Minimum `max_progress` for the progress gate.
    pub progress_threshold: f32,
    /// Minimum fraction of all episodes the curator must keep.
    pub elite_fraction: f32,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            progress_threshold: 0.2,
            elite_fraction: 0.5,
        }
    }
}

impl CurationConfig {
    /// Minimum number of episodes to keep out of `total`.
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    #[must_use]
    pub fn min_keep(&self, total: usize) -> usize {
        ((self.elite_fraction * total as f32).ceil() as usize).min(total)
    }
}

/// The flat union of transitions from the selected episodes.
#[derive(Debug, Clone)]
pub struct CuratedSet {
    /// Selected transitions, concatenated in episode order.
    pub transitions: Vec<Transition>,
    /// Schema inferred from the selected transitions.
    pub schema: Schema,
    /// Number of episodes that passed curation.
    pub episodes_kept: usize,
    /// Number of episodes that were considered.
    pub episodes_total: usize,
    /// Whether the return-ranking fallback replaced the progress gate.
    pub used_return_fallback: bool,
}

/// Curation kept episodes but they contained no usable transitions.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("curation selected no transitions")]
pub struct EmptyCurationError;

/// Selects the episodes worth training on.
///
/// Returns the selected episodes and whether the return-ranking fallback
/// fired. When the progress gate alone satisfies the population floor, the
/// gate's result is returned exactly; otherwise the highest-return tail of
/// all episodes is returned in ascending return order, with equal-return
/// episodes keeping their original relative order.
#[must_use]
pub fn select_episodes<'a>(
    episodes: &'a [Episode],
    config: &CurationConfig,
) -> (Vec<&'a Episode>, bool) {
    let passed_gate: Vec<&Episode> = episodes
        .iter()
        .filter(|ep| ep.summary().max_progress >= config.progress_threshold)
        .collect();

    let min_keep = config.min_keep(episodes.len());
    if passed_gate.len() >= min_keep {
        return (passed_gate, false);
    }

    let mut by_return: Vec<&Episode> = episodes.iter().collect();
    by_return.sort_by(|a, b| f32::total_cmp(&a.summary().total_return, &b.summary().total_return));
    let elite = by_return.split_off(by_return.len() - min_keep);
    (elite, true)
}

/// Runs curation and flattens the selected episodes' transitions.
///
/// # Errors
///
/// Returns [`EmptyCurationError`] if the selected episodes contain no
/// transitions (possible only with a zero `elite_fraction` and a progress
/// threshold nothing reaches).
pub fn curate(
    episodes: &[Episode],
    config: &CurationConfig,
) -> Result<CuratedSet, EmptyCurationError> {
    let (selected, used_return_fallback) = select_episodes(episodes, config);

    let transitions: Vec<Transition> = selected
        .iter()
        .flat_map(|ep| ep.transitions().iter().cloned())
        .collect();
    let schema = Schema::infer(&transitions).ok_or(EmptyCurationError)?;

    Ok(CuratedSet {
        transitions,
        schema,
        episodes_kept: selected.len(),
        episodes_total: episodes.len(),
        used_return_fallback,
    })
}
