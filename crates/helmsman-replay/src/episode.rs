use crate::transition::Transition;

/// Progress level at which a terminated episode counts as a win.
pub const WIN_PROGRESS: f32 = 0.98;

/// One complete rollout from the simulation, plus derived summary values.
///
/// Episodes are immutable once loaded; curation only reads them.
#[derive(Debug, Clone)]
pub struct Episode {
    transitions: Vec<Transition>,
    summary: EpisodeSummary,
}

/// Summary statistics derived from an episode's transitions.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeSummary {
    /// Sum of rewards over the whole episode.
    pub total_return: f32,
    /// Maximum of the first state coordinate, a normalized [0, 1] progress
    /// signal for the rollout's task.
    pub max_progress: f32,
    /// Number of transitions in the episode.
    pub length: usize,
    /// Whether the episode terminated with progress at or above
    /// [`WIN_PROGRESS`].
    pub win: bool,
}

impl Episode {
    /// Wraps a rollout's transitions, computing its summary.
    #[must_use]
    pub fn new(transitions: Vec<Transition>) -> Self {
        let mut total_return = 0.0;
        let mut max_progress: f32 = 0.0;
        let mut terminated = false;

        for t in &transitions {
            total_return += t.reward;
            if let Some(&progress) = t.state.first() {
                max_progress = max_progress.max(progress);
            }
            if t.done {
                terminated = true;
            }
        }

        let summary = EpisodeSummary {
            total_return,
            max_progress,
            length: transitions.len(),
            win: terminated && max_progress >= WIN_PROGRESS,
        };
        Self {
            transitions,
            summary,
        }
    }

    /// Returns the episode's transitions in rollout order.
    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Returns the derived summary statistics.
    #[must_use]
    pub fn summary(&self) -> &EpisodeSummary {
        &self.summary
    }
}
