use serde::{Deserialize, Serialize};

/// One step of interaction logged by the simulation.
///
/// Field names follow the wire format produced by the logging agent
/// (`s`/`a`/`r`/`ns`/`d`). The action id is 1-indexed here; conversion to
/// 0-indexed happens in [`flatten`](crate::flatten).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Transition {
    /// State vector observed before the action.
    #[serde(rename = "s")]
    pub state: Vec<f32>,
    /// Action id taken, 1-indexed.
    #[serde(rename = "a")]
    pub action: i64,
    /// Reward received for the step.
    #[serde(rename = "r")]
    pub reward: f32,
    /// State vector observed after the action.
    #[serde(rename = "ns")]
    pub next_state: Vec<f32>,
    /// Whether this step terminated the episode.
    #[serde(rename = "d")]
    pub done: bool,
}
