use helmsman_dqn::checkpoint::Checkpoint;
use serde::{Deserialize, Serialize};

/// Weight file consumed by the in-simulation inference agent.
///
/// Strips all training metadata from a checkpoint; layer field names follow
/// the agent's wire format (`W`/`b`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeightExport {
    pub state_dim: usize,
    pub num_actions: usize,
    pub layers: Vec<ExportLayer>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportLayer {
    /// Weight matrix with shape `[out_dim][in_dim]`.
    #[serde(rename = "W")]
    pub weight: Vec<Vec<f32>>,
    /// Bias vector of length `out_dim`.
    #[serde(rename = "b")]
    pub bias: Vec<f32>,
}

impl WeightExport {
    pub fn from_checkpoint(checkpoint: &Checkpoint) -> Self {
        Self {
            state_dim: checkpoint.state_dim,
            num_actions: checkpoint.num_actions,
            layers: checkpoint
                .layers
                .iter()
                .map(|layer| ExportLayer {
                    weight: layer.weight.clone(),
                    bias: layer.bias.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use helmsman_dqn::network::QNetwork;
    use helmsman_replay::schema::Schema;
    use rand::{SeedableRng as _, rngs::StdRng};

    use super::*;

    #[test]
    fn test_wire_field_names() {
        let mut rng = StdRng::seed_from_u64(0);
        let net = QNetwork::new(
            Schema {
                state_dim: 2,
                num_actions: 3,
            },
            &mut rng,
        );
        let ckpt = Checkpoint::from_network(&net, 1, 0.5, 0.95, true);
        let export = WeightExport::from_checkpoint(&ckpt);

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["state_dim"], 2);
        assert_eq!(json["num_actions"], 3);
        assert_eq!(json["layers"].as_array().unwrap().len(), 3);
        assert!(json["layers"][0].get("W").is_some());
        assert!(json["layers"][0].get("b").is_some());
        assert!(json["layers"][0].get("weight").is_none());
        // No training metadata leaks into the inference file.
        assert!(json.get("epoch").is_none());
        assert!(json.get("loss").is_none());
    }
}
