use std::path::PathBuf;

use anyhow::Context;
use helmsman_dqn::checkpoint::Checkpoint;

use crate::{schema::weight_export::WeightExport, util};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ExportWeightsArg {
    /// Checkpoint file to convert
    #[arg(long, default_value = "dqn_checkpoint_best.json")]
    checkpoint: PathBuf,
    /// Output file path (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &ExportWeightsArg) -> anyhow::Result<()> {
    let checkpoint: Checkpoint = util::read_json_file("checkpoint", &arg.checkpoint)?;
    eprintln!(
        "Loaded checkpoint: epoch {}, loss {:.6}, trained at {}",
        checkpoint.epoch, checkpoint.loss, checkpoint.trained_at
    );
    eprintln!(
        "  state_dim: {}, num_actions: {}",
        checkpoint.state_dim, checkpoint.num_actions
    );
    for (i, layer) in checkpoint.layers.iter().enumerate() {
        eprintln!(
            "  layer {i}: {} x {}",
            layer.weight.len(),
            layer.weight.first().map_or(0, Vec::len)
        );
    }

    // Reject malformed checkpoints before emitting anything the agent
    // would choke on at load time.
    checkpoint
        .to_network()
        .context("Checkpoint does not describe a valid network")?;

    let export = WeightExport::from_checkpoint(&checkpoint);
    let display_path = arg
        .output
        .as_ref()
        .map_or_else(|| "stdout".to_owned(), |p| p.display().to_string());
    crate::util::Output::save_json(&export, arg.output.clone())?;
    eprintln!("Exported weights to {display_path}");

    Ok(())
}
