use std::path::PathBuf;

use anyhow::Context;
use helmsman_dqn::network::HIDDEN_DIM;
use rand::{Rng, SeedableRng as _};
use rand_distr::{Distribution as _, Normal};
use rand_pcg::Pcg32;

use crate::{
    schema::weight_export::{ExportLayer, WeightExport},
    util::Output,
};

const DEFAULT_STATE_DIM: usize = 11;
const DEFAULT_NUM_ACTIONS: usize = 5;
const DEFAULT_SEED: u64 = 42;
const WEIGHT_STD_DEV: f32 = 0.1;

/// Emits a dimension-consistent weight file before any real training has
/// happened, so the inference side can be wired up and tested first.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PlaceholderWeightsArg {
    /// State vector length
    #[arg(long, default_value_t = DEFAULT_STATE_DIM)]
    state_dim: usize,
    /// Number of discrete actions
    #[arg(long, default_value_t = DEFAULT_NUM_ACTIONS)]
    num_actions: usize,
    /// RNG seed
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    /// Output file path (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &PlaceholderWeightsArg) -> anyhow::Result<()> {
    anyhow::ensure!(arg.state_dim > 0, "--state-dim must be at least 1");
    anyhow::ensure!(arg.num_actions > 0, "--num-actions must be at least 1");

    eprintln!(
        "Generating placeholder weights: state_dim={}, num_actions={}, hidden={HIDDEN_DIM},{HIDDEN_DIM}",
        arg.state_dim, arg.num_actions
    );

    let mut rng = Pcg32::seed_from_u64(arg.seed);
    let normal =
        Normal::new(0.0, WEIGHT_STD_DEV).context("Failed to build weight distribution")?;

    let export = WeightExport {
        state_dim: arg.state_dim,
        num_actions: arg.num_actions,
        layers: vec![
            random_layer(arg.state_dim, HIDDEN_DIM, &normal, &mut rng),
            random_layer(HIDDEN_DIM, HIDDEN_DIM, &normal, &mut rng),
            random_layer(HIDDEN_DIM, arg.num_actions, &normal, &mut rng),
        ],
    };
    Output::save_json(&export, arg.output.clone())?;

    eprintln!("Placeholder weights written; overwrite them with a trained export later");
    Ok(())
}

fn random_layer<R>(in_dim: usize, out_dim: usize, normal: &Normal<f32>, rng: &mut R) -> ExportLayer
where
    R: Rng + ?Sized,
{
    let weight = (0..out_dim)
        .map(|_| (0..in_dim).map(|_| normal.sample(rng)).collect())
        .collect();
    ExportLayer {
        weight,
        bias: vec![0.0; out_dim],
    }
}
