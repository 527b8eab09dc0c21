use std::path::PathBuf;

use anyhow::Context;
use helmsman_dqn::trainer::{TrainConfig, Trainer};
use helmsman_replay::{
    curate::{self, CurationConfig},
    flatten, store,
};
use rand::{RngCore, SeedableRng as _};
use rand_pcg::Pcg32;

use crate::util;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Directory containing transitions_*.json log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
    /// Final checkpoint output path
    #[arg(long, default_value = "dqn_checkpoint.json")]
    output: PathBuf,
    /// Best (lowest-loss) checkpoint output path
    #[arg(long, default_value = "dqn_checkpoint_best.json")]
    best_output: PathBuf,
    /// Number of training epochs
    #[arg(long, default_value_t = 12)]
    epochs: usize,
    /// Mini-batch size
    #[arg(long, default_value_t = 64)]
    batch_size: usize,
    /// Discount factor
    #[arg(long, default_value_t = 0.95)]
    gamma: f32,
    /// Adam learning rate
    #[arg(long, default_value_t = 1e-4)]
    learning_rate: f32,
    /// Global gradient L2-norm ceiling
    #[arg(long, default_value_t = 1.0)]
    grad_clip_norm: f32,
    /// Use vanilla max-based targets instead of Double-DQN
    #[arg(long)]
    vanilla: bool,
    /// Minimum max-progress for the episode curation gate
    #[arg(long, default_value_t = 0.2)]
    progress_threshold: f32,
    /// Minimum fraction of episodes curation must keep
    #[arg(long, default_value_t = 0.5)]
    elite_fraction: f32,
    /// Warn if the inferred state dimension differs from this value
    #[arg(long)]
    expect_state_dim: Option<usize>,
    /// Warn if the inferred action count differs from this value
    #[arg(long)]
    expect_num_actions: Option<usize>,
    /// RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    anyhow::ensure!(arg.epochs > 0, "--epochs must be at least 1");
    anyhow::ensure!(arg.batch_size > 0, "--batch-size must be at least 1");

    eprintln!("Loading transition logs from {}...", arg.log_dir.display());
    let episodes = store::load_episodes(&arg.log_dir).with_context(|| {
        format!(
            "Failed to load transition logs from {}",
            arg.log_dir.display()
        )
    })?;
    eprintln!("Loaded {} episodes", episodes.len());

    let curation = CurationConfig {
        progress_threshold: arg.progress_threshold,
        elite_fraction: arg.elite_fraction,
    };
    let curated = curate::curate(&episodes, &curation).context("Failed to curate episodes")?;
    eprintln!(
        "Curated {}/{} episodes ({} transitions)",
        curated.episodes_kept,
        curated.episodes_total,
        curated.transitions.len()
    );
    if curated.used_return_fallback {
        eprintln!("  Progress gate kept too few episodes; fell back to return ranking");
    }

    let schema = curated.schema;
    eprintln!(
        "Inferred schema: state_dim={}, num_actions={}",
        schema.state_dim, schema.num_actions
    );
    // Expectation mismatches are warnings, not errors: the network shape is
    // built from the inferred schema, never from the expectation.
    if let Some(expected) = arg.expect_state_dim {
        if schema.state_dim != expected {
            eprintln!(
                "  Warning: inferred state_dim {} differs from expected {expected}",
                schema.state_dim
            );
        }
    }
    if let Some(expected) = arg.expect_num_actions {
        if schema.num_actions != expected {
            eprintln!(
                "  Warning: inferred num_actions {} differs from expected {expected}",
                schema.num_actions
            );
        }
    }

    let batch = flatten::flatten(&curated.transitions, schema)
        .context("Failed to flatten curated transitions")?;

    let mut rng: Box<dyn RngCore> = match arg.seed {
        Some(seed) => Box::new(Pcg32::seed_from_u64(seed)),
        None => Box::new(rand::rng()),
    };

    let config = TrainConfig {
        batch_size: arg.batch_size,
        num_epochs: arg.epochs,
        gamma: arg.gamma,
        learning_rate: arg.learning_rate,
        grad_clip_norm: arg.grad_clip_norm,
        double_dqn: !arg.vanilla,
    };
    let mut trainer = Trainer::new(schema, config, &mut *rng);
    for epoch in 1..=config.num_epochs {
        let loss = trainer.run_epoch(&batch, &mut *rng)?;
        eprintln!("Epoch {epoch}/{} - avg loss: {loss:.6}", config.num_epochs);
        if !loss.is_finite() {
            eprintln!("  Warning: non-finite loss; check reward scaling and learning rate");
        }
    }

    let last = trainer
        .final_checkpoint()
        .context("Training ran no epochs")?;
    let best = trainer.best_checkpoint().context("Training ran no epochs")?;
    util::save_json_atomic(&last, &arg.output)?;
    util::save_json_atomic(&best, &arg.best_output)?;

    eprintln!();
    eprintln!("Checkpoints saved successfully");
    eprintln!(
        "  Final: {} (epoch {}, loss {:.6})",
        arg.output.display(),
        last.epoch,
        last.loss
    );
    eprintln!(
        "  Best:  {} (epoch {}, loss {:.6})",
        arg.best_output.display(),
        best.epoch,
        best.loss
    );
    eprintln!("  Trained at: {}", last.trained_at);

    Ok(())
}
