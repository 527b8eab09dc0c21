use std::path::PathBuf;

use anyhow::Context;
use helmsman_replay::store;
use helmsman_stats::descriptive::DescriptiveStats;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct StatsArg {
    /// Directory containing transitions_*.json log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

#[expect(clippy::cast_precision_loss)]
pub(crate) fn run(arg: &StatsArg) -> anyhow::Result<()> {
    let episodes = store::load_episodes(&arg.log_dir).with_context(|| {
        format!(
            "Failed to load transition logs from {}",
            arg.log_dir.display()
        )
    })?;

    let returns = DescriptiveStats::new(episodes.iter().map(|ep| ep.summary().total_return))
        .context("No episodes to summarize")?;
    let progress = DescriptiveStats::new(episodes.iter().map(|ep| ep.summary().max_progress))
        .context("No episodes to summarize")?;
    let transitions: usize = episodes.iter().map(|ep| ep.summary().length).sum();
    let wins = episodes.iter().filter(|ep| ep.summary().win).count();
    let win_rate = wins as f32 / episodes.len() as f32;

    println!("=== Episode Summary ===");
    println!("Num episodes: {}", episodes.len());
    println!("Num transitions: {transitions}");
    println!(
        "Returns: min={:.2}, median={:.2}, mean={:.2}, max={:.2}, std={:.2}",
        returns.min, returns.median, returns.mean, returns.max, returns.std_dev
    );
    println!(
        "Max progress: min={:.2}, median={:.2}, mean={:.2}, max={:.2}",
        progress.min, progress.median, progress.mean, progress.max
    );
    println!("Overall win rate: {:.1}%", win_rate * 100.0);

    Ok(())
}
