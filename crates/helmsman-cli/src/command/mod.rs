use clap::{Parser, Subcommand};

use self::{
    export_weights::ExportWeightsArg, placeholder_weights::PlaceholderWeightsArg, stats::StatsArg,
    train::TrainArg,
};

mod export_weights;
mod placeholder_weights;
mod stats;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Train a Double-DQN policy from logged transitions
    Train(#[clap(flatten)] TrainArg),
    /// Convert a training checkpoint into the inference weight format
    ExportWeights(#[clap(flatten)] ExportWeightsArg),
    /// Generate randomly initialized weights in the inference format
    PlaceholderWeights(#[clap(flatten)] PlaceholderWeightsArg),
    /// Summarize logged episodes
    Stats(#[clap(flatten)] StatsArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Train(arg) => train::run(&arg)?,
        Mode::ExportWeights(arg) => export_weights::run(&arg)?,
        Mode::PlaceholderWeights(arg) => placeholder_weights::run(&arg)?,
        Mode::Stats(arg) => stats::run(&arg)?,
    }
    Ok(())
}
