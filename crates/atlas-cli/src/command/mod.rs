use clap::{Parser, Subcommand};
use tracing::Level;

use self::{aggregate::AggregateArg, build_bundle::BuildBundleArg};

mod aggregate;
mod build_bundle;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Build a visualization bundle from aggregated and per-role features
    BuildBundle(#[clap(flatten)] BuildBundleArg),
    /// Pool per-role response features into an aggregated container
    Aggregate(#[clap(flatten)] AggregateArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    init_logging(args.verbose);
    match args.mode {
        Mode::BuildBundle(arg) => build_bundle::run(&arg)?,
        Mode::Aggregate(arg) => aggregate::run(&arg)?,
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
