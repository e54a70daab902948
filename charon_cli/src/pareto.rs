use std::path::PathBuf;

use anyhow::Context;
use charon_scheduler::{
    json::io::{load_instance, save_instance},
    pareto::{ParetoParams, ParetoStrategy},
};
use clap::{Args, ValueEnum};
use tracing::info;

use crate::parsers;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StrategyArg {
    Auto,
    Dense,
    Sparse,
}

#[derive(Args)]
pub struct ParetoArgs {
    /// Instance JSON file
    #[arg(short, long)]
    input: PathBuf,

    /// Defaults to overwriting the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = StrategyArg::Auto)]
    strategy: StrategyArg,

    /// 0 uses every core
    #[arg(short, long, default_value_t = 4)]
    threads: usize,
}

pub fn run(args: ParetoArgs) -> anyhow::Result<()> {
    let instance = load_instance(&args.input)
        .with_context(|| format!("Cannot load {}", args.input.display()))?;

    let params = ParetoParams {
        strategy: match args.strategy {
            StrategyArg::Auto => ParetoStrategy::default(),
            StrategyArg::Dense => ParetoStrategy::Dense,
            StrategyArg::Sparse => ParetoStrategy::Sparse,
        },
        threads: parsers::threads(args.threads),
    };
    let table = instance.pareto_table(&params);
    info!(
        "Pareto table keeps {} refuel point entries",
        table.num_entries()
    );

    let output = args.output.unwrap_or(args.input);
    save_instance(&output, &instance)?;

    Ok(())
}
