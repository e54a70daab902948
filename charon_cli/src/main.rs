use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;

use crate::{
    check::CheckArgs, evaluate::EvaluateArgs, generate::GenerateSubcommands, graph::GraphArgs,
    improve::ImproveArgs, matrix::MatrixArgs, pareto::ParetoArgs, plan::PlanArgs,
};

mod check;
mod config;
mod evaluate;
mod file_utils;
mod generate;
mod graph;
mod improve;
mod matrix;
mod pareto;
mod parsers;
mod plan;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the task graph of an instance and export it
    Graph {
        #[command(flatten)]
        args: GraphArgs,
    },
    /// Compute the Pareto refuel point table and store it in the instance
    Pareto {
        #[command(flatten)]
        args: ParetoArgs,
    },
    /// Fetch the travel matrix of one or more instances
    Matrix {
        #[command(flatten)]
        args: MatrixArgs,
    },
    /// Plan customer routes with the itinerary planner
    Plan {
        #[command(flatten)]
        args: PlanArgs,
    },
    /// Validate and evaluate a solution
    Evaluate {
        #[command(flatten)]
        args: EvaluateArgs,
    },
    /// Report problems of one or more instances
    Check {
        #[command(flatten)]
        args: CheckArgs,
    },
    /// Improve a solution by solving subproblems with the external solver
    Improve {
        #[command(flatten)]
        args: ImproveArgs,
    },
    #[command(visible_aliases = ["g", "schema"])]
    Generate {
        #[command(subcommand)]
        commands: GenerateSubcommands,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::from_filename("./.env.local").ok();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    match cli.command {
        Some(Commands::Graph { args }) => graph::run(args)?,
        Some(Commands::Pareto { args }) => pareto::run(args)?,
        Some(Commands::Matrix { args }) => matrix::run(args).await?,
        Some(Commands::Plan { args }) => plan::run(args).await?,
        Some(Commands::Evaluate { args }) => evaluate::run(args)?,
        Some(Commands::Check { args }) => check::run(args)?,
        Some(Commands::Improve { args }) => improve::run(args).await?,
        Some(Commands::Generate { commands }) => generate::run(commands)?,
        None => {}
    }

    Ok(())
}
