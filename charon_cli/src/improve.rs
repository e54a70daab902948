use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use charon_scheduler::{
    json::io::{load_instance, save_json},
    mosel::solution_io::{load_solution, save_solution},
    solver::{
        external::{ExternalSolver, ExternalSolverParams},
        iterative::{IterationParams, IterativeImprovement},
    },
    subproblem::extractor::SubproblemParams,
    taskgraph::builder::{TaskGraphParams, build_taskgraph},
};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::{config::Config, parsers};

#[derive(Args)]
pub struct ImproveArgs {
    /// Instance JSON file
    #[arg(short, long)]
    instance: PathBuf,

    /// Initial solution in the solver text format
    #[arg(short, long)]
    solution: PathBuf,

    /// Improved solution file
    #[arg(short, long)]
    output: PathBuf,

    /// Folder receiving subproblems and partial solutions
    #[arg(short, long)]
    work_dir: Option<PathBuf>,

    /// Iteration records as JSON
    #[arg(long)]
    history: Option<PathBuf>,

    #[arg(long, default_value_t = 100)]
    max_iterations: usize,

    #[arg(long, default_value_t = 5)]
    max_customers: usize,

    #[arg(long, default_value_t = 2.0)]
    min_ratio: f64,

    #[arg(long, value_parser = parsers::parse_duration, default_value = "1h")]
    neighbourhood: jiff::SignedDuration,

    /// Margin around the selected customers when extracting subproblems
    #[arg(long, value_parser = parsers::parse_duration, default_value = "1h")]
    epsilon: jiff::SignedDuration,

    /// Solver timeout, defaults to CHARON_SOLVER_TIMEOUT
    #[arg(short, long, value_parser = parsers::parse_duration)]
    timeout: Option<jiff::SignedDuration>,

    /// Solver arguments, `{input}` and `{output}` are replaced by the file paths
    #[arg(long = "solver-arg", allow_hyphen_values = true)]
    solver_args: Vec<String>,

    /// Restrict refuel points to the Pareto frontier
    #[arg(long)]
    restrict: bool,

    #[arg(long)]
    compress: bool,

    /// 0 uses every core
    #[arg(long, default_value_t = 4)]
    threads: usize,
}

pub async fn run(args: ImproveArgs) -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let instance = load_instance(&args.instance)
        .with_context(|| format!("Cannot load {}", args.instance.display()))?;
    let initial = load_solution(&args.solution, &instance)
        .with_context(|| format!("Cannot load {}", args.solution.display()))?;

    let graph = build_taskgraph(
        &instance,
        &TaskGraphParams {
            threads: parsers::threads(args.threads),
            restrict_refuel_points: args.restrict,
            ..TaskGraphParams::default()
        },
    );

    let mut solver_params = ExternalSolverParams {
        program: config.solver.clone(),
        timeout: args.timeout.unwrap_or(config.solver_timeout),
        ..ExternalSolverParams::default()
    };
    if !args.solver_args.is_empty() {
        solver_params.args = args.solver_args;
    }

    let defaults = IterationParams::default();
    let params = IterationParams {
        max_iterations: args.max_iterations,
        max_customers: args.max_customers,
        min_ratio: args.min_ratio,
        neighbourhood: args.neighbourhood,
        subproblem: SubproblemParams {
            epsilon: args.epsilon,
        },
        work_dir: args.work_dir.unwrap_or(defaults.work_dir),
        name: instance
            .name()
            .map(str::to_owned)
            .unwrap_or(defaults.name),
        compress: args.compress,
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {elapsed} {msg}")?);
    spinner.set_message("Improving solution");
    spinner.enable_steady_tick(Duration::from_millis(200));

    let improvement =
        IterativeImprovement::new(&instance, &graph, ExternalSolver::new(solver_params), params);
    let result = improvement.run(initial).await;
    spinner.finish_and_clear();
    let outcome = result?;

    info!(
        "Accepted {} of {} iterations, cost {:.2} with {} vehicles",
        outcome.history.iter().filter(|record| record.accepted).count(),
        outcome.history.len(),
        outcome.evaluation.cost,
        outcome.evaluation.vehicles_used
    );

    save_solution(&args.output, &instance, &outcome.solution)?;
    if let Some(path) = args.history {
        save_json(&path, &outcome.history)?;
    }

    Ok(())
}
