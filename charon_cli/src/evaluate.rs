use std::path::PathBuf;

use anyhow::Context;
use charon_scheduler::{
    json::io::{load_instance, save_json},
    mosel::solution_io::load_solution,
    problem::instance::Instance,
    solution::{duty::DutyStop, evaluator::Evaluation, solution::Solution},
};
use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use tracing::info;

#[derive(Args)]
pub struct EvaluateArgs {
    /// Instance JSON file
    #[arg(short, long)]
    instance: PathBuf,

    /// Solution in the solver text format
    #[arg(short, long)]
    solution: PathBuf,

    /// Write the keyframes of every vehicle to this JSON file
    #[arg(short, long)]
    keyframes: Option<PathBuf>,

    /// Print one row per vehicle
    #[arg(long)]
    duties: bool,
}

fn row(name: String, trips: usize, evaluation: &Evaluation) -> Vec<String> {
    vec![
        name,
        trips.to_string(),
        format!("{:.2}", evaluation.customer_distance / 1000.0),
        format!("{:.2}", evaluation.deadhead_distance / 1000.0),
        format!("{:.2}", evaluation.time / 3600.0),
        format!("{:.2}", evaluation.route_cost),
        format!("{:.2}", evaluation.cost),
    ]
}

fn evaluation_table(instance: &Instance, solution: &Solution, duties: bool) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED).set_header(vec![
        "Vehicle",
        "Trips",
        "Customer km",
        "Deadhead km",
        "Hours",
        "Route cost",
        "Cost",
    ]);

    if duties {
        for (vehicle, duty) in solution.duties() {
            let trips = duty
                .stops()
                .iter()
                .filter(|stop| matches!(stop, DutyStop::Trip(_)))
                .count();
            if trips == 0 {
                continue;
            }
            table.add_row(row(
                instance.identity(vehicle),
                trips,
                &solution.evaluate_duty(instance, vehicle),
            ));
        }
    }

    let total = solution.evaluate_detailed(instance);
    table.add_row(row(
        format!("Total ({} used)", total.vehicles_used),
        solution.covered_trips().len(),
        &total,
    ));

    table
}

pub fn run(args: EvaluateArgs) -> anyhow::Result<()> {
    let instance = load_instance(&args.instance)
        .with_context(|| format!("Cannot load {}", args.instance.display()))?;
    let solution = load_solution(&args.solution, &instance)
        .with_context(|| format!("Cannot load {}", args.solution.display()))?;

    solution
        .validate(&instance)
        .with_context(|| format!("{} is not a valid solution", args.solution.display()))?;
    info!("Solution is valid");

    println!("{}", evaluation_table(&instance, &solution, args.duties));

    if let Some(path) = args.keyframes {
        save_json(&path, &solution.keyframes(&instance))?;
        info!("Saved keyframes to {}", path.display());
    }

    Ok(())
}
