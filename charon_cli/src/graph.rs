use std::path::PathBuf;

use anyhow::Context;
use charon_scheduler::{
    json::io::{load_instance, save_instance, save_taskgraph},
    mosel::{
        export::{graph_document, split_document},
        writer::save_document,
    },
    storage::is_compressed,
    taskgraph::{
        builder::{TaskGraphParams, build_taskgraph},
        splitter::{SplitPolicy, split_taskgraph, split_times},
    },
};
use clap::{Args, ValueEnum};
use rand::{SeedableRng, rngs::StdRng};
use tracing::info;

use crate::{
    file_utils::sibling_path,
    parsers::{self, SplitSpec},
};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PolicyArg {
    Time,
    Customer,
}

impl From<PolicyArg> for SplitPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Time => SplitPolicy::ByTime,
            PolicyArg::Customer => SplitPolicy::ByCustomer,
        }
    }
}

#[derive(Args)]
pub struct GraphArgs {
    /// Instance JSON file
    #[arg(short, long)]
    input: PathBuf,

    /// Output prefix, defaults to the input path without extension
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep a random fraction of vehicles, customers and refuel points
    #[arg(long)]
    sample: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Restrict refuel points to the Pareto frontier
    #[arg(long)]
    restrict: bool,

    /// Split the graph at `start,length,end`
    #[arg(long, value_parser = parsers::parse_split)]
    split: Option<SplitSpec>,

    #[arg(long, value_enum, default_value_t = PolicyArg::Time)]
    policy: PolicyArg,

    /// Gzip the written files
    #[arg(long)]
    compress: bool,

    /// 0 uses every core
    #[arg(short, long, default_value_t = 4)]
    threads: usize,
}

pub fn run(args: GraphArgs) -> anyhow::Result<()> {
    let mut instance = load_instance(&args.input)
        .with_context(|| format!("Cannot load {}", args.input.display()))?;
    let prefix = args.output.clone().unwrap_or_else(|| args.input.clone());
    let compress = args.compress && !is_compressed(&prefix);
    let extension = |name: &str| {
        if compress {
            format!("{name}.gz")
        } else {
            name.to_owned()
        }
    };

    if let Some(fraction) = args.sample {
        let mut rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        instance = instance.sample_subinstance(fraction, &mut rng)?;
        info!(
            "Sampled {} vehicles, {} customers and {} refuel points",
            instance.vehicles().len(),
            instance.customers().len(),
            instance.refuel_points().len()
        );
        save_instance(&sibling_path(&prefix, &extension("sample.json")), &instance)?;
    }

    let params = TaskGraphParams {
        threads: parsers::threads(args.threads),
        restrict_refuel_points: args.restrict,
        ..TaskGraphParams::default()
    };
    let mut graph = build_taskgraph(&instance, &params);

    save_document(
        &sibling_path(&prefix, &extension("graph.txt")),
        &graph_document(&instance, &graph),
    )?;
    save_taskgraph(&sibling_path(&prefix, &extension("graph.json")), &instance, &graph)?;

    if let Some(split) = args.split {
        let cuts = split_times(split.start, split.length, split.end)?;
        let intervals = split_taskgraph(&mut graph, &instance, &cuts, args.policy.into())?;
        info!(
            "Split into {} intervals with {} splitpoints",
            intervals.len(),
            graph.splitpoints().len()
        );

        save_document(
            &sibling_path(&prefix, &extension("split.txt")),
            &split_document(&instance, &graph, &intervals),
        )?;
        save_taskgraph(&sibling_path(&prefix, &extension("split.json")), &instance, &graph)?;
    }

    Ok(())
}
