use std::path::{Path, PathBuf};

use anyhow::Context;
use charon_matrix_providers::{
    cache::FileCache, travel_matrix_client::TravelMatrixClient,
    travel_matrix_provider::TravelMatrixProvider,
};
use charon_scheduler::{
    json::io::{load_instance_builder, save_instance},
    problem::{
        instance::{Instance, InstanceBuilder},
        travel_matrix::TravelMatrix,
    },
};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::{config::Config, file_utils::instance_paths};

#[derive(Args)]
pub struct MatrixArgs {
    /// Instance JSON file or a folder of them
    #[arg(short, long)]
    input: PathBuf,

    /// Straight-line distances at this speed instead of OSRM
    #[arg(long)]
    speed: Option<f64>,

    /// Keep going when an instance fails
    #[arg(long)]
    keep_going: bool,
}

/// Fetches the matrix over the extended locations of `builder` and builds the instance.
pub async fn attach_matrix(
    client: &TravelMatrixClient<FileCache>,
    provider: &TravelMatrixProvider,
    mut builder: InstanceBuilder,
) -> anyhow::Result<Instance> {
    let locations = builder.extended_locations();

    let matrices = client
        .fetch_matrix(&locations.departures, &locations.arrivals, provider.clone())
        .await?;
    let matrix = TravelMatrix::from_travel_matrices(matrices)
        .context("Travel matrix does not cover every extended vertex")?;

    builder.set_travel_matrix(matrix);

    Ok(builder.build()?)
}

async fn fetch_matrix(
    client: &TravelMatrixClient<FileCache>,
    provider: &TravelMatrixProvider,
    path: &Path,
) -> anyhow::Result<()> {
    let builder = load_instance_builder(path)?;
    let instance = attach_matrix(client, provider, builder).await?;
    save_instance(path, &instance)?;

    Ok(())
}

pub async fn run(args: MatrixArgs) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let provider = config.matrix_provider(args.speed)?;
    let client = TravelMatrixClient::new(config.cache()).with_concurrency(config.osrm_concurrency);

    let paths = instance_paths(&args.input)?;
    info!("Fetching travel matrices of {} instances", paths.len());

    let bar = ProgressBar::new(paths.len() as u64);
    bar.set_style(ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} {msg}")?);

    for path in &paths {
        bar.set_message(path.display().to_string());

        let result = fetch_matrix(&client, &provider, path)
            .await
            .with_context(|| format!("Cannot fetch the matrix of {}", path.display()));
        match result {
            Ok(()) => {}
            Err(err) if args.keep_going => error!("{:#}", err),
            Err(err) => {
                bar.abandon();
                return Err(err);
            }
        }

        bar.inc(1);
    }

    bar.finish_and_clear();

    Ok(())
}
