use std::path::PathBuf;

use anyhow::Context;
use charon_matrix_providers::{
    otp::{ItineraryRequest, OtpClient, OtpClientParams},
    travel_matrix_client::TravelMatrixClient,
};
use charon_scheduler::{
    json::io::{load_instance_builder, load_json, save_instance},
    problem::{
        instance::CustomerInput,
        itinerary::{ItineraryError, RouteCostWeights, itinerary_to_route},
    },
    utils::time::datetime_format,
};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use jiff::{civil::DateTime, tz::TimeZone};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{config::Config, matrix::attach_matrix};

/// One customer travelling between two places.
#[derive(Deserialize)]
struct CustomerRequest {
    customer: usize,
    from_longitude: f64,
    from_latitude: f64,
    to_longitude: f64,
    to_latitude: f64,
    #[serde(with = "datetime_format")]
    time: DateTime,
    #[serde(default)]
    arrive_by: bool,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Instance with vehicles, refuel points and coefficients
    #[arg(short, long)]
    instance: PathBuf,

    /// JSON list of customer requests
    #[arg(short, long)]
    requests: PathBuf,

    /// Instance written with the planned customers and its travel matrix
    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, default_value = "default")]
    router: String,

    /// Time zone of the request times, defaults to the system one
    #[arg(long)]
    time_zone: Option<String>,

    #[arg(long)]
    num_itineraries: Option<usize>,

    #[arg(long)]
    max_walk_distance: Option<f64>,

    /// Route cost per second of transit
    #[arg(long, default_value_t = RouteCostWeights::default().transit)]
    transit_weight: f64,

    /// Route cost per second of walking
    #[arg(long, default_value_t = RouteCostWeights::default().walk)]
    walk_weight: f64,

    /// Route cost per second of travel
    #[arg(long, default_value_t = RouteCostWeights::default().time)]
    time_weight: f64,

    /// Straight-line travel matrix at this speed instead of OSRM
    #[arg(long)]
    speed: Option<f64>,
}

pub async fn run(args: PlanArgs) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let url = config
        .otp_url
        .clone()
        .context("CHARON_OTP_URL is not set")?;
    let planner = OtpClient::new(OtpClientParams {
        url,
        router: args.router.clone(),
    });
    let tz = match &args.time_zone {
        Some(name) => TimeZone::get(name)?,
        None => TimeZone::system(),
    };
    let weights = RouteCostWeights {
        transit: args.transit_weight,
        walk: args.walk_weight,
        time: args.time_weight,
    };

    let mut builder = load_instance_builder(&args.instance)
        .with_context(|| format!("Cannot load {}", args.instance.display()))?;
    let requests: Vec<CustomerRequest> = load_json(&args.requests)
        .with_context(|| format!("Cannot load {}", args.requests.display()))?;

    let bar = ProgressBar::new(requests.len() as u64);
    bar.set_style(ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len}")?);

    let mut next_route = 0;
    let mut planned = 0;
    for request in &requests {
        let mut itinerary_request = ItineraryRequest::new(
            geo::Point::new(request.from_longitude, request.from_latitude),
            geo::Point::new(request.to_longitude, request.to_latitude),
            request.time,
        );
        itinerary_request.arrive_by = request.arrive_by;
        itinerary_request.num_itineraries = args.num_itineraries;
        itinerary_request.max_walk_distance = args.max_walk_distance;

        let itineraries = planner
            .plan(&itinerary_request)
            .await
            .with_context(|| format!("Planning customer {} failed", request.customer))?;

        let mut routes = Vec::new();
        for itinerary in &itineraries {
            let prefix = format!("{}_{}", request.customer, next_route);
            match itinerary_to_route(itinerary, next_route, &prefix, &weights, &tz) {
                Ok(route) => {
                    routes.push(route);
                    next_route += 1;
                }
                Err(ItineraryError::NoCarLeg) => debug!("Skipping itinerary without car leg"),
                Err(err) => return Err(err.into()),
            }
        }

        if routes.is_empty() {
            warn!("No car itinerary for customer {}", request.customer);
        } else {
            builder.add_customer(CustomerInput {
                id: request.customer,
                routes,
            });
            planned += 1;
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    info!("Planned {} of {} customers", planned, requests.len());

    let provider = config.matrix_provider(args.speed)?;
    let client = TravelMatrixClient::new(config.cache()).with_concurrency(config.osrm_concurrency);
    let instance = attach_matrix(&client, &provider, builder).await?;
    save_instance(&args.output, &instance)?;

    Ok(())
}
