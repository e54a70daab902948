use std::hint::black_box;

use charon_scheduler::{
    pareto::{ParetoParams, ParetoStrategy, ParetoTable},
    problem::{
        coefficients::Coefficients,
        instance::{CustomerInput, Instance, InstanceBuilder, RouteInput},
        point::Point,
        refuel_point::RefuelPoint,
        travel_matrix::TravelMatrix,
        trip::TripBuilder,
        vehicle::VehicleBuilder,
    },
    taskgraph::builder::{TaskGraphParams, build_taskgraph},
    utils::threads::Threads,
};
use criterion::{Criterion, criterion_group, criterion_main};
use jiff::{SignedDuration, civil::date};
use rand::{Rng, SeedableRng, rngs::SmallRng};

const SPEED: f64 = 12.0;

fn point(rng: &mut SmallRng) -> Point {
    Point::new(
        1000.0 + rng.random_range(0.0..40_000.0),
        1000.0 + rng.random_range(0.0..40_000.0),
    )
}

fn planar(a: &Point, b: &Point) -> f64 {
    (a.lon() - b.lon()).hypot(a.lat() - b.lat())
}

fn create_instance(num_vehicles: usize, num_trips: usize, num_refuel_points: usize) -> Instance {
    let mut rng = SmallRng::seed_from_u64(2015);
    let start = date(2015, 10, 1).at(6, 0, 0, 0);
    let mut builder = InstanceBuilder::default();
    builder.set_coefficients(Coefficients {
        fuel_per_meter: 1.0 / 100_000.0,
        refuel_per_second: 1.0 / 3600.0,
        cost_per_meter: 1e-3,
        cost_per_vehicle: 30.0,
    });

    for id in 0..num_vehicles {
        let mut vehicle = VehicleBuilder::default();
        vehicle
            .set_id(id.to_string())
            .set_location(point(&mut rng))
            .set_start_time(start);
        builder.add_vehicle(vehicle.build());
    }
    for id in 0..num_refuel_points {
        builder.add_refuel_point(RefuelPoint::new(id.to_string(), point(&mut rng)));
    }
    for id in 0..num_trips {
        let origin = point(&mut rng);
        let destination = point(&mut rng);
        let length = planar(&origin, &destination);
        let mut trip = TripBuilder::default();
        trip.set_id(id.to_string())
            .set_start_loc(origin)
            .set_finish_loc(destination)
            .set_start_time(start.saturating_add(SignedDuration::from_mins(
                rng.random_range(0..16 * 60),
            )))
            .set_duration(SignedDuration::from_secs((length / SPEED) as i64 + 600))
            .set_distance(length);
        builder.add_customer(CustomerInput {
            id,
            routes: vec![RouteInput {
                id,
                cost: 0.0,
                trips: vec![trip.build()],
            }],
        });
    }

    let locations = builder.extended_locations();
    let distances = locations
        .departures
        .iter()
        .map(|from| locations.arrivals.iter().map(|to| planar(from, to)).collect())
        .collect::<Vec<Vec<f64>>>();
    let times = distances
        .iter()
        .map(|row| row.iter().map(|meters| meters / SPEED).collect())
        .collect();
    builder.set_travel_matrix(TravelMatrix::new(distances, times));

    builder.build().unwrap()
}

fn taskgraph_benchmark(c: &mut Criterion) {
    let instance = create_instance(50, 600, 30);

    c.bench_function("build task graph (single thread)", |b| {
        let params = TaskGraphParams {
            threads: Threads::Single,
            ..TaskGraphParams::default()
        };
        b.iter(|| build_taskgraph(black_box(&instance), &params))
    });

    c.bench_function("build task graph (4 threads)", |b| {
        let params = TaskGraphParams {
            threads: Threads::Multi(4),
            ..TaskGraphParams::default()
        };
        b.iter(|| build_taskgraph(black_box(&instance), &params))
    });
}

fn pareto_benchmark(c: &mut Criterion) {
    let instance = create_instance(20, 250, 40);

    for (name, strategy) in [
        ("pareto dense", ParetoStrategy::Dense),
        ("pareto sparse", ParetoStrategy::Sparse),
    ] {
        let params = ParetoParams {
            strategy,
            threads: Threads::Multi(4),
        };
        c.bench_function(name, |b| {
            b.iter(|| ParetoTable::compute(black_box(&instance), &params))
        });
    }
}

criterion_group!(benches, taskgraph_benchmark, pareto_benchmark);
criterion_main!(benches);
