use std::collections::BTreeMap;

use charon_scheduler::{
    problem::{
        coefficients::Coefficients,
        instance::{CustomerInput, Instance, InstanceBuilder, RouteInput},
        point::Point,
        refuel_point::RefuelPoint,
        travel_matrix::TravelMatrix,
        trip::TripBuilder,
        vehicle::{VehicleBuilder, VehicleIdx},
    },
    solution::{
        duty::{Duty, DutyStop},
        solution::Solution,
        validator::simulate_duty,
    },
};
use jiff::{SignedDuration, civil::date};
use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Meters per second on every deadhead.
pub const SPEED: f64 = 12.0;

/// Side of the square area, in meters.
const AREA: f64 = 30_000.0;

#[derive(Clone, Debug)]
pub struct CityParams {
    pub num_vehicles: usize,
    pub num_trips: usize,
    pub num_refuel_points: usize,
    pub seed: u64,
}

fn random_point(rng: &mut SmallRng) -> Point {
    Point::new(
        1000.0 + rng.random_range(0.0..AREA),
        1000.0 + rng.random_range(0.0..AREA),
    )
}

fn distance(a: &Point, b: &Point) -> f64 {
    (a.lon() - b.lon()).hypot(a.lat() - b.lat())
}

/// Random trips over a day in a square area, one single-route customer per trip.
/// Coordinates are planar meters.
pub fn create_city_instance(params: &CityParams) -> Instance {
    let mut rng = SmallRng::seed_from_u64(params.seed);
    let start = date(2015, 10, 1).at(7, 0, 0, 0);

    let mut builder = InstanceBuilder::default();
    builder.set_name(format!("city-{}", params.seed));
    builder.set_coefficients(Coefficients {
        fuel_per_meter: 1.0 / 80_000.0,
        refuel_per_second: 1.0 / 5400.0,
        cost_per_meter: 1e-3,
        cost_per_vehicle: 20.0,
    });

    for id in 0..params.num_vehicles {
        let mut vehicle = VehicleBuilder::default();
        vehicle
            .set_id(id.to_string())
            .set_location(random_point(&mut rng))
            .set_start_time(start)
            .set_fuel(rng.random_range(0.5..=1.0));
        builder.add_vehicle(vehicle.build());
    }

    for id in 0..params.num_refuel_points {
        builder.add_refuel_point(RefuelPoint::new(id.to_string(), random_point(&mut rng)));
    }

    for id in 0..params.num_trips {
        let origin = random_point(&mut rng);
        let destination = random_point(&mut rng);
        let length = distance(&origin, &destination);

        let mut trip = TripBuilder::default();
        trip.set_id(id.to_string())
            .set_start_loc(origin)
            .set_finish_loc(destination)
            .set_start_time(start.saturating_add(SignedDuration::from_mins(
                rng.random_range(15..12 * 60),
            )))
            .set_duration(SignedDuration::from_secs((length / SPEED) as i64 + 300))
            .set_distance(length);

        builder.add_customer(CustomerInput {
            id,
            routes: vec![RouteInput {
                id,
                cost: rng.random_range(0.0..10.0),
                trips: vec![trip.build()],
            }],
        });
    }

    let locations = builder.extended_locations();
    let distances = locations
        .departures
        .iter()
        .map(|from| {
            locations
                .arrivals
                .iter()
                .map(|to| distance(from, to))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    let times = distances
        .iter()
        .map(|row| row.iter().map(|meters| meters / SPEED).collect())
        .collect();
    builder.set_travel_matrix(TravelMatrix::new(distances, times));

    builder.build().unwrap()
}

/// Assigns trips in start order to the first vehicle that can still serve them
/// directly. Trips no vehicle can serve stay uncovered.
pub fn create_greedy_solution(instance: &Instance) -> Solution {
    let mut duties = instance
        .vehicle_indices()
        .map(|vehicle| (vehicle, Duty::default()))
        .collect::<BTreeMap<VehicleIdx, Duty>>();

    for trip in instance.trip_indices() {
        for (&vehicle, duty) in duties.iter_mut() {
            let mut candidate = duty.clone();
            candidate.extend_from_slice(&[DutyStop::Trip(trip)]);
            if simulate_duty(instance, vehicle, &candidate).is_ok() {
                *duty = candidate;
                break;
            }
        }
    }

    Solution::new(duties)
}
