use jiff::{
    SignedDuration,
    civil::{DateTime, date},
};

use crate::problem::{
    coefficients::Coefficients,
    instance::{CustomerInput, ExtendedLocations, Instance, InstanceBuilder, RouteInput},
    point::Point,
    refuel_point::RefuelPoint,
    travel_matrix::TravelMatrix,
    trip::{Trip, TripBuilder},
    vehicle::{Vehicle, VehicleBuilder},
};

/// Meters per second of every deadhead in the test instances.
const SPEED: f64 = 10.0;

pub fn day_start() -> DateTime {
    date(2015, 10, 1).at(8, 0, 0, 0)
}

fn at_minutes(minutes: i64) -> DateTime {
    day_start().saturating_add(SignedDuration::from_mins(minutes))
}

/// Coordinates are read as planar meters.
fn planar_matrix(locations: &ExtendedLocations) -> TravelMatrix {
    let distances = locations
        .departures
        .iter()
        .map(|from| {
            locations
                .arrivals
                .iter()
                .map(|to| (from.lon() - to.lon()).hypot(from.lat() - to.lat()))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    let times = distances
        .iter()
        .map(|row| row.iter().map(|distance| distance / SPEED).collect())
        .collect();

    TravelMatrix::new(distances, times)
}

fn vehicle(id: usize, location: Point) -> Vehicle {
    let mut builder = VehicleBuilder::default();
    builder
        .set_id(id.to_string())
        .set_location(location)
        .set_start_time(day_start())
        .set_fuel(1.0);
    builder.build()
}

fn trip(id: usize, start: Point, finish: Point, start_time: DateTime, minutes: i64) -> Trip {
    let mut builder = TripBuilder::default();
    builder
        .set_id(id.to_string())
        .set_start_loc(start)
        .set_finish_loc(finish)
        .set_start_time(start_time)
        .set_duration(SignedDuration::from_mins(minutes))
        .set_distance((finish.lon() - start.lon()).hypot(finish.lat() - start.lat()));
    builder.build()
}

/// Every trip becomes a customer with a single free route.
fn single_trip_customer(id: usize, trip: Trip) -> CustomerInput {
    CustomerInput {
        id,
        routes: vec![RouteInput {
            id,
            cost: 0.0,
            trips: vec![trip],
        }],
    }
}

fn build(mut builder: InstanceBuilder) -> Instance {
    let matrix = planar_matrix(&builder.extended_locations());
    builder.set_travel_matrix(matrix);
    builder.build().unwrap()
}

/// One vehicle and `num_trips` hourly trips of 5 km, each back at the start of the next.
///
/// Trip `i` starts at 08:00 + i hours and lasts 30 minutes, from (1000, 1000) to (6000, 1000).
/// Refuel points sit north of the middle of the trips.
pub fn create_chain_instance(num_trips: usize, num_refuel_points: usize) -> Instance {
    let mut builder = InstanceBuilder::default();
    builder
        .set_name(String::from("chain"))
        .set_coefficients(Coefficients::default())
        .set_vehicles(vec![vehicle(0, Point::new(1000.0, 1000.0))])
        .set_refuel_points(
            (0..num_refuel_points)
                .map(|k| {
                    RefuelPoint::new(
                        k.to_string(),
                        Point::new(3500.0, 2000.0 + 500.0 * k as f64),
                    )
                })
                .collect(),
        );

    for i in 0..num_trips {
        builder.add_customer(single_trip_customer(
            i,
            trip(
                i,
                Point::new(1000.0, 1000.0),
                Point::new(6000.0, 1000.0),
                at_minutes(60 * i as i64),
                30,
            ),
        ));
    }

    build(builder)
}

/// Trip heading east from (1000, 1000) over `distance` meters.
pub struct TestTrip {
    start_minutes: i64,
    duration_minutes: i64,
    distance: f64,
}

impl TestTrip {
    /// `start_minutes` counts from 08:00.
    pub fn new(start_minutes: i64, duration_minutes: i64, distance: f64) -> Self {
        Self {
            start_minutes,
            duration_minutes,
            distance,
        }
    }

    fn start(&self) -> Point {
        Point::new(1000.0, 1000.0)
    }

    fn finish(&self) -> Point {
        Point::new(1000.0 + self.distance, 1000.0)
    }
}

/// Refuel point halfway from the end of one trip to the start of another, shifted north.
pub struct TestRefuelPoint {
    from: usize,
    to: usize,
    offset: f64,
}

impl TestRefuelPoint {
    pub fn between(from: usize, to: usize, offset: f64) -> Self {
        Self { from, to, offset }
    }
}

/// `num_vehicles` vehicles at (1000, 1000) from 08:00, one customer per trip.
pub fn create_test_instance(
    num_vehicles: usize,
    trips: Vec<TestTrip>,
    refuel_points: Vec<TestRefuelPoint>,
) -> Instance {
    let mut builder = InstanceBuilder::default();
    builder
        .set_name(String::from("test"))
        .set_coefficients(Coefficients::default())
        .set_vehicles(
            (0..num_vehicles)
                .map(|id| vehicle(id, Point::new(1000.0, 1000.0)))
                .collect(),
        )
        .set_refuel_points(
            refuel_points
                .iter()
                .enumerate()
                .map(|(k, refuel_point)| {
                    let from = trips[refuel_point.from].finish();
                    let to = trips[refuel_point.to].start();
                    RefuelPoint::new(
                        k.to_string(),
                        Point::new(
                            (from.lon() + to.lon()) / 2.0,
                            (from.lat() + to.lat()) / 2.0 + refuel_point.offset,
                        ),
                    )
                })
                .collect(),
        );

    for (i, test_trip) in trips.iter().enumerate() {
        builder.add_customer(single_trip_customer(
            i,
            trip(
                i,
                test_trip.start(),
                test_trip.finish(),
                at_minutes(test_trip.start_minutes),
                test_trip.duration_minutes,
            ),
        ));
    }

    build(builder)
}

/// One vehicle 55 km away from a single 20 minute trip starting at 08:10.
///
/// The deadhead takes exactly the ten minutes of slack.
pub fn create_scenario_instance(trip_distance: f64) -> Instance {
    let mut builder = InstanceBuilder::default();
    builder
        .set_name(String::from("scenario"))
        .set_coefficients(Coefficients::default())
        .set_vehicles(vec![vehicle(0, Point::new(1000.0, 1000.0))]);

    let mut trip = TripBuilder::default();
    trip.set_id(String::from("0"))
        .set_start_loc(Point::new(56_000.0, 1000.0))
        .set_finish_loc(Point::new(56_000.0 + trip_distance, 1000.0))
        .set_start_time(at_minutes(10))
        .set_duration(SignedDuration::from_mins(20))
        .set_distance(trip_distance);
    builder.add_customer(single_trip_customer(0, trip.build()));

    // Rows: vehicle, trip destination. Columns: vehicle, trip origin.
    builder.set_travel_matrix(TravelMatrix::new(
        vec![vec![0.0, 55_000.0], vec![55_000.0, 0.0]],
        vec![vec![0.0, 600.0], vec![600.0, 0.0]],
    ));

    builder.build().unwrap()
}

/// A trip at 08:00 that its only vehicle has no route to.
pub fn create_unreachable_instance() -> Instance {
    let mut builder = InstanceBuilder::default();
    builder
        .set_name(String::from("unreachable"))
        .set_coefficients(Coefficients::default())
        .set_vehicles(vec![vehicle(0, Point::new(1000.0, 1000.0))]);
    builder.add_customer(single_trip_customer(
        0,
        trip(
            0,
            Point::new(51_000.0, 1000.0),
            Point::new(56_000.0, 1000.0),
            day_start(),
            30,
        ),
    ));

    builder.set_travel_matrix(TravelMatrix::new(
        vec![vec![0.0, f64::INFINITY], vec![55_000.0, 0.0]],
        vec![vec![0.0, f64::INFINITY], vec![5500.0, 0.0]],
    ));

    builder.build().unwrap()
}

/// One vehicle and one trip at 08:20 with two refuel points, 20 minutes of slack.
///
/// Refuel point 0 is close but too slow to reach (window of -200 s), refuel point 1
/// is far and fast (window of 200 s). Point 0 dominates point 1 on every objective.
pub fn create_dominated_refuel_instance() -> Instance {
    let mut builder = InstanceBuilder::default();
    builder
        .set_name(String::from("dominated"))
        .set_coefficients(Coefficients::default())
        .set_vehicles(vec![vehicle(0, Point::new(1000.0, 1000.0))])
        .set_refuel_points(vec![
            RefuelPoint::new(String::from("0"), Point::new(1050.0, 1000.0)),
            RefuelPoint::new(String::from("1"), Point::new(9000.0, 1000.0)),
        ]);
    builder.add_customer(single_trip_customer(
        0,
        trip(
            0,
            Point::new(2000.0, 1000.0),
            Point::new(7000.0, 1000.0),
            at_minutes(20),
            30,
        ),
    ));

    // Rows: vehicle, trip destination, refuel points. Columns: vehicle, trip origin, refuel points.
    builder.set_travel_matrix(TravelMatrix::new(
        vec![
            vec![0.0, 1000.0, 100.0, 8000.0],
            vec![1000.0, 0.0, 100.0, 8000.0],
            vec![100.0, 100.0, 0.0, 8000.0],
            vec![8000.0, 8000.0, 8000.0, 0.0],
        ],
        vec![
            vec![0.0, 600.0, 700.0, 500.0],
            vec![600.0, 0.0, 700.0, 500.0],
            vec![700.0, 700.0, 0.0, 1000.0],
            vec![500.0, 500.0, 1000.0, 0.0],
        ],
    ));

    builder.build().unwrap()
}
