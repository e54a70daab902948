use std::collections::{BTreeMap, BTreeSet};

use jiff::{SignedDuration, civil::DateTime};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::{
    problem::{
        customer::CustomerIdx,
        entity::{Scheduled, Vertex},
        instance::Instance,
        trip::TripIdx,
        vehicle::VehicleIdx,
    },
    solution::{
        solution::{FuelState, Solution},
        validator::ValidationError,
    },
    taskgraph::{edge::EdgeAttributes, graph::TaskGraph, node::Node},
};

#[derive(Debug, Error)]
pub enum SubproblemError {
    #[error("No critical customers given")]
    NoCustomers,

    #[error("Fuel states cannot be derived from an infeasible solution: {0}")]
    Infeasible(#[from] ValidationError),
}

#[derive(Clone, Debug)]
pub struct SubproblemParams {
    /// Margin added on both sides of the critical customers' time span
    pub epsilon: SignedDuration,
}

impl Default for SubproblemParams {
    fn default() -> Self {
        Self {
            epsilon: SignedDuration::from_hours(1),
        }
    }
}

/// Free part of a solution around some critical customers, re-solvable on its own.
#[derive(Clone, Debug)]
pub struct Subproblem {
    pub customers: Vec<CustomerIdx>,
    pub window: (DateTime, DateTime),
    /// Where each affected duty is cut open: its last fixed trip, or the vehicle
    pub start_points: Vec<Vertex>,
    /// First fixed trip after the window of each affected duty that continues
    pub end_points: Vec<TripIdx>,
    /// Free trips, served anew by the solver
    pub trips: Vec<TripIdx>,
    /// Fuel available after each start point
    pub start_fuel: BTreeMap<Vertex, f64>,
    /// Fuel required when arriving at each end point
    pub end_fuel: BTreeMap<TripIdx, f64>,
    pub graph: TaskGraph,
}

/// Fuel states recorded by the solver, completed by replaying the duties.
fn fuel_states(
    instance: &Instance,
    solution: &Solution,
) -> Result<BTreeMap<Vertex, FuelState>, ValidationError> {
    let mut states = solution
        .simulated_fuel_states(instance)?
        .into_iter()
        .collect::<BTreeMap<_, _>>();

    for (vertex, state) in states.iter_mut() {
        if let Some(recorded) = solution.fuel_state(*vertex) {
            *state = recorded;
        }
    }

    Ok(states)
}

/// Open segment of one duty: the stop before it and the first stop after it.
struct Segment {
    start: Vertex,
    end: Option<TripIdx>,
    free: Vec<TripIdx>,
}

fn open_segment(
    solution: &Solution,
    vehicle: VehicleIdx,
    is_free: impl Fn(TripIdx) -> bool,
) -> Option<Segment> {
    let trips = solution.duty(vehicle)?.trips().collect::<Vec<_>>();
    let first = trips.iter().position(|&trip| is_free(trip))?;
    let last = trips.iter().rposition(|&trip| is_free(trip))?;

    Some(Segment {
        start: first
            .checked_sub(1)
            .map_or(Vertex::Vehicle(vehicle), |i| Vertex::Trip(trips[i])),
        end: trips.get(last + 1).copied(),
        free: trips[first..=last].to_vec(),
    })
}

/// Cuts every duty touching the window of `customers` open and copies the graph edges
/// between the cut points.
///
/// `graph` must be the unsplit task graph of `instance`.
#[instrument(skip_all, level = "debug")]
pub fn extract_subproblem(
    instance: &Instance,
    graph: &TaskGraph,
    solution: &Solution,
    customers: &[CustomerIdx],
    params: &SubproblemParams,
) -> Result<Subproblem, SubproblemError> {
    let window_start = customers
        .iter()
        .map(|&customer| instance.earliest_start(customer))
        .min()
        .ok_or(SubproblemError::NoCustomers)?
        .saturating_sub(params.epsilon);
    let window_end = customers
        .iter()
        .map(|&customer| instance.latest_start(customer))
        .max()
        .ok_or(SubproblemError::NoCustomers)?
        .saturating_add(params.epsilon);

    let critical_trips = customers
        .iter()
        .flat_map(|&customer| instance.customer(customer).routes())
        .flat_map(|&route| instance.route(route).trips().iter().copied())
        .collect::<BTreeSet<_>>();

    let is_free = |trip: TripIdx| {
        let start = instance.trip(trip).start_time();
        critical_trips.contains(&trip) || (window_start <= start && start <= window_end)
    };

    let states = fuel_states(instance, solution)?;

    let mut start_points = Vec::new();
    let mut end_points = Vec::new();
    let mut trips = critical_trips.clone();
    let mut start_fuel = BTreeMap::new();
    let mut end_fuel = BTreeMap::new();

    for vehicle in solution.vehicles() {
        let segment = match open_segment(solution, vehicle, &is_free) {
            Some(segment) => segment,
            // Idle vehicles available in time join with their initial fuel.
            None if solution.duty(vehicle).is_some_and(|duty| duty.is_empty())
                && instance.vehicle(vehicle).start_time() <= window_end =>
            {
                Segment {
                    start: Vertex::Vehicle(vehicle),
                    end: None,
                    free: Vec::new(),
                }
            }
            None => continue,
        };

        let fuel = states
            .get(&segment.start)
            .map_or(instance.vehicle(vehicle).fuel(), |state| state.max);
        start_fuel.insert(segment.start, fuel);
        start_points.push(segment.start);

        if let Some(end) = segment.end {
            let stored = states.get(&Vertex::Trip(end)).map_or(0.0, |state| state.min);
            end_fuel.insert(end, stored + instance.trip_fuel(end));
            end_points.push(end);
        }

        trips.extend(segment.free);
    }

    let trips = trips.into_iter().collect::<Vec<_>>();
    let graph = copy_subgraph(graph, &start_points, &trips, &end_points);

    info!(
        "Subproblem for {} customers between {} and {}: {} start points, {} end points, {} trips",
        customers.len(),
        window_start,
        window_end,
        start_points.len(),
        end_points.len(),
        trips.len()
    );

    Ok(Subproblem {
        customers: customers.to_vec(),
        window: (window_start, window_end),
        start_points,
        end_points,
        trips,
        start_fuel,
        end_fuel,
        graph,
    })
}

/// Existing edges from start points and trips into trips and end points, plus the depot edges.
fn copy_subgraph(
    graph: &TaskGraph,
    start_points: &[Vertex],
    trips: &[TripIdx],
    end_points: &[TripIdx],
) -> TaskGraph {
    let mut subgraph = TaskGraph::new();

    let sources = start_points
        .iter()
        .map(|&vertex| Node::from(vertex))
        .chain(trips.iter().map(|&trip| Node::Trip(trip)))
        .collect::<Vec<_>>();
    let targets = trips
        .iter()
        .chain(end_points)
        .map(|&trip| Node::Trip(trip))
        .collect::<BTreeSet<_>>();

    for node in sources.iter().chain(&targets) {
        if let Some(attributes) = graph.node_attributes(*node) {
            subgraph.add_node(*node, *attributes);
        }
    }

    for &start in start_points {
        subgraph.add_edge(Node::DepotStart, start.into(), EdgeAttributes::ZERO);
    }

    for &from in &sources {
        for (to, attributes) in graph.successors(from) {
            if targets.contains(&to) || to == Node::DepotEnd {
                subgraph.add_edge(from, to, *attributes);
            }
        }
    }

    for &end in end_points {
        subgraph.add_edge(Node::Trip(end), Node::DepotEnd, EdgeAttributes::ZERO);
    }

    debug!(
        "Copied {} nodes and {} edges",
        subgraph.num_nodes(),
        subgraph.num_edges()
    );

    subgraph
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        solution::duty::{Duty, DutyStop},
        taskgraph::builder::{TaskGraphParams, build_taskgraph},
        test_utils,
    };

    fn chain_solution(num_trips: usize) -> Solution {
        Solution::new(BTreeMap::from([(
            VehicleIdx::new(0),
            (0..num_trips)
                .map(|i| DutyStop::Trip(TripIdx::new(i)))
                .collect::<Duty>(),
        )]))
    }

    #[test]
    fn test_cuts_duty_around_window() {
        // Trips start at 08:00, 09:00, ..., 12:00.
        let instance = test_utils::create_chain_instance(5, 0);
        let graph = build_taskgraph(&instance, &TaskGraphParams::default());
        let solution = chain_solution(5);

        let subproblem = extract_subproblem(
            &instance,
            &graph,
            &solution,
            &[instance.customer_of(TripIdx::new(2))],
            &SubproblemParams {
                epsilon: SignedDuration::from_mins(30),
            },
        )
        .unwrap();

        assert_eq!(subproblem.start_points, vec![Vertex::Trip(TripIdx::new(1))]);
        assert_eq!(subproblem.end_points, vec![TripIdx::new(3)]);
        assert_eq!(subproblem.trips, vec![TripIdx::new(2)]);

        let graph = &subproblem.graph;
        assert!(graph.has_edge(Node::Trip(TripIdx::new(1)), Node::Trip(TripIdx::new(2))));
        assert!(graph.has_edge(Node::Trip(TripIdx::new(2)), Node::Trip(TripIdx::new(3))));
        assert!(graph.has_edge(Node::Trip(TripIdx::new(1)), Node::Trip(TripIdx::new(3))));
        assert!(!graph.contains_node(Node::Trip(TripIdx::new(0))));
        assert!(!graph.contains_node(Node::Trip(TripIdx::new(4))));
    }

    #[test]
    fn test_boundary_fuel_uses_recorded_states() {
        let instance = test_utils::create_chain_instance(5, 0);
        let graph = build_taskgraph(&instance, &TaskGraphParams::default());
        let mut solution = chain_solution(5);
        solution.set_fuel_state(
            Vertex::Trip(TripIdx::new(1)),
            FuelState { min: 0.6, max: 0.8 },
        );
        solution.set_fuel_state(
            Vertex::Trip(TripIdx::new(3)),
            FuelState { min: 0.2, max: 0.4 },
        );

        let subproblem = extract_subproblem(
            &instance,
            &graph,
            &solution,
            &[instance.customer_of(TripIdx::new(2))],
            &SubproblemParams {
                epsilon: SignedDuration::from_mins(30),
            },
        )
        .unwrap();

        assert_eq!(subproblem.start_fuel[&Vertex::Trip(TripIdx::new(1))], 0.8);
        assert!(
            (subproblem.end_fuel[&TripIdx::new(3)] - (0.2 + instance.trip_fuel(TripIdx::new(3))))
                .abs()
                < 1e-12
        );
    }

    #[test]
    fn test_window_at_duty_start_uses_vehicle() {
        let instance = test_utils::create_chain_instance(3, 0);
        let graph = build_taskgraph(&instance, &TaskGraphParams::default());
        let solution = chain_solution(3);

        let subproblem = extract_subproblem(
            &instance,
            &graph,
            &solution,
            &[instance.customer_of(TripIdx::new(0))],
            &SubproblemParams {
                epsilon: SignedDuration::ZERO,
            },
        )
        .unwrap();

        let vehicle = Vertex::Vehicle(VehicleIdx::new(0));
        assert_eq!(subproblem.start_points, vec![vehicle]);
        assert_eq!(subproblem.start_fuel[&vehicle], 1.0);
        assert!(
            extract_subproblem(&instance, &graph, &solution, &[], &SubproblemParams::default())
                .is_err()
        );
    }
}
