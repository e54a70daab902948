use rayon::prelude::*;
use tracing::{info, instrument};

use crate::{
    pareto::{ParetoParams, ParetoTable},
    problem::{entity::Vertex, instance::Instance, trip::TripIdx},
    timer_debug,
    utils::threads::Threads,
};

use super::{
    arc_feasibility::{ArcPolicy, evaluate_arc},
    edge::EdgeAttributes,
    graph::TaskGraph,
    node::{Node, NodeAttributes},
};

#[derive(Clone, Debug)]
pub struct TaskGraphParams {
    pub threads: Threads,
    /// Origin vertices evaluated per task
    pub chunk_size: usize,
    pub arc_policy: ArcPolicy,
    /// Restrict refuel candidates to the Pareto frontier and bound trip fuel
    pub restrict_refuel_points: bool,
    pub pareto: ParetoParams,
}

impl Default for TaskGraphParams {
    fn default() -> Self {
        Self {
            threads: Threads::default(),
            chunk_size: 100,
            arc_policy: ArcPolicy::default(),
            restrict_refuel_points: false,
            pareto: ParetoParams::default(),
        }
    }
}

/// Fuel a trip needs to still reach a refuel point afterwards, and the most
/// fuel it can have after topping up on the way to it.
pub fn trip_fuel_bounds(instance: &Instance, trip: TripIdx) -> (f64, f64) {
    let trip_fuel = instance.trip_fuel(trip);

    let to_refuel = instance
        .refuel_point_indices()
        .map(|refuel_point| instance.fuel(trip, refuel_point))
        .min_by(f64::total_cmp);
    let from_refuel = instance
        .refuel_point_indices()
        .map(|refuel_point| instance.fuel(refuel_point, trip))
        .min_by(f64::total_cmp);

    match (to_refuel, from_refuel) {
        (Some(to_refuel), Some(from_refuel)) => (
            (trip_fuel + to_refuel).min(1.0),
            (1.0 - from_refuel).max(0.0),
        ),
        _ => (trip_fuel, 1.0),
    }
}

/// Feasible edges leaving the vertices of one chunk.
fn evaluate_chunk(
    instance: &Instance,
    vertices: &[Vertex],
    pareto: Option<&ParetoTable>,
    policy: &ArcPolicy,
) -> Vec<(Vertex, TripIdx, EdgeAttributes)> {
    let mut edges = Vec::new();

    for &from in vertices {
        for to in instance.trip_indices() {
            if from == Vertex::Trip(to) {
                continue;
            }

            let candidates = pareto.map(|table| table.frontier(instance, from, to));
            if let Some(attributes) = evaluate_arc(instance, from, to, candidates, policy) {
                edges.push((from, to, attributes));
            }
        }
    }

    edges
}

/// Builds the full feasibility DAG of `instance`.
///
/// The edge set depends only on the instance and the policy, never on the chunking.
#[instrument(skip_all, level = "debug")]
pub fn build_taskgraph(instance: &Instance, params: &TaskGraphParams) -> TaskGraph {
    let pareto = if params.restrict_refuel_points {
        Some(timer_debug!(
            "Pareto table",
            instance.pareto_table(&params.pareto)
        ))
    } else {
        None
    };

    let vertices = instance.vertices().collect::<Vec<_>>();
    let chunk_size = params.chunk_size.max(1);

    let edges = timer_debug!(
        "Arc evaluation",
        params.threads.install(|| {
            vertices
                .par_chunks(chunk_size)
                .map(|chunk| evaluate_chunk(instance, chunk, pareto, &params.arc_policy))
                .collect::<Vec<_>>()
        })
    );

    let mut graph = TaskGraph::new();

    for vehicle in instance.vehicle_indices() {
        graph.add_node(
            Node::Vehicle(vehicle),
            NodeAttributes::vehicle(instance.vehicle(vehicle).fuel()),
        );
        graph.add_edge(Node::DepotStart, Node::Vehicle(vehicle), EdgeAttributes::ZERO);
    }

    for trip in instance.trip_indices() {
        let mut attributes = NodeAttributes::trip(instance.trip_fuel(trip), instance.trip_cost(trip));
        if params.restrict_refuel_points {
            let (fmin, fmax) = trip_fuel_bounds(instance, trip);
            attributes = attributes.with_fuel_bounds(fmin, fmax);
        }
        graph.add_node(Node::Trip(trip), attributes);
    }

    for (from, to, attributes) in edges.into_iter().flatten() {
        graph.add_edge(from.into(), Node::Trip(to), attributes);
    }

    for vertex in instance.vertices() {
        graph.add_edge(vertex.into(), Node::DepotEnd, EdgeAttributes::ZERO);
    }

    info!(
        "Task graph with {} nodes and {} edges",
        graph.num_nodes(),
        graph.num_edges()
    );

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        problem::vehicle::VehicleIdx,
        test_utils::{self, TestTrip},
    };

    #[test]
    fn test_scenario_graph() {
        let instance = test_utils::create_scenario_instance(30_000.0);

        let graph = build_taskgraph(&instance, &TaskGraphParams::default());

        let vehicle = Node::Vehicle(VehicleIdx::new(0));
        let trip = Node::Trip(TripIdx::new(0));
        assert!(graph.has_edge(Node::DepotStart, vehicle));
        assert!(graph.has_edge(vehicle, Node::DepotEnd));
        assert!(graph.has_edge(trip, Node::DepotEnd));
        assert_eq!(graph.num_edges(), 4);

        let edge = graph.edge(vehicle, trip).unwrap();
        assert!((edge.fe - 0.55).abs() < 1e-12);
        assert_eq!(graph.node_attributes(vehicle).unwrap().f0, Some(1.0));
        assert!((graph.node_attributes(trip).unwrap().ft.unwrap() - 0.3).abs() < 1e-12);
        assert!(graph.is_acyclic());
    }

    #[test]
    fn test_edges_respect_slack() {
        let instance = test_utils::create_chain_instance(6, 2);

        let graph = build_taskgraph(&instance, &TaskGraphParams::default());

        for (from, to, _) in graph.edges() {
            if let (Some(from), Some(to)) = (from.vertex(), to.trip()) {
                assert!(instance.time(from, to) <= instance.slack(from, to));
            }
        }
    }

    #[test]
    fn test_chunking_does_not_change_edges() {
        let instance = test_utils::create_chain_instance(7, 3);

        let single = build_taskgraph(
            &instance,
            &TaskGraphParams {
                threads: Threads::Single,
                chunk_size: 100,
                ..Default::default()
            },
        );
        let chunked = build_taskgraph(
            &instance,
            &TaskGraphParams {
                threads: Threads::Multi(3),
                chunk_size: 2,
                ..Default::default()
            },
        );

        assert_eq!(
            single.edges().collect::<Vec<_>>(),
            chunked.edges().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_fuel_bounds_without_refuel_points() {
        let instance =
            test_utils::create_test_instance(1, vec![TestTrip::new(0, 30, 20_000.0)], vec![]);

        let (fmin, fmax) = trip_fuel_bounds(&instance, TripIdx::new(0));

        assert!((fmin - 0.2).abs() < 1e-12);
        assert_eq!(fmax, 1.0);
    }

    #[test]
    fn test_restricted_graph_has_fuel_bounds() {
        let instance = test_utils::create_chain_instance(4, 2);

        let graph = build_taskgraph(
            &instance,
            &TaskGraphParams {
                restrict_refuel_points: true,
                ..Default::default()
            },
        );

        for trip in instance.trip_indices() {
            let attributes = graph.node_attributes(Node::Trip(trip)).unwrap();
            assert!(attributes.has_fuel_bounds());
            assert!(attributes.fmin.unwrap() <= 1.0);
            assert!(attributes.fmax.unwrap() >= 0.0);
        }
    }
}
