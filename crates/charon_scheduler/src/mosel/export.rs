//! Documents handed to the external solver.

use crate::{
    problem::{
        customer::CustomerIdx,
        entity::Scheduled,
        instance::Instance,
    },
    subproblem::extractor::Subproblem,
    taskgraph::{
        edge::EdgeAttributes,
        graph::TaskGraph,
        node::{DEPOT_END, DEPOT_START, Node, NodeAttributes},
        splitter::SplitInterval,
    },
    utils::time::seconds_between,
};

use super::value::{Document, Value};

fn tokens(graph: &TaskGraph, instance: &Instance, nodes: impl Iterator<Item = Node>) -> Value {
    Value::List(
        nodes
            .map(|node| Value::Text(graph.identity(instance, node)))
            .collect(),
    )
}

fn node_table(
    graph: &TaskGraph,
    instance: &Instance,
    attribute: impl Fn(&NodeAttributes) -> Option<f64>,
) -> Value {
    Value::Table(
        graph
            .nodes()
            .filter_map(|(node, attributes)| {
                attribute(attributes)
                    .map(|value| (vec![Value::Text(graph.identity(instance, node))], Value::Real(value)))
            })
            .collect(),
    )
}

/// Edges between vehicles, trips and splitpoints. Depot edges carry no attributes.
fn attributed_edges(graph: &TaskGraph) -> impl Iterator<Item = (Node, Node, &EdgeAttributes)> {
    graph
        .edges()
        .filter(|(from, to, _)| !from.is_depot() && !to.is_depot())
}

fn edge_table<T: Into<Value>>(
    graph: &TaskGraph,
    instance: &Instance,
    attribute: impl Fn(&EdgeAttributes) -> T,
) -> Value {
    Value::Table(
        attributed_edges(graph)
            .map(|(from, to, attributes)| {
                (
                    vec![
                        Value::Text(graph.identity(instance, from)),
                        Value::Text(graph.identity(instance, to)),
                    ],
                    attribute(attributes).into(),
                )
            })
            .collect(),
    )
}

fn neighbourhoods(graph: &TaskGraph, instance: &Instance, document: &mut Document) {
    document
        .insert(
            "Nin",
            Value::Table(
                graph
                    .nodes()
                    .map(|(node, _)| {
                        (
                            vec![Value::Text(graph.identity(instance, node))],
                            tokens(graph, instance, graph.predecessors(node)),
                        )
                    })
                    .collect(),
            ),
        )
        .insert(
            "Nout",
            Value::Table(
                graph
                    .nodes()
                    .map(|(node, _)| {
                        (
                            vec![Value::Text(graph.identity(instance, node))],
                            tokens(graph, instance, graph.successors(node).map(|(to, _)| to)),
                        )
                    })
                    .collect(),
            ),
        );
}

fn edge_attributes(graph: &TaskGraph, instance: &Instance, document: &mut Document) {
    document
        .insert(
            "Trip_Refuelpoints",
            edge_table(graph, instance, |edge| {
                edge.refuel_point
                    .map_or_else(String::new, |refuel_point| instance.identity(refuel_point))
            }),
        )
        .insert("FE", edge_table(graph, instance, |edge| edge.fe))
        .insert("FG", edge_table(graph, instance, |edge| edge.fg))
        .insert("FH", edge_table(graph, instance, |edge| edge.fh))
        .insert("FD", edge_table(graph, instance, |edge| edge.fd))
        .insert("FR", edge_table(graph, instance, |edge| edge.fr))
        .insert("CE", edge_table(graph, instance, |edge| edge.ce))
        .insert("CD", edge_table(graph, instance, |edge| edge.cd));
}

fn customers(instance: &Instance, customers: &[CustomerIdx], document: &mut Document) {
    let routes = customers
        .iter()
        .flat_map(|&customer| instance.customer(customer).routes().iter().copied())
        .collect::<Vec<_>>();

    document
        .insert(
            "Customers",
            Value::List(
                customers
                    .iter()
                    .map(|&customer| Value::from(instance.customer(customer).id()))
                    .collect(),
            ),
        )
        .insert(
            "Customer_Routes",
            Value::Table(
                customers
                    .iter()
                    .map(|&customer| {
                        let customer = instance.customer(customer);
                        (
                            vec![Value::from(customer.id())],
                            Value::List(
                                customer
                                    .routes()
                                    .iter()
                                    .map(|&route| Value::from(instance.route(route).id()))
                                    .collect(),
                            ),
                        )
                    })
                    .collect(),
            ),
        )
        .insert(
            "Routes",
            Value::Table(
                routes
                    .iter()
                    .map(|&route| {
                        let route = instance.route(route);
                        (
                            vec![Value::from(route.id())],
                            Value::texts(route.trips().iter().map(|&trip| instance.identity(trip))),
                        )
                    })
                    .collect(),
            ),
        )
        .insert(
            "Route_Costs",
            Value::Table(
                routes
                    .iter()
                    .map(|&route| {
                        let route = instance.route(route);
                        (vec![Value::from(route.id())], Value::Real(route.cost()))
                    })
                    .collect(),
            ),
        );
}

fn coefficients(instance: &Instance, document: &mut Document) {
    let coefficients = instance.coefficients();
    document
        .insert("FuelPerMeter", coefficients.fuel_per_meter)
        .insert("RefuelPerSecond", coefficients.refuel_per_second)
        .insert("CostPerMeter", coefficients.cost_per_meter)
        .insert("CostPerVehicle", coefficients.cost_per_vehicle);
}

/// Full task graph with every customer of the instance.
pub fn graph_document(instance: &Instance, graph: &TaskGraph) -> Document {
    let mut document = Document::new();
    let nodes = graph.nodes().map(|(node, _)| node).collect::<Vec<_>>();

    document
        .insert("DS", DEPOT_START)
        .insert("DE", DEPOT_END)
        .insert(
            "Vehicles",
            tokens(graph, instance, nodes.iter().copied().filter(|node| matches!(node, Node::Vehicle(_)))),
        )
        .insert(
            "Trips",
            tokens(graph, instance, nodes.iter().copied().filter(|node| matches!(node, Node::Trip(_)))),
        )
        .insert(
            "Refuelpoints",
            Value::texts(
                instance
                    .refuel_point_indices()
                    .map(|refuel_point| instance.identity(refuel_point)),
            ),
        );

    neighbourhoods(graph, instance, &mut document);

    document
        .insert("F0", node_table(graph, instance, |node| node.f0))
        .insert("FT", node_table(graph, instance, |node| node.ft))
        .insert("CT", node_table(graph, instance, |node| node.ct));
    if graph.nodes().any(|(_, attributes)| attributes.has_fuel_bounds()) {
        document
            .insert("FMIN", node_table(graph, instance, |node| node.fmin))
            .insert("FMAX", node_table(graph, instance, |node| node.fmax));
    }

    edge_attributes(graph, instance, &mut document);
    customers(
        instance,
        &instance.customer_indices().collect::<Vec<_>>(),
        &mut document,
    );
    coefficients(instance, &mut document);

    document
}

/// Split graph with its intervals, numbered from 1.
pub fn split_document(
    instance: &Instance,
    graph: &TaskGraph,
    intervals: &[SplitInterval],
) -> Document {
    let mut document = graph_document(instance, graph);
    let origin = instance
        .vehicles()
        .iter()
        .map(|vehicle| vehicle.start_time())
        .min()
        .or_else(|| instance.horizon().map(|(start, _)| start));

    let per_interval = |value: &dyn Fn(&SplitInterval) -> Value| {
        Value::Table(
            intervals
                .iter()
                .enumerate()
                .map(|(i, interval)| (vec![Value::from(i + 1)], value(interval)))
                .collect(),
        )
    };

    document
        .insert(
            "I",
            Value::List((1..=intervals.len()).map(Value::from).collect()),
        )
        .insert(
            "T_Partial",
            per_interval(&|interval: &SplitInterval| {
                Value::texts(interval.trips.iter().map(|&trip| instance.identity(trip)))
            }),
        )
        .insert(
            "P_Partial",
            per_interval(&|interval: &SplitInterval| {
                tokens(
                    graph,
                    instance,
                    interval.splitpoints.iter().map(|&splitpoint| Node::Splitpoint(splitpoint)),
                )
            }),
        )
        .insert(
            "SP",
            tokens(graph, instance, graph.splitpoint_indices().map(Node::Splitpoint)),
        )
        .insert(
            "RT",
            per_interval(&|interval: &SplitInterval| {
                Value::List(
                    interval
                        .closed_routes
                        .iter()
                        .map(|&route| Value::from(instance.route(route).id()))
                        .collect(),
                )
            }),
        )
        .insert(
            "C",
            per_interval(&|interval: &SplitInterval| {
                Value::List(
                    interval
                        .closed_customers
                        .iter()
                        .map(|&customer| Value::from(instance.customer(customer).id()))
                        .collect(),
                )
            }),
        )
        .insert(
            "M",
            per_interval(&|interval: &SplitInterval| {
                Value::Real(origin.map_or(0.0, |origin| seconds_between(origin, interval.end)))
            }),
        );

    document
}

/// Hot start subproblem around some critical customers.
pub fn subproblem_document(instance: &Instance, subproblem: &Subproblem) -> Document {
    let graph = &subproblem.graph;
    let mut document = Document::new();

    document
        .insert("DS", DEPOT_START)
        .insert("DE", DEPOT_END)
        .insert(
            "StartPoints",
            Value::texts(subproblem.start_points.iter().map(|&vertex| instance.identity(vertex))),
        )
        .insert(
            "EndPoints",
            Value::texts(subproblem.end_points.iter().map(|&trip| instance.identity(trip))),
        )
        .insert(
            "Trips",
            Value::texts(subproblem.trips.iter().map(|&trip| instance.identity(trip))),
        )
        .insert(
            "Refuelpoints",
            Value::texts(
                instance
                    .refuel_point_indices()
                    .map(|refuel_point| instance.identity(refuel_point)),
            ),
        )
        .insert(
            "F0",
            Value::Table(
                subproblem
                    .start_fuel
                    .iter()
                    .map(|(&vertex, &fuel)| (vec![Value::Text(instance.identity(vertex))], Value::Real(fuel)))
                    .collect(),
            ),
        )
        .insert(
            "FEND",
            Value::Table(
                subproblem
                    .end_fuel
                    .iter()
                    .map(|(&trip, &fuel)| (vec![Value::Text(instance.identity(trip))], Value::Real(fuel)))
                    .collect(),
            ),
        )
        .insert("FT", node_table(graph, instance, |node| node.ft))
        .insert("CT", node_table(graph, instance, |node| node.ct));

    neighbourhoods(graph, instance, &mut document);
    edge_attributes(graph, instance, &mut document);
    customers(instance, &subproblem.customers, &mut document);
    coefficients(instance, &mut document);

    document
}
