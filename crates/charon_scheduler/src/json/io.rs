use std::{collections::BTreeMap, path::Path};

use fxhash::FxHashMap;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    pareto::ParetoTable,
    problem::{
        entity::Entity,
        instance::{Instance, InstanceBuilder, InstanceError},
        splitpoint::Splitpoint,
    },
    storage::{read_bytes, write_bytes},
    taskgraph::{
        edge::EdgeAttributes,
        graph::TaskGraph,
        node::{DEPOT_END, DEPOT_START, Node},
    },
};

use super::types::{
    FromInstance, JsonEdge, JsonGraphMetadata, JsonInstance, JsonNode, JsonSplitpoint,
    JsonTaskGraph,
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error("Unknown reference {0}")]
    UnknownReference(String),

    #[error("{0} cannot be a task graph node")]
    InvalidNode(String),

    #[error("Pareto table rows are not rectangular")]
    InvalidParetoTable,
}

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    write_bytes(&serde_json::to_vec(value)?, path)?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    Ok(serde_json::from_slice(&read_bytes(path)?)?)
}

#[instrument(skip_all, level = "debug")]
pub fn save_instance(path: &Path, instance: &Instance) -> Result<(), StorageError> {
    save_json(path, &JsonInstance::from(instance))?;
    info!("Saved instance to {}", path.display());

    Ok(())
}

/// Reads an instance that may still lack its travel matrix.
#[instrument(skip_all, level = "debug")]
pub fn load_instance_builder(path: &Path) -> Result<InstanceBuilder, StorageError> {
    let mut json: JsonInstance = load_json(path)?;
    if json.name.is_none() {
        json.name = file_stem(path);
    }
    let (mut builder, pareto) = json.into_builder();

    if let Some(rows) = pareto {
        builder.set_pareto_table(
            ParetoTable::from_rows(rows).ok_or(StorageError::InvalidParetoTable)?,
        );
    }

    Ok(builder)
}

/// File name without its `.json` or `.json.gz` extensions.
fn file_stem(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let name = name.strip_suffix(".gz").unwrap_or(name);
    let name = name.strip_suffix(".json").unwrap_or(name);

    Some(name.to_owned())
}

pub fn load_instance(path: &Path) -> Result<Instance, StorageError> {
    let instance = load_instance_builder(path)?.build()?;
    info!(
        "Loaded instance with {} vehicles, {} trips and {} refuel points",
        instance.vehicles().len(),
        instance.trips().len(),
        instance.refuel_points().len()
    );

    Ok(instance)
}

impl FromInstance<&TaskGraph> for JsonTaskGraph {
    fn from_instance(graph: &TaskGraph, instance: &Instance) -> Self {
        let coefficients = instance.coefficients();

        let nodes = graph
            .nodes()
            .map(|(node, attributes)| {
                let mut json = JsonNode::new(graph.identity(instance, node), attributes);
                if let Node::Splitpoint(splitpoint) = node {
                    let splitpoint = graph.splitpoint(splitpoint);
                    json.splitpoint = Some(JsonSplitpoint {
                        time: splitpoint.time(),
                        successor: instance.identity(splitpoint.successor()),
                        cut: splitpoint.cut(),
                    });
                }
                json
            })
            .collect();

        let mut successors = BTreeMap::<String, BTreeMap<String, JsonEdge>>::new();
        for (from, to, attributes) in graph.edges() {
            successors
                .entry(graph.identity(instance, from))
                .or_default()
                .insert(
                    graph.identity(instance, to),
                    JsonEdge::from_instance(attributes, instance),
                );
        }

        JsonTaskGraph {
            graph: JsonGraphMetadata {
                ds: String::from(DEPOT_START),
                de: String::from(DEPOT_END),
                fuelpermeter: coefficients.fuel_per_meter,
                refuelpersecond: coefficients.refuel_per_second,
            },
            nodes,
            successors,
        }
    }
}

#[instrument(skip_all, level = "debug")]
pub fn save_taskgraph(path: &Path, instance: &Instance, graph: &TaskGraph) -> Result<(), StorageError> {
    save_json(path, &JsonTaskGraph::from_instance(graph, instance))?;
    info!(
        "Saved task graph with {} nodes and {} edges to {}",
        graph.num_nodes(),
        graph.num_edges(),
        path.display()
    );

    Ok(())
}

/// Rebuilds a task graph of `instance`, resolving node tokens through its identity dictionary.
pub fn taskgraph_from_json(
    json: JsonTaskGraph,
    instance: &Instance,
) -> Result<TaskGraph, StorageError> {
    let coefficients = instance.coefficients();
    if json.graph.fuelpermeter != coefficients.fuel_per_meter
        || json.graph.refuelpersecond != coefficients.refuel_per_second
    {
        warn!("Task graph was built with other fuel coefficients than the instance");
    }

    let dictionary = instance.dictionary();
    let mut graph = TaskGraph::new();
    let mut nodes = FxHashMap::default();
    nodes.insert(json.graph.ds.clone(), Node::DepotStart);
    nodes.insert(json.graph.de.clone(), Node::DepotEnd);

    for json_node in &json.nodes {
        let node = match (&json_node.splitpoint, nodes.get(&json_node.id)) {
            (None, Some(&depot)) => depot,
            (None, None) => match dictionary.resolve(&json_node.id) {
                Some(Entity::Vehicle(vehicle)) => Node::Vehicle(vehicle),
                Some(Entity::Trip(trip)) => Node::Trip(trip),
                Some(Entity::RefuelPoint(_)) => {
                    return Err(StorageError::InvalidNode(json_node.id.clone()));
                }
                None => return Err(StorageError::UnknownReference(json_node.id.clone())),
            },
            (Some(splitpoint), _) => {
                let successor = match dictionary.resolve(&splitpoint.successor) {
                    Some(Entity::Trip(trip)) => trip,
                    _ => return Err(StorageError::UnknownReference(splitpoint.successor.clone())),
                };
                Node::Splitpoint(graph.add_splitpoint(Splitpoint::new(
                    json_node.id.clone(),
                    splitpoint.time,
                    successor,
                    splitpoint.cut,
                )))
            }
        };

        graph.add_node(node, json_node.attributes());
        nodes.insert(json_node.id.clone(), node);
    }

    let resolve = |token: &String| {
        nodes
            .get(token)
            .copied()
            .ok_or_else(|| StorageError::UnknownReference(token.clone()))
    };

    for (from, successors) in &json.successors {
        let from = resolve(from)?;
        for (to, edge) in successors {
            let refuel_point = match &edge.refuelpoint {
                None => None,
                Some(token) => match dictionary.resolve(token) {
                    Some(Entity::RefuelPoint(refuel_point)) => Some(refuel_point),
                    _ => return Err(StorageError::UnknownReference(token.clone())),
                },
            };

            graph.add_edge(
                from,
                resolve(to)?,
                EdgeAttributes {
                    refuel_point,
                    fe: edge.fe,
                    fg: edge.fg,
                    fh: edge.fh,
                    fd: edge.fd,
                    fr: edge.fr,
                    ce: edge.ce,
                    cd: edge.cd,
                },
            );
        }
    }

    Ok(graph)
}

#[instrument(skip_all, level = "debug")]
pub fn load_taskgraph(path: &Path, instance: &Instance) -> Result<TaskGraph, StorageError> {
    let graph = taskgraph_from_json(load_json(path)?, instance)?;
    info!(
        "Loaded task graph with {} nodes, {} edges and {} splitpoints",
        graph.num_nodes(),
        graph.num_edges(),
        graph.splitpoints().len()
    );

    Ok(graph)
}
