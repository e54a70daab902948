use std::collections::{BTreeMap, BTreeSet, VecDeque};

use jiff::civil::DateTime;
use thiserror::Error;

use crate::problem::{
    entity::{Identified, Scheduled},
    instance::Instance,
    splitpoint::{Splitpoint, SplitpointIdx},
};

use super::{
    edge::EdgeAttributes,
    node::{DEPOT_END, DEPOT_START, Node, NodeAttributes},
};

#[derive(Debug, Error)]
pub enum TaskGraphError {
    #[error("Task graph contains a cycle through {0} nodes")]
    Cycle(usize),
}

/// Arc-flow feasibility DAG between the depots, vehicles, trips and splitpoints.
///
/// Adjacency is kept in ordered maps so iteration, and therefore every export,
/// is deterministic.
#[derive(Clone, Debug)]
pub struct TaskGraph {
    nodes: BTreeMap<Node, NodeAttributes>,
    successors: BTreeMap<Node, BTreeMap<Node, EdgeAttributes>>,
    predecessors: BTreeMap<Node, BTreeSet<Node>>,
    splitpoints: Vec<Splitpoint>,
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskGraph {
    /// Graph holding the two depots.
    pub fn new() -> Self {
        let mut graph = Self {
            nodes: BTreeMap::new(),
            successors: BTreeMap::new(),
            predecessors: BTreeMap::new(),
            splitpoints: Vec::new(),
        };
        graph.add_node(Node::DepotStart, NodeAttributes::default());
        graph.add_node(Node::DepotEnd, NodeAttributes::default());

        graph
    }

    pub fn add_node(&mut self, node: Node, attributes: NodeAttributes) {
        self.nodes.insert(node, attributes);
        self.successors.entry(node).or_default();
        self.predecessors.entry(node).or_default();
    }

    pub fn contains_node(&self, node: Node) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn node_attributes(&self, node: Node) -> Option<&NodeAttributes> {
        self.nodes.get(&node)
    }

    pub fn node_attributes_mut(&mut self, node: Node) -> Option<&mut NodeAttributes> {
        self.nodes.get_mut(&node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (Node, &NodeAttributes)> {
        self.nodes.iter().map(|(node, attributes)| (*node, attributes))
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.successors.values().map(BTreeMap::len).sum()
    }

    /// Adds or replaces the edge. Missing end points are added without attributes.
    pub fn add_edge(&mut self, from: Node, to: Node, attributes: EdgeAttributes) {
        if !self.contains_node(from) {
            self.add_node(from, NodeAttributes::default());
        }
        if !self.contains_node(to) {
            self.add_node(to, NodeAttributes::default());
        }

        self.successors
            .entry(from)
            .or_default()
            .insert(to, attributes);
        self.predecessors.entry(to).or_default().insert(from);
    }

    pub fn remove_edge(&mut self, from: Node, to: Node) -> Option<EdgeAttributes> {
        let attributes = self.successors.get_mut(&from)?.remove(&to)?;
        if let Some(predecessors) = self.predecessors.get_mut(&to) {
            predecessors.remove(&from);
        }

        Some(attributes)
    }

    pub fn edge(&self, from: Node, to: Node) -> Option<&EdgeAttributes> {
        self.successors.get(&from)?.get(&to)
    }

    pub fn has_edge(&self, from: Node, to: Node) -> bool {
        self.edge(from, to).is_some()
    }

    pub fn successors(&self, node: Node) -> impl Iterator<Item = (Node, &EdgeAttributes)> {
        self.successors
            .get(&node)
            .into_iter()
            .flat_map(|successors| successors.iter().map(|(to, attributes)| (*to, attributes)))
    }

    pub fn predecessors(&self, node: Node) -> impl Iterator<Item = Node> + '_ {
        self.predecessors
            .get(&node)
            .into_iter()
            .flat_map(|predecessors| predecessors.iter().copied())
    }

    pub fn in_degree(&self, node: Node) -> usize {
        self.predecessors.get(&node).map_or(0, BTreeSet::len)
    }

    pub fn out_degree(&self, node: Node) -> usize {
        self.successors.get(&node).map_or(0, BTreeMap::len)
    }

    /// Every edge as `(from, to, attributes)`, ordered by `from` then `to`.
    pub fn edges(&self) -> impl Iterator<Item = (Node, Node, &EdgeAttributes)> {
        self.successors.iter().flat_map(|(from, successors)| {
            successors
                .iter()
                .map(move |(to, attributes)| (*from, *to, attributes))
        })
    }

    pub fn add_splitpoint(&mut self, splitpoint: Splitpoint) -> SplitpointIdx {
        let idx = SplitpointIdx::new(self.splitpoints.len());
        self.splitpoints.push(splitpoint);
        self.add_node(Node::Splitpoint(idx), NodeAttributes::splitpoint());

        idx
    }

    pub fn splitpoint(&self, splitpoint: SplitpointIdx) -> &Splitpoint {
        &self.splitpoints[splitpoint]
    }

    pub fn splitpoints(&self) -> &[Splitpoint] {
        &self.splitpoints
    }

    pub fn splitpoint_indices(&self) -> impl DoubleEndedIterator<Item = SplitpointIdx> + use<> {
        SplitpointIdx::range(self.splitpoints.len())
    }

    /// Token naming `node` in exported files.
    pub fn identity(&self, instance: &Instance, node: Node) -> String {
        match node {
            Node::DepotStart => String::from(DEPOT_START),
            Node::DepotEnd => String::from(DEPOT_END),
            Node::Vehicle(vehicle) => instance.identity(vehicle),
            Node::Trip(trip) => instance.identity(trip),
            Node::Splitpoint(splitpoint) => self.splitpoints[splitpoint].identity(),
        }
    }

    /// Start time of every node but the depots.
    pub fn start_time(&self, instance: &Instance, node: Node) -> Option<DateTime> {
        match node {
            Node::Splitpoint(splitpoint) => Some(self.splitpoints[splitpoint].start_time()),
            _ => node.start_time(instance),
        }
    }

    /// Kahn's algorithm, smallest ready node first.
    pub fn topological_order(&self) -> Result<Vec<Node>, TaskGraphError> {
        let mut in_degrees = self
            .nodes
            .keys()
            .map(|node| (*node, self.in_degree(*node)))
            .collect::<BTreeMap<_, _>>();

        let mut queue = in_degrees
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(node, _)| *node)
            .collect::<VecDeque<_>>();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for (successor, _) in self.successors(node) {
                if let Some(degree) = in_degrees.get_mut(&successor) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(successor);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(TaskGraphError::Cycle(self.nodes.len() - order.len()));
        }

        Ok(order)
    }

    pub fn is_acyclic(&self) -> bool {
        self.topological_order().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{trip::TripIdx, vehicle::VehicleIdx};

    #[test]
    fn test_add_and_remove_edges() {
        let mut graph = TaskGraph::new();
        let vehicle = Node::Vehicle(VehicleIdx::new(0));
        let trip = Node::Trip(TripIdx::new(0));

        graph.add_node(vehicle, NodeAttributes::vehicle(1.0));
        graph.add_edge(Node::DepotStart, vehicle, EdgeAttributes::ZERO);
        graph.add_edge(vehicle, trip, EdgeAttributes::direct(0.5, 1.0));

        assert_eq!(graph.num_nodes(), 4);
        assert_eq!(graph.num_edges(), 2);
        assert_eq!(graph.predecessors(trip).collect::<Vec<_>>(), vec![vehicle]);

        let removed = graph.remove_edge(vehicle, trip).unwrap();
        assert_eq!(removed.fe, 0.5);
        assert_eq!(graph.in_degree(trip), 0);
        assert!(graph.remove_edge(vehicle, trip).is_none());
    }

    #[test]
    fn test_topological_order_detects_cycles() {
        let mut graph = TaskGraph::new();
        let a = Node::Trip(TripIdx::new(0));
        let b = Node::Trip(TripIdx::new(1));

        graph.add_edge(a, b, EdgeAttributes::ZERO);
        let order = graph.topological_order().unwrap();
        let position = |node| order.iter().position(|n| *n == node).unwrap();
        assert!(position(a) < position(b));

        graph.add_edge(b, a, EdgeAttributes::ZERO);
        assert!(matches!(
            graph.topological_order(),
            Err(TaskGraphError::Cycle(2))
        ));
    }
}
