use jiff::civil::DateTime;

use crate::problem::{
    entity::Vertex,
    instance::Instance,
    splitpoint::SplitpointIdx,
    trip::TripIdx,
    vehicle::VehicleIdx,
};

pub const DEPOT_START: &str = "DEPOTSTART";
pub const DEPOT_END: &str = "DEPOTEND";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Node {
    DepotStart,
    DepotEnd,
    Vehicle(VehicleIdx),
    Trip(TripIdx),
    Splitpoint(SplitpointIdx),
}

impl Node {
    pub fn vertex(&self) -> Option<Vertex> {
        match self {
            Node::Vehicle(vehicle) => Some(Vertex::Vehicle(*vehicle)),
            Node::Trip(trip) => Some(Vertex::Trip(*trip)),
            _ => None,
        }
    }

    pub fn trip(&self) -> Option<TripIdx> {
        match self {
            Node::Trip(trip) => Some(*trip),
            _ => None,
        }
    }

    pub fn is_depot(&self) -> bool {
        matches!(self, Node::DepotStart | Node::DepotEnd)
    }

    /// Start time of vehicles and trips. Splitpoint times live in the graph.
    pub fn start_time(&self, instance: &Instance) -> Option<DateTime> {
        self.vertex().map(|vertex| instance.start_time(vertex))
    }
}

impl From<Vertex> for Node {
    fn from(vertex: Vertex) -> Self {
        match vertex {
            Vertex::Vehicle(vehicle) => Node::Vehicle(vehicle),
            Vertex::Trip(trip) => Node::Trip(trip),
        }
    }
}

impl From<VehicleIdx> for Node {
    fn from(vehicle: VehicleIdx) -> Self {
        Node::Vehicle(vehicle)
    }
}

impl From<TripIdx> for Node {
    fn from(trip: TripIdx) -> Self {
        Node::Trip(trip)
    }
}

/// Values attached to a node. Vehicles carry `f0`, trips `ft` and `ct`,
/// bounded trips `fmin` and `fmax`, splitpoints `ft = 0`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeAttributes {
    pub f0: Option<f64>,
    pub ft: Option<f64>,
    pub ct: Option<f64>,
    pub fmin: Option<f64>,
    pub fmax: Option<f64>,
}

impl NodeAttributes {
    pub fn vehicle(fuel: f64) -> Self {
        Self {
            f0: Some(fuel),
            ..Default::default()
        }
    }

    pub fn trip(fuel: f64, cost: f64) -> Self {
        Self {
            ft: Some(fuel),
            ct: Some(cost),
            ..Default::default()
        }
    }

    pub fn splitpoint() -> Self {
        Self {
            ft: Some(0.0),
            ..Default::default()
        }
    }

    pub fn with_fuel_bounds(mut self, fmin: f64, fmax: f64) -> Self {
        self.fmin = Some(fmin);
        self.fmax = Some(fmax);
        self
    }

    pub fn has_fuel_bounds(&self) -> bool {
        self.fmin.is_some() && self.fmax.is_some()
    }
}
