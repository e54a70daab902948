use jiff::civil::DateTime;
use serde::{Deserialize, Serialize};

use super::{point::Point, refuel_point::RefuelPointIdx, trip::TripIdx, vehicle::VehicleIdx};

/// Something a vehicle drives from or to.
pub trait Located {
    /// Where a vehicle is after visiting it.
    fn departure(&self) -> Point;
    /// Where a vehicle has to be to visit it.
    fn arrival(&self) -> Point;
}

pub trait Scheduled {
    fn start_time(&self) -> DateTime;
    fn finish_time(&self) -> DateTime;
}

/// Stable token naming an entity in exported files.
pub trait Identified {
    fn identity(&self) -> String;
}

/// A vertex of the task graph that can originate a deadhead: a vehicle or a trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Vertex {
    Vehicle(VehicleIdx),
    Trip(TripIdx),
}

impl Vertex {
    pub fn trip(&self) -> Option<TripIdx> {
        match self {
            Vertex::Trip(trip) => Some(*trip),
            Vertex::Vehicle(_) => None,
        }
    }

    pub fn vehicle(&self) -> Option<VehicleIdx> {
        match self {
            Vertex::Vehicle(vehicle) => Some(*vehicle),
            Vertex::Trip(_) => None,
        }
    }
}

impl From<VehicleIdx> for Vertex {
    fn from(vehicle: VehicleIdx) -> Self {
        Vertex::Vehicle(vehicle)
    }
}

impl From<TripIdx> for Vertex {
    fn from(trip: TripIdx) -> Self {
        Vertex::Trip(trip)
    }
}

/// Any located entity of an instance, indexing the extended vertices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Entity {
    Vehicle(VehicleIdx),
    Trip(TripIdx),
    RefuelPoint(RefuelPointIdx),
}

impl From<Vertex> for Entity {
    fn from(vertex: Vertex) -> Self {
        match vertex {
            Vertex::Vehicle(vehicle) => Entity::Vehicle(vehicle),
            Vertex::Trip(trip) => Entity::Trip(trip),
        }
    }
}

impl From<VehicleIdx> for Entity {
    fn from(vehicle: VehicleIdx) -> Self {
        Entity::Vehicle(vehicle)
    }
}

impl From<TripIdx> for Entity {
    fn from(trip: TripIdx) -> Self {
        Entity::Trip(trip)
    }
}

impl From<RefuelPointIdx> for Entity {
    fn from(refuel_point: RefuelPointIdx) -> Self {
        Entity::RefuelPoint(refuel_point)
    }
}

impl TryFrom<Entity> for Vertex {
    type Error = Entity;

    fn try_from(entity: Entity) -> Result<Self, Self::Error> {
        match entity {
            Entity::Vehicle(vehicle) => Ok(Vertex::Vehicle(vehicle)),
            Entity::Trip(trip) => Ok(Vertex::Trip(trip)),
            Entity::RefuelPoint(_) => Err(entity),
        }
    }
}
