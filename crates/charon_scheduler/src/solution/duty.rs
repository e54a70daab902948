use crate::problem::{
    entity::{Entity, Vertex},
    refuel_point::RefuelPointIdx,
    trip::TripIdx,
    vehicle::VehicleIdx,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DutyStop {
    Trip(TripIdx),
    RefuelPoint(RefuelPointIdx),
}

impl DutyStop {
    pub fn trip(&self) -> Option<TripIdx> {
        match self {
            DutyStop::Trip(trip) => Some(*trip),
            DutyStop::RefuelPoint(_) => None,
        }
    }

    pub fn is_refuel_point(&self) -> bool {
        matches!(self, DutyStop::RefuelPoint(_))
    }
}

impl From<DutyStop> for Entity {
    fn from(stop: DutyStop) -> Self {
        match stop {
            DutyStop::Trip(trip) => Entity::Trip(trip),
            DutyStop::RefuelPoint(refuel_point) => Entity::RefuelPoint(refuel_point),
        }
    }
}

impl TryFrom<Entity> for DutyStop {
    type Error = Entity;

    fn try_from(entity: Entity) -> Result<Self, Self::Error> {
        match entity {
            Entity::Trip(trip) => Ok(DutyStop::Trip(trip)),
            Entity::RefuelPoint(refuel_point) => Ok(DutyStop::RefuelPoint(refuel_point)),
            Entity::Vehicle(_) => Err(entity),
        }
    }
}

/// One leg of a duty: from the previous trip (or the vehicle) to the next trip,
/// possibly through a refuel point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hop {
    pub from: Vertex,
    pub refuel_point: Option<RefuelPointIdx>,
    pub to: TripIdx,
}

/// Ordered stops of one vehicle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Duty {
    stops: Vec<DutyStop>,
}

impl Duty {
    pub fn new(stops: Vec<DutyStop>) -> Self {
        Self { stops }
    }

    pub fn stops(&self) -> &[DutyStop] {
        &self.stops
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn trips(&self) -> impl Iterator<Item = TripIdx> + '_ {
        self.stops.iter().filter_map(DutyStop::trip)
    }

    pub fn position(&self, trip: TripIdx) -> Option<usize> {
        self.stops.iter().position(|stop| *stop == DutyStop::Trip(trip))
    }

    pub fn last_trip(&self) -> Option<TripIdx> {
        self.stops.iter().rev().find_map(DutyStop::trip)
    }

    /// Stops up to and including `index`.
    pub fn prefix(&self, index: usize) -> &[DutyStop] {
        &self.stops[..(index + 1).min(self.stops.len())]
    }

    /// Stops after `index`.
    pub fn suffix(&self, index: usize) -> &[DutyStop] {
        &self.stops[(index + 1).min(self.stops.len())..]
    }

    pub fn extend_from_slice(&mut self, stops: &[DutyStop]) {
        self.stops.extend_from_slice(stops);
    }

    /// Hops of the duty driven by `vehicle`. A refuel point applies to the next trip;
    /// when several precede a trip the last one is used and trailing ones are ignored.
    pub fn hops(&self, vehicle: VehicleIdx) -> Vec<Hop> {
        let mut hops = Vec::with_capacity(self.stops.len());
        let mut from = Vertex::Vehicle(vehicle);
        let mut refuel_point = None;

        for stop in &self.stops {
            match *stop {
                DutyStop::RefuelPoint(point) => refuel_point = Some(point),
                DutyStop::Trip(to) => {
                    hops.push(Hop {
                        from,
                        refuel_point: refuel_point.take(),
                        to,
                    });
                    from = Vertex::Trip(to);
                }
            }
        }

        hops
    }
}

impl FromIterator<DutyStop> for Duty {
    fn from_iter<I: IntoIterator<Item = DutyStop>>(iter: I) -> Self {
        Self {
            stops: iter.into_iter().collect(),
        }
    }
}
