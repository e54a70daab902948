use std::collections::{BTreeMap, BTreeSet};

use fxhash::FxHashMap;

use crate::problem::{
    customer::{CustomerIdx, RouteIdx},
    entity::Vertex,
    instance::Instance,
    trip::TripIdx,
    vehicle::VehicleIdx,
};

use super::{duty::Duty, validator::ValidationError};

/// Fuel bounds reported by the solver after serving a stop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FuelState {
    pub min: f64,
    pub max: f64,
}

impl FuelState {
    pub fn exact(fuel: f64) -> Self {
        Self {
            min: fuel,
            max: fuel,
        }
    }
}

/// Duties of every vehicle plus optional fuel states of vehicles and trips.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Solution {
    duties: BTreeMap<VehicleIdx, Duty>,
    fuel_states: FxHashMap<Vertex, FuelState>,
}

impl Solution {
    pub fn new(duties: BTreeMap<VehicleIdx, Duty>) -> Self {
        Self {
            duties,
            fuel_states: FxHashMap::default(),
        }
    }

    /// Every vehicle of the instance idle.
    pub fn empty(instance: &Instance) -> Self {
        Self::new(
            instance
                .vehicle_indices()
                .map(|vehicle| (vehicle, Duty::default()))
                .collect(),
        )
    }

    pub fn duties(&self) -> impl Iterator<Item = (VehicleIdx, &Duty)> {
        self.duties.iter().map(|(vehicle, duty)| (*vehicle, duty))
    }

    pub fn duty(&self, vehicle: VehicleIdx) -> Option<&Duty> {
        self.duties.get(&vehicle)
    }

    pub fn set_duty(&mut self, vehicle: VehicleIdx, duty: Duty) {
        self.duties.insert(vehicle, duty);
    }

    pub fn vehicles(&self) -> impl Iterator<Item = VehicleIdx> + '_ {
        self.duties.keys().copied()
    }

    pub fn fuel_state(&self, vertex: Vertex) -> Option<FuelState> {
        self.fuel_states.get(&vertex).copied()
    }

    pub fn set_fuel_state(&mut self, vertex: Vertex, state: FuelState) {
        self.fuel_states.insert(vertex, state);
    }

    pub fn has_fuel_states(&self) -> bool {
        !self.fuel_states.is_empty()
    }

    pub fn clear_fuel_states(&mut self) {
        self.fuel_states.clear();
    }

    /// Vehicle serving each covered trip.
    pub fn owners(&self) -> FxHashMap<TripIdx, VehicleIdx> {
        self.duties()
            .flat_map(|(vehicle, duty)| duty.trips().map(move |trip| (trip, vehicle)))
            .collect()
    }

    pub fn owner(&self, trip: TripIdx) -> Option<VehicleIdx> {
        self.duties()
            .find(|(_, duty)| duty.position(trip).is_some())
            .map(|(vehicle, _)| vehicle)
    }

    pub fn covered_trips(&self) -> BTreeSet<TripIdx> {
        self.duties.values().flat_map(Duty::trips).collect()
    }

    pub fn covered_routes(&self, instance: &Instance) -> BTreeSet<RouteIdx> {
        self.duties
            .values()
            .flat_map(Duty::trips)
            .map(|trip| instance.route_of(trip))
            .collect()
    }

    /// The single covered route of every customer.
    pub fn selected_routes(
        &self,
        instance: &Instance,
    ) -> Result<BTreeMap<CustomerIdx, RouteIdx>, ValidationError> {
        let covered = self.covered_routes(instance);
        let mut selected = BTreeMap::new();

        for customer in instance.customer_indices() {
            let mut routes = instance
                .customer(customer)
                .routes()
                .iter()
                .filter(|route| covered.contains(*route));

            match (routes.next(), routes.count()) {
                (Some(route), 0) => {
                    selected.insert(customer, *route);
                }
                (None, _) => {
                    return Err(ValidationError::CustomerNotServed {
                        customer: instance.customer(customer).id(),
                    });
                }
                (Some(_), more) => {
                    return Err(ValidationError::CustomerServedTwice {
                        customer: instance.customer(customer).id(),
                        routes: more + 1,
                    });
                }
            }
        }

        Ok(selected)
    }
}
