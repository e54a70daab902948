use fxhash::FxHashSet;
use thiserror::Error;

use crate::problem::{
    entity::{Entity, Vertex},
    instance::Instance,
    trip::TripIdx,
    vehicle::VehicleIdx,
};

use super::{
    duty::{Duty, DutyStop, Hop},
    solution::{FuelState, Solution},
};

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} has no duty")]
    MissingDuty(String),

    #[error("Duty of unknown vehicle {0}")]
    UnknownVehicle(VehicleIdx),

    #[error("{0} is served more than once")]
    TripServedTwice(String),

    #[error("Route {route} is not satisfied, {trip} is not served")]
    RouteNotCovered { route: usize, trip: String },

    #[error("Customer {customer} is not satisfied")]
    CustomerNotServed { customer: usize },

    #[error("Customer {customer} is served by {routes} routes")]
    CustomerServedTwice { customer: usize, routes: usize },

    #[error("Refuel points {first} and {second} in a row in duty of {vehicle}")]
    ConsecutiveRefuelPoints {
        vehicle: String,
        first: String,
        second: String,
    },

    #[error("Refuel point {refuel_point} at the end of duty of {vehicle}")]
    TrailingRefuelPoint {
        vehicle: String,
        refuel_point: String,
    },

    #[error("Not enough time for driving from {from} to {to}, missing {deficit}s")]
    InsufficientTime {
        from: String,
        to: String,
        deficit: f64,
    },

    #[error("Refuel point {refuel_point} between {from} and {to} cannot be reached, missing {deficit} fuel")]
    RefuelPointUnreachable {
        from: String,
        refuel_point: String,
        to: String,
        deficit: f64,
    },

    #[error("Fuel for driving to and serving {trip} is not sufficient, missing {deficit}")]
    InsufficientFuel { trip: String, deficit: f64 },
}

/// Seconds left after driving the hop, negative when the trip is missed.
pub fn hop_available_time(instance: &Instance, hop: &Hop) -> f64 {
    let travel = match hop.refuel_point {
        Some(refuel_point) => {
            instance.time(hop.from, refuel_point) + instance.time(refuel_point, hop.to)
        }
        None => instance.time(hop.from, hop.to),
    };

    instance.slack(hop.from, hop.to) - travel
}

/// Replays the duty of `vehicle` and returns the fuel left after every trip.
pub fn simulate_duty(
    instance: &Instance,
    vehicle: VehicleIdx,
    duty: &Duty,
) -> Result<Vec<(TripIdx, f64)>, ValidationError> {
    let refuel_per_second = instance.coefficients().refuel_per_second;
    let mut fuel = instance.vehicle(vehicle).fuel();
    let mut states = Vec::with_capacity(duty.len());

    for hop in duty.hops(vehicle) {
        let available = hop_available_time(instance, &hop);
        if available < 0.0 {
            return Err(ValidationError::InsufficientTime {
                from: instance.identity(hop.from),
                to: instance.identity(hop.to),
                deficit: -available,
            });
        }

        match hop.refuel_point {
            Some(refuel_point) => {
                fuel -= instance.fuel(hop.from, refuel_point);
                if fuel < 0.0 {
                    return Err(ValidationError::RefuelPointUnreachable {
                        from: instance.identity(hop.from),
                        refuel_point: instance.identity(refuel_point),
                        to: instance.identity(hop.to),
                        deficit: -fuel,
                    });
                }
                fuel = (fuel + refuel_per_second * available).min(1.0)
                    - instance.fuel(refuel_point, hop.to)
                    - instance.trip_fuel(hop.to);
            }
            None => {
                fuel -= instance.fuel(hop.from, hop.to) + instance.trip_fuel(hop.to);
            }
        }

        if fuel < 0.0 {
            return Err(ValidationError::InsufficientFuel {
                trip: instance.identity(hop.to),
                deficit: -fuel,
            });
        }

        states.push((hop.to, fuel));
    }

    Ok(states)
}

impl Solution {
    /// Vehicles, route coverage and customer selection.
    pub fn validate_structure(&self, instance: &Instance) -> Result<(), ValidationError> {
        for vehicle in self.vehicles() {
            if vehicle.get() >= instance.vehicles().len() {
                return Err(ValidationError::UnknownVehicle(vehicle));
            }
        }
        for vehicle in instance.vehicle_indices() {
            if self.duty(vehicle).is_none() {
                return Err(ValidationError::MissingDuty(instance.identity(vehicle)));
            }
        }

        let mut served = FxHashSet::default();
        for (_, duty) in self.duties() {
            for trip in duty.trips() {
                if !served.insert(trip) {
                    return Err(ValidationError::TripServedTwice(instance.identity(trip)));
                }
            }
        }

        for route in self.covered_routes(instance) {
            let route = instance.route(route);
            if let Some(trip) = route.trips().iter().find(|trip| !served.contains(*trip)) {
                return Err(ValidationError::RouteNotCovered {
                    route: route.id(),
                    trip: instance.identity(*trip),
                });
            }
        }

        self.selected_routes(instance)?;

        Ok(())
    }

    /// No refuel points in a row and none at the end.
    pub fn validate_local(
        &self,
        instance: &Instance,
        vehicle: VehicleIdx,
    ) -> Result<(), ValidationError> {
        let Some(duty) = self.duty(vehicle) else {
            return Err(ValidationError::MissingDuty(instance.identity(vehicle)));
        };

        for pair in duty.stops().windows(2) {
            if let [DutyStop::RefuelPoint(first), DutyStop::RefuelPoint(second)] = pair {
                return Err(ValidationError::ConsecutiveRefuelPoints {
                    vehicle: instance.identity(vehicle),
                    first: instance.identity(*first),
                    second: instance.identity(*second),
                });
            }
        }

        if let Some(DutyStop::RefuelPoint(refuel_point)) = duty.stops().last() {
            return Err(ValidationError::TrailingRefuelPoint {
                vehicle: instance.identity(vehicle),
                refuel_point: instance.identity(*refuel_point),
            });
        }

        Ok(())
    }

    /// Local checks and the fuel and time replay of one duty.
    pub fn validate_duty(
        &self,
        instance: &Instance,
        vehicle: VehicleIdx,
    ) -> Result<(), ValidationError> {
        self.validate_local(instance, vehicle)?;
        if let Some(duty) = self.duty(vehicle) {
            simulate_duty(instance, vehicle, duty)?;
        }

        Ok(())
    }

    pub fn validate(&self, instance: &Instance) -> Result<(), ValidationError> {
        self.validate_structure(instance)?;
        for vehicle in instance.vehicle_indices() {
            self.validate_duty(instance, vehicle)?;
        }

        Ok(())
    }

    pub fn is_valid(&self, instance: &Instance) -> bool {
        self.validate(instance).is_ok()
    }

    /// Fuel states from replaying every duty, used when the solver reported none.
    pub fn simulated_fuel_states(
        &self,
        instance: &Instance,
    ) -> Result<Vec<(Vertex, FuelState)>, ValidationError> {
        let mut states = Vec::new();

        for (vehicle, duty) in self.duties() {
            states.push((
                Vertex::Vehicle(vehicle),
                FuelState::exact(instance.vehicle(vehicle).fuel()),
            ));
            for (trip, fuel) in simulate_duty(instance, vehicle, duty)? {
                states.push((Vertex::Trip(trip), FuelState::exact(fuel)));
            }
        }

        Ok(states)
    }
}

/// Token of a stop as used in validation messages.
pub fn stop_identity(instance: &Instance, stop: DutyStop) -> String {
    instance.identity(Entity::from(stop))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        problem::{refuel_point::RefuelPointIdx, trip::TripIdx},
        test_utils,
    };

    fn single_duty(stops: Vec<DutyStop>) -> Solution {
        Solution::new(BTreeMap::from([(VehicleIdx::new(0), Duty::new(stops))]))
    }

    #[test]
    fn test_scenario_valid_variant() {
        let instance = test_utils::create_scenario_instance(30_000.0);
        let solution = single_duty(vec![DutyStop::Trip(TripIdx::new(0))]);

        assert_eq!(solution.validate(&instance), Ok(()));

        let states = simulate_duty(
            &instance,
            VehicleIdx::new(0),
            solution.duty(VehicleIdx::new(0)).unwrap(),
        )
        .unwrap();
        assert!((states[0].1 - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_scenario_invalid_variant_names_trip() {
        let instance = test_utils::create_scenario_instance(55_000.0);
        let solution = single_duty(vec![DutyStop::Trip(TripIdx::new(0))]);

        match solution.validate(&instance) {
            Err(ValidationError::InsufficientFuel { trip, deficit }) => {
                assert_eq!(trip, instance.identity(TripIdx::new(0)));
                assert!((deficit - 0.1).abs() < 1e-9);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_uncovered_customer() {
        let instance = test_utils::create_chain_instance(2, 0);
        let solution = single_duty(vec![DutyStop::Trip(TripIdx::new(0))]);

        assert!(matches!(
            solution.validate(&instance),
            Err(ValidationError::CustomerNotServed { .. })
        ));
    }

    #[test]
    fn test_missing_vehicle() {
        let instance = test_utils::create_chain_instance(1, 0);
        let solution = Solution::new(BTreeMap::new());

        assert!(matches!(
            solution.validate(&instance),
            Err(ValidationError::MissingDuty(_))
        ));
    }

    #[test]
    fn test_refuel_point_structure() {
        let instance = test_utils::create_chain_instance(2, 2);

        let consecutive = single_duty(vec![
            DutyStop::Trip(TripIdx::new(0)),
            DutyStop::RefuelPoint(RefuelPointIdx::new(0)),
            DutyStop::RefuelPoint(RefuelPointIdx::new(1)),
            DutyStop::Trip(TripIdx::new(1)),
        ]);
        assert!(matches!(
            consecutive.validate(&instance),
            Err(ValidationError::ConsecutiveRefuelPoints { .. })
        ));

        let trailing = single_duty(vec![
            DutyStop::Trip(TripIdx::new(0)),
            DutyStop::Trip(TripIdx::new(1)),
            DutyStop::RefuelPoint(RefuelPointIdx::new(0)),
        ]);
        assert!(matches!(
            trailing.validate(&instance),
            Err(ValidationError::TrailingRefuelPoint { .. })
        ));
    }

    #[test]
    fn test_time_conflict() {
        let instance = test_utils::create_chain_instance(2, 0);
        let solution = single_duty(vec![
            DutyStop::Trip(TripIdx::new(1)),
            DutyStop::Trip(TripIdx::new(0)),
        ]);

        assert!(matches!(
            solution.validate(&instance),
            Err(ValidationError::InsufficientTime { .. })
        ));
    }
}
