use std::collections::BTreeMap;

use jiff::civil::DateTime;
use serde::Serialize;

use crate::{
    problem::{
        entity::{Located, Vertex},
        instance::Instance,
        point::Point,
        vehicle::VehicleIdx,
    },
    utils::time::duration_from_seconds,
};

use super::{solution::Solution, validator::hop_available_time};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleState {
    Waiting,
    Recharging,
    Deadhead,
    Rental,
}

/// State of a vehicle at the end of a segment of its duty.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Keyframe {
    #[serde(with = "crate::utils::time::datetime_format")]
    pub time: DateTime,
    pub location: Point,
    pub fuel: f64,
    pub state: VehicleState,
}

impl Keyframe {
    fn new(time: DateTime, location: Point, fuel: f64, state: VehicleState) -> Self {
        Self {
            time,
            location,
            fuel,
            state,
        }
    }
}

fn departure(instance: &Instance, vertex: Vertex) -> Point {
    match vertex {
        Vertex::Vehicle(vehicle) => instance.vehicle(vehicle).departure(),
        Vertex::Trip(trip) => instance.trip(trip).departure(),
    }
}

impl Solution {
    /// Timeline of one vehicle. Fuel is not checked, negative values show up as they are.
    pub fn vehicle_keyframes(&self, instance: &Instance, vehicle: VehicleIdx) -> Vec<Keyframe> {
        let refuel_per_second = instance.coefficients().refuel_per_second;
        let start = Vertex::Vehicle(vehicle);
        let mut fuel = instance.vehicle(vehicle).fuel();
        let mut keyframes = vec![Keyframe::new(
            instance.finish_time(start),
            departure(instance, start),
            fuel,
            VehicleState::Waiting,
        )];

        let Some(duty) = self.duty(vehicle) else {
            return keyframes;
        };

        for hop in duty.hops(vehicle) {
            let from_finish = instance.finish_time(hop.from);
            let trip = instance.trip(hop.to);

            match hop.refuel_point {
                Some(refuel_point) => {
                    let location = instance.refuel_point(refuel_point).location();
                    let arrival = from_finish
                        .saturating_add(instance.travel_duration(hop.from, refuel_point));
                    fuel -= instance.fuel(hop.from, refuel_point);
                    keyframes.push(Keyframe::new(
                        arrival,
                        location,
                        fuel,
                        VehicleState::Deadhead,
                    ));

                    let recharge = hop_available_time(instance, &hop)
                        .min((1.0 - fuel) / refuel_per_second)
                        .max(0.0);
                    let recharged = arrival.saturating_add(duration_from_seconds(recharge));
                    fuel = (fuel + refuel_per_second * recharge).min(1.0);
                    keyframes.push(Keyframe::new(
                        recharged,
                        location,
                        fuel,
                        VehicleState::Recharging,
                    ));

                    fuel -= instance.fuel(refuel_point, hop.to);
                    keyframes.push(Keyframe::new(
                        recharged.saturating_add(instance.travel_duration(refuel_point, hop.to)),
                        trip.start_loc(),
                        fuel,
                        VehicleState::Deadhead,
                    ));
                }
                None => {
                    fuel -= instance.fuel(hop.from, hop.to);
                    keyframes.push(Keyframe::new(
                        from_finish.saturating_add(instance.travel_duration(hop.from, hop.to)),
                        trip.start_loc(),
                        fuel,
                        VehicleState::Deadhead,
                    ));
                }
            }

            keyframes.push(Keyframe::new(
                instance.start_time(Vertex::Trip(hop.to)),
                trip.start_loc(),
                fuel,
                VehicleState::Waiting,
            ));
            fuel -= instance.trip_fuel(hop.to);
            keyframes.push(Keyframe::new(
                instance.finish_time(Vertex::Trip(hop.to)),
                trip.finish_loc(),
                fuel,
                VehicleState::Rental,
            ));
        }

        keyframes
    }

    /// Timeline of every vehicle, keyed by its identity.
    pub fn keyframes(&self, instance: &Instance) -> BTreeMap<String, Vec<Keyframe>> {
        self.vehicles()
            .map(|vehicle| {
                (
                    instance.identity(vehicle),
                    self.vehicle_keyframes(instance, vehicle),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        problem::{refuel_point::RefuelPointIdx, trip::TripIdx},
        solution::duty::{Duty, DutyStop},
        test_utils,
    };

    #[test]
    fn test_direct_keyframes() {
        let instance = test_utils::create_scenario_instance(30_000.0);
        let solution = Solution::new(BTreeMap::from([(
            VehicleIdx::new(0),
            Duty::new(vec![DutyStop::Trip(TripIdx::new(0))]),
        )]));

        let keyframes = solution.vehicle_keyframes(&instance, VehicleIdx::new(0));
        let states = keyframes.iter().map(|k| k.state).collect::<Vec<_>>();

        assert_eq!(
            states,
            vec![
                VehicleState::Waiting,
                VehicleState::Deadhead,
                VehicleState::Waiting,
                VehicleState::Rental
            ]
        );
        assert!((keyframes[1].fuel - 0.45).abs() < 1e-9);
        assert!((keyframes[3].fuel - 0.15).abs() < 1e-9);
        assert!(keyframes.windows(2).all(|pair| pair[0].time <= pair[1].time));
    }

    #[test]
    fn test_refuel_keyframes() {
        let instance = test_utils::create_chain_instance(2, 1);
        let solution = Solution::new(BTreeMap::from([(
            VehicleIdx::new(0),
            Duty::new(vec![
                DutyStop::Trip(TripIdx::new(0)),
                DutyStop::RefuelPoint(RefuelPointIdx::new(0)),
                DutyStop::Trip(TripIdx::new(1)),
            ]),
        )]));

        let keyframes = solution.vehicle_keyframes(&instance, VehicleIdx::new(0));

        assert_eq!(keyframes.len(), 1 + 3 + 5);
        assert_eq!(keyframes[5].state, VehicleState::Recharging);
        assert!(keyframes[5].fuel >= keyframes[4].fuel);
        assert_eq!(
            keyframes[5].location,
            instance.refuel_point(RefuelPointIdx::new(0)).location()
        );
    }
}
