use serde::Serialize;

use crate::problem::{entity::Entity, instance::Instance, vehicle::VehicleIdx};

use super::{duty::DutyStop, solution::Solution};

/// Cost and usage breakdown of a solution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Evaluation {
    pub cost: f64,
    /// Meters driven, deadheads and trips
    pub distance: f64,
    /// Seconds driven, deadheads and trips
    pub time: f64,
    pub vehicles_used: usize,
    pub customer_distance: f64,
    pub deadhead_distance: f64,
    /// Fixed cost of the selected routes
    pub route_cost: f64,
}

impl Evaluation {
    fn add_duty(&mut self, instance: &Instance, vehicle: VehicleIdx, stops: &[DutyStop]) {
        if !stops.is_empty() {
            self.vehicles_used += 1;
        }

        let mut from = Entity::Vehicle(vehicle);
        for &stop in stops {
            let to = Entity::from(stop);
            let deadhead = instance.distance(from, to);

            self.cost += instance.deadhead_cost(from, to);
            self.distance += deadhead;
            self.deadhead_distance += deadhead;
            self.time += instance.time(from, to);

            if let DutyStop::Trip(trip) = stop {
                let distance = instance.trip(trip).distance();
                self.cost += instance.trip_cost(trip);
                self.distance += distance;
                self.customer_distance += distance;
                self.time += instance.trip(trip).duration().as_secs_f64();
            }

            from = to;
        }
    }
}

impl Solution {
    /// Deadhead and trip costs of every duty plus the fixed cost of the covered routes.
    pub fn evaluate(&self, instance: &Instance) -> f64 {
        self.evaluate_detailed(instance).cost
    }

    pub fn evaluate_detailed(&self, instance: &Instance) -> Evaluation {
        let mut evaluation = Evaluation::default();

        for (vehicle, duty) in self.duties() {
            evaluation.add_duty(instance, vehicle, duty.stops());
        }

        evaluation.route_cost = self
            .covered_routes(instance)
            .into_iter()
            .map(|route| instance.route_cost(route))
            .sum();
        evaluation.cost += evaluation.route_cost;

        evaluation
    }

    /// Costs of the duty of `vehicle` alone, without route costs.
    pub fn evaluate_duty(&self, instance: &Instance, vehicle: VehicleIdx) -> Evaluation {
        let mut evaluation = Evaluation::default();
        if let Some(duty) = self.duty(vehicle) {
            evaluation.add_duty(instance, vehicle, duty.stops());
        }

        evaluation
    }
}
