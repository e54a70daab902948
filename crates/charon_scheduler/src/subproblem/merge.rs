use std::collections::BTreeMap;

use thiserror::Error;

use crate::{
    problem::{entity::Vertex, instance::Instance, trip::TripIdx, vehicle::VehicleIdx},
    solution::{
        duty::{Duty, DutyStop},
        solution::Solution,
    },
};

#[derive(Debug, Error, PartialEq)]
pub enum MergeError {
    #[error("Start point {0} is not served in the previous solution")]
    UnservedStartPoint(String),

    #[error("End point {0} is not served in the previous solution")]
    UnservedEndPoint(String),
}

/// Splices partial duties, keyed by their start point, back into `previous`.
///
/// A duty starting at a trip keeps the previous prefix up to that trip, a duty
/// ending at one of `end_points` gets the previous suffix after it. Vehicles
/// without a partial duty keep their duty. Fuel states are not carried over.
pub fn merge_partial_solution(
    instance: &Instance,
    previous: &Solution,
    partial: &BTreeMap<Vertex, Duty>,
    end_points: &[TripIdx],
) -> Result<Solution, MergeError> {
    let mut merged = previous.clone();
    merged.clear_fuel_states();

    let mut rebuilt = Vec::with_capacity(partial.len());

    for (&start, duty) in partial {
        let (vehicle, mut stops) = match start {
            Vertex::Vehicle(vehicle) => (vehicle, Vec::new()),
            Vertex::Trip(trip) => {
                let (vehicle, position) = locate(previous, trip)
                    .ok_or_else(|| MergeError::UnservedStartPoint(instance.identity(trip)))?;
                let prefix = previous
                    .duty(vehicle)
                    .map(|duty| duty.prefix(position).to_vec())
                    .unwrap_or_default();
                (vehicle, prefix)
            }
        };
        stops.extend_from_slice(duty.stops());
        rebuilt.push((vehicle, stops));
    }

    for (vehicle, mut stops) in rebuilt {
        let last = stops.last().and_then(DutyStop::trip);
        if let Some(last) = last.filter(|trip| end_points.contains(trip)) {
            let (owner, position) = locate(previous, last)
                .ok_or_else(|| MergeError::UnservedEndPoint(instance.identity(last)))?;
            if let Some(duty) = previous.duty(owner) {
                stops.extend_from_slice(duty.suffix(position));
            }
        }

        merged.set_duty(vehicle, Duty::new(stops));
    }

    Ok(merged)
}

fn locate(solution: &Solution, trip: TripIdx) -> Option<(VehicleIdx, usize)> {
    let vehicle = solution.owner(trip)?;
    let position = solution.duty(vehicle)?.position(trip)?;

    Some((vehicle, position))
}
