use crate::problem::{
    entity::Vertex, instance::Instance, refuel_point::RefuelPointIdx, trip::TripIdx,
};

use super::{
    Frontier,
    objectives::{Objectives, dominates, is_time_feasible, objectives, recharge_window},
};

/// Frontier of one pair, built as an incremental skyline.
///
/// Every refuel point competes in the skyline; those with a negative recharge
/// window are dropped afterwards.
pub fn pair_frontier(instance: &Instance, from: Vertex, to: TripIdx) -> Frontier {
    let mut skyline: Vec<(RefuelPointIdx, f64, Objectives)> = Vec::new();

    for refuel_point in instance.refuel_point_indices() {
        let window = recharge_window(instance, from, to, refuel_point);
        let phi = objectives(instance, from, to, refuel_point, window);
        if skyline.iter().any(|(_, _, other)| dominates(other, &phi)) {
            continue;
        }

        skyline.retain(|(_, _, other)| !dominates(&phi, other));
        skyline.push((refuel_point, window, phi));
    }

    let mut frontier = skyline
        .into_iter()
        .filter(|(_, window, _)| *window >= 0.0)
        .map(|(refuel_point, _, _)| refuel_point)
        .collect::<Frontier>();
    frontier.sort();

    frontier
}

/// Frontiers of every trip from `from`, visiting time-feasible pairs only.
pub fn origin_frontiers(instance: &Instance, from: Vertex) -> Vec<Frontier> {
    instance
        .trip_indices()
        .map(|to| {
            if is_time_feasible(instance, from, to) {
                pair_frontier(instance, from, to)
            } else {
                Frontier::new()
            }
        })
        .collect()
}
