use fixedbitset::FixedBitSet;

use crate::problem::{entity::Vertex, instance::Instance, refuel_point::RefuelPointIdx};

use super::{
    Frontier,
    objectives::{Objectives, dominates, is_time_feasible, objectives, recharge_window},
};

/// Bytes held by one origin evaluated with the dense strategy.
pub fn origin_memory(num_trips: usize, num_refuel_points: usize) -> usize {
    let cells = num_trips * num_refuel_points;

    cells * std::mem::size_of::<Objectives>()
        + cells.div_ceil(8)
        + (cells * num_refuel_points).div_ceil(8)
}

/// Frontiers of every trip from `from`, evaluating all trip and refuel point pairs at once.
pub fn origin_frontiers(instance: &Instance, from: Vertex) -> Vec<Frontier> {
    let n = instance.trips().len();
    let k = instance.refuel_points().len();

    let mut phi = vec![[0.0; 4]; n * k];
    let mut admissible = FixedBitSet::with_capacity(n * k);
    for to in instance.trip_indices() {
        for refuel_point in instance.refuel_point_indices() {
            let cell = to.get() * k + refuel_point.get();
            let window = recharge_window(instance, from, to, refuel_point);
            phi[cell] = objectives(instance, from, to, refuel_point, window);
            admissible.set(cell, window >= 0.0);
        }
    }

    // Bit (t, a, b) is set when refuel point a dominates b for trip t.
    // Points with a negative window still dominate, they are only left out of the frontier.
    let mut dominance = FixedBitSet::with_capacity(n * k * k);
    for t in 0..n {
        for a in 0..k {
            for b in 0..k {
                if dominates(&phi[t * k + a], &phi[t * k + b]) {
                    dominance.insert((t * k + a) * k + b);
                }
            }
        }
    }

    instance
        .trip_indices()
        .map(|to| {
            if !is_time_feasible(instance, from, to) {
                return Frontier::new();
            }

            let t = to.get();
            (0..k)
                .filter(|&b| {
                    admissible.contains(t * k + b)
                        && !(0..k).any(|a| dominance.contains((t * k + a) * k + b))
                })
                .map(RefuelPointIdx::new)
                .collect()
        })
        .collect()
}
