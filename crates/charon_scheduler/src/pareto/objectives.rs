use crate::problem::{
    entity::Vertex, instance::Instance, refuel_point::RefuelPointIdx, trip::TripIdx,
};

/// Cost, fuel to the trip with late recharge, fuel to the trip with early recharge,
/// and net fuel balance of a detour through one refuel point.
pub type Objectives = [f64; 4];

/// Pairs the frontier is defined on: distinct vertices with a direct connection in time.
#[inline]
pub fn is_time_feasible(instance: &Instance, from: Vertex, to: TripIdx) -> bool {
    from != Vertex::Trip(to) && instance.time(from, to) <= instance.slack(from, to)
}

/// Seconds left for recharging when driving `from -> refuel_point -> to`.
#[inline]
pub fn recharge_window(
    instance: &Instance,
    from: Vertex,
    to: TripIdx,
    refuel_point: RefuelPointIdx,
) -> f64 {
    instance.slack(from, to) - instance.time(from, refuel_point) - instance.time(refuel_point, to)
}

pub fn objectives(
    instance: &Instance,
    from: Vertex,
    to: TripIdx,
    refuel_point: RefuelPointIdx,
    window: f64,
) -> Objectives {
    let coefficients = instance.coefficients();
    let to_refuel = instance.distance(from, refuel_point);
    let from_refuel = instance.distance(refuel_point, to);

    let recharge = (coefficients.refuel_per_second * window).min(1.0);
    let fuel_to = coefficients.fuel_per_meter * to_refuel;
    let fuel_from = coefficients.fuel_per_meter * from_refuel;

    [
        coefficients.cost_per_meter * (to_refuel + from_refuel),
        fuel_to + (fuel_from - recharge).max(0.0),
        (fuel_to - recharge).max(0.0) + fuel_from,
        fuel_to - recharge + fuel_from,
    ]
}

/// Standard Pareto dominance: no worse everywhere, strictly better somewhere.
#[inline]
pub fn dominates(a: &Objectives, b: &Objectives) -> bool {
    a.iter().zip(b).all(|(x, y)| x <= y) && a.iter().zip(b).any(|(x, y)| x < y)
}
