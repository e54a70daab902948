use crate::problem::{
    entity::Vertex, instance::Instance, refuel_point::RefuelPointIdx, trip::TripIdx,
};

use super::edge::EdgeAttributes;

/// Thresholds deciding whether a refuel detour is worth keeping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArcPolicy {
    /// Longest accepted detour, in meters
    pub max_detour_meters: f64,
    /// Shortest accepted dwell at the refuel point, in seconds of effective recharge
    pub min_dwell_seconds: f64,
}

impl Default for ArcPolicy {
    fn default() -> Self {
        Self {
            max_detour_meters: 2500.0,
            min_dwell_seconds: 1800.0,
        }
    }
}

/// Refuel point minimising `dist(s, r) + dist(r, t)` among those reachable in range and in time.
/// Ties keep the first candidate.
pub fn select_refuel_point(
    instance: &Instance,
    from: Vertex,
    to: TripIdx,
    slack: f64,
    candidates: impl IntoIterator<Item = RefuelPointIdx>,
) -> Option<RefuelPointIdx> {
    let max_range = instance.max_range();
    let mut best: Option<(RefuelPointIdx, f64)> = None;

    for refuel_point in candidates {
        let to_refuel = instance.distance(from, refuel_point);
        let from_refuel = instance.distance(refuel_point, to);
        if to_refuel > max_range || from_refuel > max_range {
            continue;
        }
        if instance.time(from, refuel_point) + instance.time(refuel_point, to) > slack {
            continue;
        }

        let detour = to_refuel + from_refuel;
        if best.is_none_or(|(_, best_detour)| detour < best_detour) {
            best = Some((refuel_point, detour));
        }
    }

    best.map(|(refuel_point, _)| refuel_point)
}

/// Decides whether `from -> to` is an edge and computes its attributes.
///
/// Candidates default to every refuel point of the instance.
pub fn evaluate_arc(
    instance: &Instance,
    from: Vertex,
    to: TripIdx,
    candidates: Option<&[RefuelPointIdx]>,
    policy: &ArcPolicy,
) -> Option<EdgeAttributes> {
    let slack = instance.slack(from, to);
    if !(instance.time(from, to) <= slack) {
        return None;
    }

    let coefficients = instance.coefficients();
    let direct = instance.distance(from, to);
    let mut attributes = EdgeAttributes::direct(
        direct * coefficients.fuel_per_meter,
        direct * coefficients.cost_per_meter,
    );

    let refuel_point = match candidates {
        Some(candidates) => {
            select_refuel_point(instance, from, to, slack, candidates.iter().copied())
        }
        None => select_refuel_point(
            instance,
            from,
            to,
            slack,
            instance.refuel_point_indices(),
        ),
    };
    let Some(refuel_point) = refuel_point else {
        return Some(attributes);
    };

    let to_refuel = instance.distance(from, refuel_point);
    let from_refuel = instance.distance(refuel_point, to);
    let detour = to_refuel + from_refuel - direct;
    let dwell = slack - instance.time(from, refuel_point) - instance.time(refuel_point, to);

    let fg = to_refuel * coefficients.fuel_per_meter;
    let fh = from_refuel * coefficients.fuel_per_meter;
    let fd = detour * coefficients.fuel_per_meter;
    let fr = (dwell * coefficients.refuel_per_second).min(1.0);

    let rejected = fd >= fr
        || detour > policy.max_detour_meters
        || fr / coefficients.refuel_per_second < policy.min_dwell_seconds;
    if rejected {
        return Some(attributes);
    }

    attributes.refuel_point = Some(refuel_point);
    attributes.fg = fg;
    attributes.fh = fh;
    attributes.fd = fd;
    attributes.fr = fr;
    attributes.cd = detour * coefficients.cost_per_meter;

    if fg + fh < attributes.fe {
        attributes.fe = fg + fh;
        attributes.fd = 0.0;
        attributes.cd = 0.0;
    }

    Some(attributes)
}
