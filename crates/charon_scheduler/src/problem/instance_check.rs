use rayon::prelude::*;
use tracing::{info, warn};

use super::{
    entity::{Entity, Located, Vertex},
    instance::Instance,
    trip::TripIdx,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InstanceIssue {
    /// Trip starts and finishes at the same time.
    ZeroDuration(TripIdx),
    /// A longitude or latitude is exactly zero, usually a geocoding failure.
    ZeroCoordinates(Entity),
    /// No vehicle or trip reaches the trip in time and within range.
    Unreachable(TripIdx),
}

impl InstanceIssue {
    pub fn severity(&self) -> Severity {
        match self {
            InstanceIssue::ZeroDuration(_) | InstanceIssue::ZeroCoordinates(_) => Severity::Warning,
            InstanceIssue::Unreachable(_) => Severity::Error,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct InstanceReport {
    pub issues: Vec<InstanceIssue>,
}

impl InstanceReport {
    /// An instance is valid when no issue is an error.
    pub fn is_valid(&self) -> bool {
        self.issues
            .iter()
            .all(|issue| issue.severity() < Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &InstanceIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &InstanceIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity() == Severity::Warning)
    }
}

impl Instance {
    /// Whether some vertex other than `trip` reaches it in time with a full tank.
    pub fn is_reachable(&self, trip: TripIdx) -> bool {
        let max_range = self.max_range();

        self.vertices()
            .filter(|&vertex| vertex != Vertex::Trip(trip))
            .any(|vertex| {
                self.time(vertex, trip) <= self.slack(vertex, trip)
                    && self.distance(vertex, trip) <= max_range
            })
    }

    pub fn check(&self) -> InstanceReport {
        let mut issues = Vec::new();

        for trip in self.trip_indices() {
            if self.trip(trip).duration().is_zero() {
                issues.push(InstanceIssue::ZeroDuration(trip));
            }
        }

        for index in 0..self.num_extended_vertices() {
            let entity = self.entity_at(index);
            let zero = match entity {
                Entity::Vehicle(vehicle) => self.vehicle(vehicle).departure().is_zero(),
                Entity::Trip(trip) => {
                    let trip = self.trip(trip);
                    trip.departure().is_zero() || trip.arrival().is_zero()
                }
                Entity::RefuelPoint(refuel_point) => {
                    self.refuel_point(refuel_point).departure().is_zero()
                }
            };
            if zero {
                issues.push(InstanceIssue::ZeroCoordinates(entity));
            }
        }

        let unreachable = self
            .trip_indices()
            .collect::<Vec<_>>()
            .into_par_iter()
            .filter(|&trip| !self.is_reachable(trip))
            .collect::<Vec<_>>();
        issues.extend(unreachable.into_iter().map(InstanceIssue::Unreachable));

        for issue in &issues {
            match issue {
                InstanceIssue::ZeroDuration(trip) => {
                    warn!("{} has zero duration", self.identity(*trip))
                }
                InstanceIssue::ZeroCoordinates(entity) => {
                    warn!("{} has zero coordinates", self.identity(*entity))
                }
                InstanceIssue::Unreachable(trip) => {
                    warn!("{} cannot be reached by any vertex", self.identity(*trip))
                }
            }
        }

        let report = InstanceReport { issues };
        info!(
            "Instance check: {} errors, {} warnings",
            report.errors().count(),
            report.warnings().count()
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn test_chain_instance_is_valid() {
        let instance = test_utils::create_chain_instance(3, 1);

        let report = instance.check();

        assert!(report.is_valid());
        assert_eq!(report.errors().count(), 0);
    }

    #[test]
    fn test_unreachable_trip_is_an_error() {
        let instance = test_utils::create_unreachable_instance();

        let report = instance.check();

        assert!(!report.is_valid());
        assert!(
            report
                .issues
                .contains(&InstanceIssue::Unreachable(TripIdx::new(0)))
        );
    }
}
