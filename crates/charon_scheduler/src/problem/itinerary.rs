//! Conversion of planner itineraries into customer routes.

use charon_matrix_providers::otp::{Itinerary, Leg};
use jiff::{Timestamp, civil::DateTime, tz::TimeZone};
use thiserror::Error;

use super::{
    instance::RouteInput,
    point::Point,
    trip::{Trip, TripBuilder},
};

#[derive(Debug, Error)]
pub enum ItineraryError {
    #[error("Leg {leg} of itinerary has no {field} time")]
    MissingTime { leg: usize, field: &'static str },

    #[error("Invalid timestamp {0}: {1}")]
    InvalidTimestamp(i64, jiff::Error),

    #[error("Itinerary has no car leg")]
    NoCarLeg,
}

/// Weights of the non-car parts of an itinerary, per second.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteCostWeights {
    pub transit: f64,
    pub walk: f64,
    pub time: f64,
}

impl Default for RouteCostWeights {
    fn default() -> Self {
        Self {
            transit: 0.0,
            walk: 0.0,
            time: 1.0 / 3600.0,
        }
    }
}

impl RouteCostWeights {
    pub fn route_cost(&self, itinerary: &Itinerary) -> f64 {
        self.transit * itinerary.transit_time
            + self.walk * itinerary.walk_time
            + self.time * itinerary.duration
    }
}

fn civil_time(millis: i64, tz: &TimeZone) -> Result<DateTime, ItineraryError> {
    let timestamp = Timestamp::from_millisecond(millis)
        .map_err(|err| ItineraryError::InvalidTimestamp(millis, err))?;

    Ok(timestamp.to_zoned(tz.clone()).datetime())
}

fn leg_to_trip(id: String, index: usize, leg: &Leg, tz: &TimeZone) -> Result<Trip, ItineraryError> {
    let departure = leg.from.departure.ok_or(ItineraryError::MissingTime {
        leg: index,
        field: "departure",
    })?;
    let arrival = leg.to.arrival.ok_or(ItineraryError::MissingTime {
        leg: index,
        field: "arrival",
    })?;

    let mut builder = TripBuilder::default();
    builder
        .set_id(id)
        .set_start_loc(Point::new(leg.from.lon, leg.from.lat))
        .set_finish_loc(Point::new(leg.to.lon, leg.to.lat))
        .set_start_time(civil_time(departure, tz)?)
        .set_finish_time(civil_time(arrival, tz)?)
        .set_distance(leg.distance);

    Ok(builder.build())
}

/// Car legs become trips named `{prefix}_{n}`; the other legs only count through the route cost.
pub fn itinerary_to_route(
    itinerary: &Itinerary,
    route_id: usize,
    prefix: &str,
    weights: &RouteCostWeights,
    tz: &TimeZone,
) -> Result<RouteInput, ItineraryError> {
    let trips = itinerary
        .legs
        .iter()
        .enumerate()
        .filter(|(_, leg)| leg.is_car())
        .enumerate()
        .map(|(n, (index, leg))| leg_to_trip(format!("{prefix}_{n}"), index, leg, tz))
        .collect::<Result<Vec<_>, _>>()?;

    if trips.is_empty() {
        return Err(ItineraryError::NoCarLeg);
    }

    Ok(RouteInput {
        id: route_id,
        cost: weights.route_cost(itinerary),
        trips,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::entity::Scheduled;

    fn itinerary(json: &str) -> Itinerary {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_car_legs_become_trips() {
        let itinerary = itinerary(
            r#"{
                "duration": 3600, "walkTime": 600, "transitTime": 1200, "startTime": 1443686400000, "endTime": 1443690000000,
                "legs": [
                    {"mode": "WALK", "distance": 200, "from": {"lon": 0, "lat": 0}, "to": {"lon": 0, "lat": 0.001}},
                    {"mode": "CAR", "distance": 5000, "from": {"lon": 0, "lat": 0.001, "departure": 1443686400000}, "to": {"lon": 0, "lat": 0.05, "arrival": 1443687000000}}
                ]
            }"#,
        );
        let weights = RouteCostWeights {
            transit: 1.0,
            walk: 2.0,
            time: 0.5,
        };

        let route = itinerary_to_route(&itinerary, 3, "C1_R3", &weights, &TimeZone::UTC).unwrap();

        assert_eq!(route.id, 3);
        assert_eq!(route.cost, 1200.0 + 1200.0 + 1800.0);
        assert_eq!(route.trips.len(), 1);
        assert_eq!(route.trips[0].id(), "C1_R3_0");
        assert_eq!(route.trips[0].distance(), 5000.0);
        assert_eq!(
            route.trips[0].start_time(),
            "2015-10-01T08:00:00".parse::<DateTime>().unwrap()
        );
        assert_eq!(
            route.trips[0].finish_time(),
            "2015-10-01T08:10:00".parse::<DateTime>().unwrap()
        );
    }

    #[test]
    fn test_itinerary_without_car_leg() {
        let itinerary = itinerary(
            r#"{
                "duration": 600, "walkTime": 600, "transitTime": 0, "startTime": 0, "endTime": 600000,
                "legs": [{"mode": "WALK", "distance": 200, "from": {"lon": 0, "lat": 0}, "to": {"lon": 0, "lat": 0.001}}]
            }"#,
        );

        assert!(matches!(
            itinerary_to_route(&itinerary, 0, "C", &RouteCostWeights::default(), &TimeZone::UTC),
            Err(ItineraryError::NoCarLeg)
        ));
    }
}
