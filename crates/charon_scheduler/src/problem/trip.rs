use std::cmp::Ordering;

use jiff::{SignedDuration, civil::DateTime};

use crate::define_index_newtype;

use super::{
    entity::{Identified, Located, Scheduled},
    point::Point,
};

define_index_newtype!(TripIdx, Trip);

/// A car leg of a customer route.
#[derive(Clone, Debug, PartialEq)]
pub struct Trip {
    id: String,
    location_id: Option<i64>,
    start_loc: Point,
    finish_loc: Point,
    start_time: DateTime,
    finish_time: DateTime,
    distance: f64,
    service_drive: bool,
}

impl Trip {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn location_id(&self) -> Option<i64> {
        self.location_id
    }

    pub fn start_loc(&self) -> Point {
        self.start_loc
    }

    pub fn finish_loc(&self) -> Point {
        self.finish_loc
    }

    pub fn duration(&self) -> SignedDuration {
        self.finish_time.duration_since(self.start_time)
    }

    /// Meters driven with the customer.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn is_service_drive(&self) -> bool {
        self.service_drive
    }

    /// Order of trips inside an instance.
    pub fn schedule_cmp(&self, other: &Trip) -> Ordering {
        self.start_time
            .cmp(&other.start_time)
            .then_with(|| self.duration().cmp(&other.duration()))
            .then_with(|| self.distance.total_cmp(&other.distance))
            .then_with(|| self.start_loc.cmp(&other.start_loc))
            .then_with(|| self.finish_loc.cmp(&other.finish_loc))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl Located for Trip {
    fn departure(&self) -> Point {
        self.finish_loc
    }

    fn arrival(&self) -> Point {
        self.start_loc
    }
}

impl Scheduled for Trip {
    fn start_time(&self) -> DateTime {
        self.start_time
    }

    fn finish_time(&self) -> DateTime {
        self.finish_time
    }
}

impl Identified for Trip {
    fn identity(&self) -> String {
        format!("Trip{}", self.id)
    }
}

#[derive(Default)]
pub struct TripBuilder {
    id: Option<String>,
    location_id: Option<i64>,
    start_loc: Option<Point>,
    finish_loc: Option<Point>,
    start_time: Option<DateTime>,
    finish_time: Option<DateTime>,
    duration: Option<SignedDuration>,
    distance: Option<f64>,
    service_drive: bool,
}

impl TripBuilder {
    pub fn set_id(&mut self, id: String) -> &mut TripBuilder {
        self.id = Some(id);
        self
    }

    pub fn set_location_id(&mut self, location_id: i64) -> &mut TripBuilder {
        self.location_id = Some(location_id);
        self
    }

    pub fn set_start_loc(&mut self, start_loc: Point) -> &mut TripBuilder {
        self.start_loc = Some(start_loc);
        self
    }

    pub fn set_finish_loc(&mut self, finish_loc: Point) -> &mut TripBuilder {
        self.finish_loc = Some(finish_loc);
        self
    }

    pub fn set_start_time(&mut self, start_time: DateTime) -> &mut TripBuilder {
        self.start_time = Some(start_time);
        self
    }

    /// Takes precedence over `set_duration`.
    pub fn set_finish_time(&mut self, finish_time: DateTime) -> &mut TripBuilder {
        self.finish_time = Some(finish_time);
        self
    }

    pub fn set_duration(&mut self, duration: SignedDuration) -> &mut TripBuilder {
        self.duration = Some(duration);
        self
    }

    pub fn set_distance(&mut self, distance: f64) -> &mut TripBuilder {
        self.distance = Some(distance);
        self
    }

    pub fn set_service_drive(&mut self, service_drive: bool) -> &mut TripBuilder {
        self.service_drive = service_drive;
        self
    }

    pub fn build(self) -> Trip {
        let start_loc = self.start_loc.unwrap_or(Point::new(0.0, 0.0));
        let start_time = self
            .start_time
            .unwrap_or(jiff::civil::date(2000, 1, 1).at(0, 0, 0, 0));
        let finish_time = self.finish_time.unwrap_or_else(|| {
            start_time
                .checked_add(self.duration.unwrap_or(SignedDuration::ZERO))
                .unwrap_or(start_time)
        });

        Trip {
            id: self.id.unwrap_or_default(),
            location_id: self.location_id,
            start_loc,
            finish_loc: self.finish_loc.unwrap_or(start_loc),
            start_time,
            finish_time,
            distance: self.distance.unwrap_or(0.0),
            service_drive: self.service_drive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_time_from_duration() {
        let mut builder = TripBuilder::default();
        builder
            .set_id(String::from("T00001"))
            .set_start_time("2015-10-01T08:10:00".parse().unwrap())
            .set_duration(SignedDuration::from_mins(20));
        let trip = builder.build();

        assert_eq!(
            trip.finish_time(),
            "2015-10-01T08:30:00".parse::<DateTime>().unwrap()
        );
        assert_eq!(trip.duration(), SignedDuration::from_mins(20));
        assert_eq!(trip.identity(), "TripT00001");
    }

    #[test]
    fn test_schedule_order() {
        let mut early = TripBuilder::default();
        early
            .set_id(String::from("b"))
            .set_start_time("2015-10-01T08:00:00".parse().unwrap());
        let mut late = TripBuilder::default();
        late.set_id(String::from("a"))
            .set_start_time("2015-10-01T09:00:00".parse().unwrap());

        assert_eq!(early.build().schedule_cmp(&late.build()), Ordering::Less);
    }
}
