use jiff::civil::DateTime;

use crate::define_index_newtype;

use super::{
    entity::{Identified, Located, Scheduled},
    point::Point,
};

define_index_newtype!(VehicleIdx, Vehicle);

/// A vehicle waiting at its start location from its shift start on.
/// It behaves like a zero-duration trip ending where and when the shift starts.
#[derive(Clone, Debug, PartialEq)]
pub struct Vehicle {
    id: String,
    location: Point,
    start_time: DateTime,
    fuel: f64,
}

impl Vehicle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn location(&self) -> Point {
        self.location
    }

    /// Initial tank fraction in `[0, 1]`.
    pub fn fuel(&self) -> f64 {
        self.fuel
    }
}

impl Located for Vehicle {
    fn departure(&self) -> Point {
        self.location
    }

    fn arrival(&self) -> Point {
        self.location
    }
}

impl Scheduled for Vehicle {
    fn start_time(&self) -> DateTime {
        self.start_time
    }

    fn finish_time(&self) -> DateTime {
        self.start_time
    }
}

impl Identified for Vehicle {
    fn identity(&self) -> String {
        format!("Vehicle{}", self.id)
    }
}

#[derive(Default)]
pub struct VehicleBuilder {
    id: Option<String>,
    location: Option<Point>,
    start_time: Option<DateTime>,
    fuel: Option<f64>,
}

impl VehicleBuilder {
    pub fn set_id(&mut self, id: String) -> &mut VehicleBuilder {
        self.id = Some(id);
        self
    }

    pub fn set_location(&mut self, location: Point) -> &mut VehicleBuilder {
        self.location = Some(location);
        self
    }

    pub fn set_start_time(&mut self, start_time: DateTime) -> &mut VehicleBuilder {
        self.start_time = Some(start_time);
        self
    }

    pub fn set_fuel(&mut self, fuel: f64) -> &mut VehicleBuilder {
        self.fuel = Some(fuel);
        self
    }

    /// Missing fields fall back to an empty id, `(0, 0)`, midnight of year 2000 and a full tank.
    pub fn build(self) -> Vehicle {
        Vehicle {
            id: self.id.unwrap_or_default(),
            location: self.location.unwrap_or(Point::new(0.0, 0.0)),
            start_time: self
                .start_time
                .unwrap_or(jiff::civil::date(2000, 1, 1).at(0, 0, 0, 0)),
            fuel: self.fuel.unwrap_or(1.0).clamp(0.0, 1.0),
        }
    }
}
