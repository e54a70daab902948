use std::cmp::Ordering;

use geo::{Distance, Haversine};
use serde::{Deserialize, Serialize};

/// A WGS84 position. Equality and hashing use the exact coordinate bits.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Point {
    lon: f64,
    lat: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn is_zero(&self) -> bool {
        self.lon == 0.0 || self.lat == 0.0
    }

    /// Great-circle distance in meters.
    pub fn air_distance(&self, to: &Point) -> f64 {
        Haversine.distance(geo::Point::from(self), geo::Point::from(to))
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.lon.to_bits() == other.lon.to_bits() && self.lat.to_bits() == other.lat.to_bits()
    }
}

impl Eq for Point {}

impl std::hash::Hash for Point {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.lon.to_bits());
        state.write_u64(self.lat.to_bits());
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lon
            .total_cmp(&other.lon)
            .then_with(|| self.lat.total_cmp(&other.lat))
    }
}

impl From<&Point> for geo::Point<f64> {
    fn from(point: &Point) -> Self {
        geo::Point::new(point.lon, point.lat)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lon, self.lat)
    }
}
