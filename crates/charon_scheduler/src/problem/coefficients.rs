use serde::{Deserialize, Serialize};

/// Scalar fuel and cost rates of an instance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    /// Tank fraction consumed per meter
    pub fuel_per_meter: f64,
    /// Tank fraction recovered per second at a refuel point
    pub refuel_per_second: f64,
    pub cost_per_meter: f64,
    pub cost_per_vehicle: f64,
}

impl Coefficients {
    /// Distance a full tank covers.
    pub fn max_range(&self) -> f64 {
        1.0 / self.fuel_per_meter
    }
}

impl Default for Coefficients {
    fn default() -> Self {
        Self {
            fuel_per_meter: 1e-5,
            refuel_per_second: 1.0 / 3600.0,
            cost_per_meter: 1e-3,
            cost_per_vehicle: 0.0,
        }
    }
}
