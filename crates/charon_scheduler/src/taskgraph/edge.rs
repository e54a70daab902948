use crate::problem::refuel_point::RefuelPointIdx;

/// Fuel value carried by edges without a usable refuel point.
pub const INFEASIBLE_FUEL: f64 = 1.1;

/// Feasibility metadata of one task graph edge.
///
/// All fuel values are tank fractions, costs are in the instance currency.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeAttributes {
    /// Refuel point a vehicle may stop at on the way, if any
    pub refuel_point: Option<RefuelPointIdx>,
    /// Direct fuel consumption
    pub fe: f64,
    /// Fuel to reach the refuel point
    pub fg: f64,
    /// Fuel from the refuel point to the trip
    pub fh: f64,
    /// Extra fuel of the detour
    pub fd: f64,
    /// Tank fraction recoverable during the dwell
    pub fr: f64,
    /// Direct deadhead cost
    pub ce: f64,
    /// Extra cost of the detour
    pub cd: f64,
}

impl EdgeAttributes {
    /// Attributes of depot edges and splitpoint pass-throughs.
    pub const ZERO: EdgeAttributes = EdgeAttributes {
        refuel_point: None,
        fe: 0.0,
        fg: 0.0,
        fh: 0.0,
        fd: 0.0,
        fr: 0.0,
        ce: 0.0,
        cd: 0.0,
    };

    /// Direct edge without refuel option.
    pub fn direct(fe: f64, ce: f64) -> Self {
        Self {
            refuel_point: None,
            fe,
            fg: INFEASIBLE_FUEL,
            fh: INFEASIBLE_FUEL,
            fd: INFEASIBLE_FUEL,
            fr: 0.0,
            ce,
            cd: 0.0,
        }
    }

    pub fn has_refuel_point(&self) -> bool {
        self.refuel_point.is_some()
    }
}

impl Default for EdgeAttributes {
    fn default() -> Self {
        Self::ZERO
    }
}
