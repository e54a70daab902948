use crate::define_index_newtype;

use super::trip::TripIdx;

define_index_newtype!(CustomerIdx, Customer);
define_index_newtype!(RouteIdx, Route);

/// A customer with alternative itineraries, exactly one of which is served.
#[derive(Clone, Debug, PartialEq)]
pub struct Customer {
    pub(crate) id: usize,
    pub(crate) routes: Vec<RouteIdx>,
}

impl Customer {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn routes(&self) -> &[RouteIdx] {
        &self.routes
    }
}

/// One itinerary of a customer: its car trips plus the cost of the other legs.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub(crate) id: usize,
    pub(crate) cost: f64,
    pub(crate) customer: CustomerIdx,
    pub(crate) trips: Vec<TripIdx>,
}

impl Route {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn customer(&self) -> CustomerIdx {
        self.customer
    }

    /// Trips ordered by start time.
    pub fn trips(&self) -> &[TripIdx] {
        &self.trips
    }
}
