pub mod coefficients;
pub mod customer;
pub mod entity;
pub mod instance;
pub mod instance_check;
pub mod itinerary;
pub mod point;
pub mod refuel_point;
pub mod splitpoint;
pub mod travel_matrix;
pub mod trip;
pub mod vehicle;
