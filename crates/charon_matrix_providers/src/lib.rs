pub mod as_the_crow_flies;
pub mod cache;
pub mod nullable_floats;
pub mod osrm;
pub mod otp;
pub mod travel_matrices;
pub mod travel_matrix_client;
pub mod travel_matrix_provider;
