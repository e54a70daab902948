pub mod io;
pub mod schema;
pub mod types;
