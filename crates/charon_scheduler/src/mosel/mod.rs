pub mod export;
pub mod parser;
pub mod solution_io;
pub mod value;
pub mod writer;
