pub mod json;
pub mod mosel;
pub mod pareto;
pub mod problem;
pub mod solution;
pub mod solver;
pub mod storage;
pub mod subproblem;
pub mod taskgraph;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;
