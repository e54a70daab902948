pub mod external;
pub mod iterative;
