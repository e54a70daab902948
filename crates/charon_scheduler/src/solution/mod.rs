pub mod duty;
pub mod evaluator;
pub mod keyframes;
pub mod solution;
pub mod validator;
