pub mod evaluator;
pub mod variant;
