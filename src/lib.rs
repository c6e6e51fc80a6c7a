pub mod error;
pub mod evaluator;
pub mod model;

pub use error::EvaluationError;
pub use evaluator::{critical_value, evaluate, evaluate_arms};
pub use model::{Arm, ArmRole, ConfidenceLevel, Evaluation, Verdict};
