pub mod document;
pub mod error;
pub mod evaluator;
pub mod substitution;

pub use document::MonitorDocument;
pub use error::EvalError;
pub use evaluator::{ConditionEvaluator, EvalOutcome};
pub use substitution::substitute;
