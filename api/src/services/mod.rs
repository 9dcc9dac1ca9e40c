pub mod alert;

pub use alert::{AlertEvaluator, AlertThresholds, EvaluationError, EvaluationReport};
