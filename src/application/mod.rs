//! Application services layer.

pub mod bindings;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod failures;
pub mod placeholder;

pub use config::EvaluatorConfig;
pub use evaluator::ConditionEvaluator;
pub use failures::FailureLog;
pub use placeholder::{Passthrough, PercentPlaceholders, PlaceholderResolver, PlaceholderSource};
