//! Expression engines and the bounded pool that hands them out.
//!
//! An engine parses and evaluates one expression at a time. Engines are not
//! shared: the [`ExpressionEngine`] contract takes `&mut self`, and the
//! [`EnginePool`] hands each instance to exactly one holder per borrow.

mod evalexpr_engine;
pub(crate) mod lock;
mod pool;

use thiserror::Error;

use crate::domain::{EvaluationContext, Value};

pub use evalexpr_engine::EvalexprEngine;
pub use pool::{EngineFactory, EnginePool, PooledEngine};
pub(crate) use pool::{METRIC_POOL_DISCARD, METRIC_POOL_FALLBACK};

/// Parse-and-evaluate capability wrapped by the condition evaluator.
pub trait ExpressionEngine: Send {
    /// Evaluate `expression` against `context`.
    fn evaluate(&mut self, expression: &str, context: &EvaluationContext)
    -> Result<Value, EngineError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("failed to parse expression: {message}")]
    Parse { message: String },
    #[error("failed to evaluate expression: {message}")]
    Evaluation { message: String },
    #[error("cannot bind context variable `{name}`: {message}")]
    Binding { name: String, message: String },
}

impl EngineError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }

    pub fn binding(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Binding {
            name: name.into(),
            message: message.into(),
        }
    }
}
