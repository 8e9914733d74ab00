//! [`ExpressionEngine`] backed by the `evalexpr` crate.

use std::fmt;
use std::num::NonZeroUsize;

use evalexpr::{ContextWithMutableVariables, HashMapContext, Node, build_operator_tree};
use lru::LruCache;

use crate::domain::{EvaluationContext, Value};

use super::{EngineError, ExpressionEngine};

const DEFAULT_COMPILED_LIMIT: NonZeroUsize = match NonZeroUsize::new(128) {
    Some(limit) => limit,
    None => NonZeroUsize::MIN,
};

/// Engine instance holding its own compiled-expression cache and bound variables.
///
/// Compiled operator trees are kept per instance in a small LRU, so repeated
/// conditions skip parsing on pooled engines.
pub struct EvalexprEngine {
    compiled: LruCache<String, Node>,
    bindings: HashMapContext,
    bound_revision: Option<u64>,
}

impl EvalexprEngine {
    pub fn new() -> Self {
        Self::with_compiled_limit(DEFAULT_COMPILED_LIMIT)
    }

    pub fn with_compiled_limit(limit: NonZeroUsize) -> Self {
        Self {
            compiled: LruCache::new(limit),
            bindings: HashMapContext::new(),
            bound_revision: None,
        }
    }

    /// Number of compiled expressions currently retained.
    pub fn compiled_len(&self) -> usize {
        self.compiled.len()
    }

    fn bind(&mut self, context: &EvaluationContext) -> Result<(), EngineError> {
        if self.bound_revision == Some(context.revision()) {
            return Ok(());
        }

        let mut bindings = HashMapContext::new();
        for (name, value) in context.iter() {
            bindings
                .set_value(name.to_string(), to_evalexpr(value))
                .map_err(|err| EngineError::binding(name, err.to_string()))?;
        }

        self.bindings = bindings;
        self.bound_revision = Some(context.revision());
        Ok(())
    }
}

impl Default for EvalexprEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EvalexprEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalexprEngine")
            .field("compiled", &self.compiled.len())
            .field("bound_revision", &self.bound_revision)
            .finish()
    }
}

impl ExpressionEngine for EvalexprEngine {
    fn evaluate(
        &mut self,
        expression: &str,
        context: &EvaluationContext,
    ) -> Result<Value, EngineError> {
        self.bind(context)?;

        if !self.compiled.contains(expression) {
            let node = build_operator_tree(expression)
                .map_err(|err| EngineError::parse(err.to_string()))?;
            self.compiled.put(expression.to_string(), node);
        }

        let node = self
            .compiled
            .get(expression)
            .ok_or_else(|| EngineError::evaluation("compiled expression was evicted"))?;

        node.eval_with_context(&self.bindings)
            .map(from_evalexpr)
            .map_err(|err| EngineError::evaluation(err.to_string()))
    }
}

fn to_evalexpr(value: &Value) -> evalexpr::Value {
    match value {
        Value::Boolean(flag) => evalexpr::Value::Boolean(*flag),
        Value::Int(int) => evalexpr::Value::Int(*int),
        Value::Float(float) => evalexpr::Value::Float(*float),
        Value::Text(text) => evalexpr::Value::String(text.clone()),
        Value::Tuple(items) => evalexpr::Value::Tuple(items.iter().map(to_evalexpr).collect()),
        Value::Empty => evalexpr::Value::Empty,
    }
}

fn from_evalexpr(value: evalexpr::Value) -> Value {
    match value {
        evalexpr::Value::Boolean(flag) => Value::Boolean(flag),
        evalexpr::Value::Int(int) => Value::Int(int),
        evalexpr::Value::Float(float) => Value::Float(float),
        evalexpr::Value::String(text) => Value::Text(text),
        evalexpr::Value::Tuple(items) => Value::Tuple(items.into_iter().map(from_evalexpr).collect()),
        evalexpr::Value::Empty => Value::Empty,
    }
}
