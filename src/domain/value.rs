//! Values exchanged with expression engines and the shared evaluation context.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

/// Result of evaluating an expression, or a variable bound in the context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Tuple(Vec<Value>),
    Empty,
}

impl Value {
    /// Infer a typed value from user-supplied text (`true`, `15`, `2.5`, anything else is text).
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(flag) = trimmed.parse::<bool>() {
            return Self::Boolean(flag);
        }
        if let Ok(int) = trimmed.parse::<i64>() {
            return Self::Int(int);
        }
        if let Ok(float) = trimmed.parse::<f64>() {
            if float.is_finite() {
                return Self::Float(float);
            }
        }
        Self::Text(raw.to_string())
    }

    /// Condition semantics: only a boolean `true` counts as satisfied.
    pub fn is_true(&self) -> bool {
        matches!(self, Self::Boolean(true))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(flag) => write!(f, "{flag}"),
            Self::Int(int) => write!(f, "{int}"),
            Self::Float(float) => write!(f, "{float}"),
            Self::Text(text) => write!(f, "{text}"),
            Self::Tuple(items) => {
                write!(f, "(")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Self::Empty => write!(f, "()"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Process-wide variables every condition is evaluated against.
///
/// Each distinct set of bindings carries a unique revision so engines can
/// skip re-binding when they already hold the same variables.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    variables: BTreeMap<String, Value>,
    revision: u64,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self {
            variables: BTreeMap::new(),
            revision: next_revision(),
        }
    }

    /// Bind `name` to `value`, replacing any previous binding.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
        self.revision = next_revision();
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.variables
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<(String, Value)> for EvaluationContext {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            variables: iter.into_iter().collect(),
            revision: next_revision(),
        }
    }
}

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}
