use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A display condition as authored in configuration, placeholders included.
///
/// Cloning is cheap; the text is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionalModifier {
    expression: Arc<str>,
}

impl ConditionalModifier {
    pub fn new(expression: impl Into<Arc<str>>) -> Self {
        Self {
            expression: expression.into(),
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl From<&str> for ConditionalModifier {
    fn from(expression: &str) -> Self {
        Self::new(expression)
    }
}

impl From<String> for ConditionalModifier {
    fn from(expression: String) -> Self {
        Self::new(expression)
    }
}

impl fmt::Display for ConditionalModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}
