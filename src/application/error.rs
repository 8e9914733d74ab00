use std::error::Error as StdError;

use thiserror::Error;

use crate::{config::LoadError, infra::error::InfraError};

/// Flattened view of an error and its source chain, outermost first.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    /// Messages joined as `outer: inner: root`.
    pub fn chain(&self) -> String {
        self.messages.join(": ")
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to load configuration")]
    Config(#[source] LoadError),
    #[error("validation failed: {0}")]
    Validation(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Process exit code for this error, following `sysexits` conventions.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Validation(_) => 64,
            AppError::Config(_) => 78,
            AppError::Infra(InfraError::Io(_)) => 74,
            AppError::Infra(InfraError::Telemetry(_)) => 70,
        }
    }
}

impl From<LoadError> for AppError {
    fn from(error: LoadError) -> Self {
        Self::Config(error)
    }
}
