//! Evaluator configuration.
//!
//! Controls engine pooling and result caching via `condeval.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

// Default values for evaluator configuration
const DEFAULT_POOL_SIZE: usize = 10;
const DEFAULT_BORROW_TIMEOUT_MS: u64 = 1000;
const DEFAULT_RESULT_TTL_SECS: u64 = 300;
const DEFAULT_COMPILED_CACHE_LIMIT: usize = 128;

/// Evaluator configuration from `condeval.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Number of engines kept idle in the pool.
    pub pool_size: usize,
    /// How long a borrow waits for an idle engine before building a new one (ms).
    pub borrow_timeout_ms: u64,
    /// Lifetime of a cached condition result (seconds).
    pub result_ttl_seconds: u64,
    /// Resolve `%placeholder%` tokens before evaluation.
    pub placeholders_enabled: bool,
    /// Compiled expressions retained per engine instance.
    pub compiled_cache_limit: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            borrow_timeout_ms: DEFAULT_BORROW_TIMEOUT_MS,
            result_ttl_seconds: DEFAULT_RESULT_TTL_SECS,
            placeholders_enabled: true,
            compiled_cache_limit: DEFAULT_COMPILED_CACHE_LIMIT,
        }
    }
}

impl From<&crate::config::EvaluatorSettings> for EvaluatorConfig {
    fn from(settings: &crate::config::EvaluatorSettings) -> Self {
        Self {
            pool_size: settings.pool_size.get(),
            borrow_timeout_ms: u64::try_from(settings.borrow_timeout.as_millis())
                .unwrap_or(u64::MAX),
            result_ttl_seconds: settings.result_ttl.as_secs(),
            placeholders_enabled: settings.placeholders_enabled,
            compiled_cache_limit: settings.compiled_cache_limit.get(),
        }
    }
}

impl EvaluatorConfig {
    /// Returns the pool size as NonZeroUsize, clamping to 1 if zero.
    pub fn pool_size_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.pool_size).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the compiled cache limit as NonZeroUsize, clamping to 1 if zero.
    pub fn compiled_cache_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.compiled_cache_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn borrow_timeout(&self) -> Duration {
        Duration::from_millis(self.borrow_timeout_ms)
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_seconds)
    }
}
