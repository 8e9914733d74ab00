//! Condition evaluation service.
//!
//! Resolves placeholders, normalizes numeric literals, consults the result
//! cache, and only on a miss borrows a pooled engine to evaluate. Every
//! failure degrades to `false`; callers never see an error.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{trace, warn};

use crate::cache::ResultCache;
use crate::domain::{ConditionalModifier, EvaluationContext, normalize_number_literals};
use crate::engine::{EnginePool, EvalexprEngine, ExpressionEngine};

use super::config::EvaluatorConfig;
use super::failures::FailureLog;
use super::placeholder::PlaceholderResolver;

pub(crate) const METRIC_EVALUATION_FAILURE: &str = "condeval_evaluation_failure_total";
pub(crate) const METRIC_EVALUATION_MS: &str = "condeval_evaluation_ms";

/// Evaluates display conditions for subjects of type `S`.
///
/// Safe to share across threads; every call to [`evaluate`](Self::evaluate)
/// holds at most one engine, exclusively, for the duration of the evaluation.
pub struct ConditionEvaluator<S: ?Sized, E: ExpressionEngine = EvalexprEngine> {
    resolver: Option<Arc<dyn PlaceholderResolver<S>>>,
    pool: EnginePool<E>,
    results: ResultCache,
    failures: FailureLog,
    context: EvaluationContext,
}

impl<S: ?Sized> ConditionEvaluator<S, EvalexprEngine> {
    /// Build an evaluator backed by [`EvalexprEngine`] instances.
    pub fn new(
        config: &EvaluatorConfig,
        resolver: Arc<dyn PlaceholderResolver<S>>,
        context: EvaluationContext,
    ) -> Self {
        let compiled_limit = config.compiled_cache_limit_non_zero();
        Self::with_engine(config, resolver, context, move || {
            EvalexprEngine::with_compiled_limit(compiled_limit)
        })
    }
}

impl<S: ?Sized, E: ExpressionEngine> ConditionEvaluator<S, E> {
    /// Build an evaluator whose pool is filled from `factory`.
    pub fn with_engine<F>(
        config: &EvaluatorConfig,
        resolver: Arc<dyn PlaceholderResolver<S>>,
        context: EvaluationContext,
        factory: F,
    ) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        let pool = EnginePool::new(
            config.pool_size_non_zero(),
            config.borrow_timeout(),
            factory,
        );

        Self {
            resolver: config.placeholders_enabled.then_some(resolver),
            pool,
            results: ResultCache::new(config.result_ttl()),
            failures: FailureLog::new(),
            context,
        }
    }

    /// Evaluate `modifier` for `subject`.
    ///
    /// Returns `false` for conditions that are false, that produce a
    /// non-boolean value, or that fail to parse or evaluate.
    pub fn evaluate(&self, modifier: &ConditionalModifier, subject: &S) -> bool {
        let raw = modifier.expression();
        let resolved = match &self.resolver {
            Some(resolver) => resolver.resolve(raw, subject),
            None => Cow::Borrowed(raw),
        };
        let normalized = normalize_number_literals(&resolved);

        if let Some(cached) = self.results.get(&normalized) {
            return cached;
        }

        let started_at = Instant::now();
        let outcome = self.pool.borrow().evaluate(&normalized, &self.context);
        histogram!(METRIC_EVALUATION_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        match outcome {
            Ok(value) => {
                let satisfied = value.is_true();
                trace!(
                    expression = raw,
                    normalized = %normalized,
                    %value,
                    satisfied,
                    "Evaluated condition"
                );
                self.results.put(normalized.into_owned(), satisfied);
                satisfied
            }
            Err(err) => {
                counter!(METRIC_EVALUATION_FAILURE).increment(1);
                if self.failures.record(raw) {
                    warn!(
                        expression = raw,
                        normalized = %normalized,
                        error = %err,
                        "Failed to evaluate conditional expression"
                    );
                }
                false
            }
        }
    }

    /// Sweep expired results out of the cache. Returns how many were removed.
    pub fn purge_expired_results(&self) -> usize {
        self.results.purge_expired()
    }

    /// Forget every cached result.
    pub fn invalidate_results(&self) {
        self.results.clear();
    }

    pub fn results(&self) -> &ResultCache {
        &self.results
    }

    pub fn pool(&self) -> &EnginePool<E> {
        &self.pool
    }

    pub fn failures(&self) -> &FailureLog {
        &self.failures
    }

    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    pub fn placeholders_enabled(&self) -> bool {
        self.resolver.is_some()
    }
}

impl<S: ?Sized, E: ExpressionEngine> fmt::Debug for ConditionEvaluator<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionEvaluator")
            .field("placeholders_enabled", &self.resolver.is_some())
            .field("pool", &self.pool)
            .field("results", &self.results.len())
            .field("failures", &self.failures.len())
            .finish_non_exhaustive()
    }
}
