use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::evaluator::{METRIC_EVALUATION_FAILURE, METRIC_EVALUATION_MS};
use crate::cache::{
    METRIC_RESULT_CACHE_EXPIRED, METRIC_RESULT_CACHE_HIT, METRIC_RESULT_CACHE_MISS,
};
use crate::config::{LogFormat, LoggingSettings};
use crate::engine::{METRIC_POOL_DISCARD, METRIC_POOL_FALLBACK};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Diagnostics go to stderr so command output on stdout stays machine readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for every metric the evaluator emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_RESULT_CACHE_HIT,
            Unit::Count,
            "Total number of condition results served from the result cache."
        );
        describe_counter!(
            METRIC_RESULT_CACHE_MISS,
            Unit::Count,
            "Total number of result cache misses, expired entries included."
        );
        describe_counter!(
            METRIC_RESULT_CACHE_EXPIRED,
            Unit::Count,
            "Total number of cached results evicted on lookup after their TTL."
        );
        describe_counter!(
            METRIC_POOL_FALLBACK,
            Unit::Count,
            "Total number of engines constructed because the pool stayed empty past the borrow timeout."
        );
        describe_counter!(
            METRIC_POOL_DISCARD,
            Unit::Count,
            "Total number of engines dropped because the pool was full on release."
        );
        describe_counter!(
            METRIC_EVALUATION_FAILURE,
            Unit::Count,
            "Total number of failed condition evaluations, repeats included."
        );
        describe_histogram!(
            METRIC_EVALUATION_MS,
            Unit::Milliseconds,
            "Engine-side condition evaluation latency in milliseconds."
        );
    });
}
