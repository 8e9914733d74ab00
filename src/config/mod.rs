//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    collections::BTreeMap,
    num::NonZeroUsize,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::{EvaluationContext, Value};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "condeval";
const DEFAULT_POOL_SIZE: u64 = 10;
const DEFAULT_BORROW_TIMEOUT_MS: u64 = 1000;
const DEFAULT_RESULT_TTL_SECS: u64 = 300;
const DEFAULT_COMPILED_CACHE_LIMIT: u64 = 128;

/// Command-line arguments for the condeval binary.
#[derive(Debug, Parser)]
#[command(
    name = "condeval",
    version,
    about = "Evaluate display conditions the way the runtime evaluator does"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "CONDEVAL_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: RuntimeOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Evaluate one or more conditions and print `true` or `false` for each.
    Eval(EvalArgs),
    /// Print conditions with their numeric literals normalized.
    Normalize(NormalizeArgs),
}

#[derive(Debug, Args, Clone)]
pub struct EvalArgs {
    /// Conditions as authored, placeholders included.
    #[arg(value_name = "EXPRESSION", required = true)]
    pub expressions: Vec<String>,

    /// Bind a context variable; the value type is inferred (bool, int, float, text).
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub variables: Vec<(String, String)>,

    /// Provide a value for a `%KEY%` placeholder.
    #[arg(long = "placeholder", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub placeholders: Vec<(String, String)>,
}

#[derive(Debug, Args, Clone)]
pub struct NormalizeArgs {
    /// Conditions to normalize.
    #[arg(value_name = "EXPRESSION", required = true)]
    pub expressions: Vec<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RuntimeOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the number of pooled engines.
    #[arg(long = "pool-size", value_name = "COUNT", global = true)]
    pub pool_size: Option<u64>,

    /// Override how long a borrow waits for an idle engine.
    #[arg(long = "borrow-timeout-ms", value_name = "MILLISECONDS", global = true)]
    pub borrow_timeout_ms: Option<u64>,

    /// Override the lifetime of cached results.
    #[arg(long = "result-ttl-seconds", value_name = "SECONDS", global = true)]
    pub result_ttl_seconds: Option<u64>,

    /// Toggle `%placeholder%` resolution.
    #[arg(
        long = "placeholders",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub placeholders_enabled: Option<bool>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub evaluator: EvaluatorSettings,
    pub context: EvaluationContext,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct EvaluatorSettings {
    pub pool_size: NonZeroUsize,
    pub borrow_timeout: Duration,
    pub result_ttl: Duration,
    pub placeholders_enabled: bool,
    pub compiled_cache_limit: NonZeroUsize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix("CONDEVAL")
            .separator("__")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_runtime_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Parse the process arguments and load settings for them.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    evaluator: RawEvaluatorSettings,
    context: BTreeMap<String, Value>,
}

impl RawSettings {
    fn apply_runtime_overrides(&mut self, overrides: &RuntimeOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(size) = overrides.pool_size {
            self.evaluator.pool_size = Some(size);
        }
        if let Some(timeout) = overrides.borrow_timeout_ms {
            self.evaluator.borrow_timeout_ms = Some(timeout);
        }
        if let Some(ttl) = overrides.result_ttl_seconds {
            self.evaluator.result_ttl_seconds = Some(ttl);
        }
        if let Some(enabled) = overrides.placeholders_enabled {
            self.evaluator.placeholders_enabled = Some(enabled);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            evaluator,
            context,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let evaluator = build_evaluator_settings(evaluator)?;
        let context = context.into_iter().collect();

        Ok(Self {
            logging,
            evaluator,
            context,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::WARN,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_evaluator_settings(
    evaluator: RawEvaluatorSettings,
) -> Result<EvaluatorSettings, LoadError> {
    let pool_size = non_zero_usize(
        evaluator.pool_size.unwrap_or(DEFAULT_POOL_SIZE),
        "evaluator.pool_size",
    )?;

    let timeout_ms = evaluator
        .borrow_timeout_ms
        .unwrap_or(DEFAULT_BORROW_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "evaluator.borrow_timeout_ms",
            "must be greater than zero",
        ));
    }

    let ttl_secs = evaluator
        .result_ttl_seconds
        .unwrap_or(DEFAULT_RESULT_TTL_SECS);
    if ttl_secs == 0 {
        return Err(LoadError::invalid(
            "evaluator.result_ttl_seconds",
            "must be greater than zero",
        ));
    }

    let compiled_cache_limit = non_zero_usize(
        evaluator
            .compiled_cache_limit
            .unwrap_or(DEFAULT_COMPILED_CACHE_LIMIT),
        "evaluator.compiled_cache_limit",
    )?;

    Ok(EvaluatorSettings {
        pool_size,
        borrow_timeout: Duration::from_millis(timeout_ms),
        result_ttl: Duration::from_secs(ttl_secs),
        placeholders_enabled: evaluator.placeholders_enabled.unwrap_or(true),
        compiled_cache_limit,
    })
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value = usize::try_from(value)
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Parse a `NAME=VALUE` command-line assignment.
fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing name in `{raw}`"));
    }
    Ok((name.to_string(), value.to_string()))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEvaluatorSettings {
    pool_size: Option<u64>,
    borrow_timeout_ms: Option<u64>,
    result_ttl_seconds: Option<u64>,
    placeholders_enabled: Option<bool>,
    compiled_cache_limit: Option<u64>,
}

#[cfg(test)]
mod tests;
