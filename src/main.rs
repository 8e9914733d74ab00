use std::{
    collections::HashMap,
    io::{self, Write},
    process,
    sync::Arc,
};

use condeval::{
    application::{
        ConditionEvaluator, EvaluatorConfig, PercentPlaceholders,
        bindings::{bind_variables, collect_placeholders},
        error::{AppError, ErrorReport},
    },
    config::{self, EvalArgs, NormalizeArgs},
    domain::{ConditionalModifier, normalize_number_literals},
    infra::{error::InfraError, telemetry},
};
use tracing::{Dispatch, Level, debug, dispatcher, error};
use tracing_subscriber::fmt as tracing_fmt;

type Placeholders = HashMap<String, String>;

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = ErrorReport::from_error("condeval", error);
    if dispatcher::has_been_set() {
        error!(source = report.source, error = %report.chain(), "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(source = report.source, error = %report.chain(), "application error");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match cli_args.command {
        config::Command::Eval(args) => run_eval(settings, args),
        config::Command::Normalize(args) => run_normalize(args),
    }
}

fn run_eval(settings: config::Settings, args: EvalArgs) -> Result<(), AppError> {
    let mut context = settings.context;
    bind_variables(&mut context, args.variables)?;
    let placeholders: Placeholders = collect_placeholders(args.placeholders)?;

    let evaluator = ConditionEvaluator::<Placeholders>::new(
        &EvaluatorConfig::from(&settings.evaluator),
        Arc::new(PercentPlaceholders),
        context,
    );
    debug!(?evaluator, "Evaluator ready");

    let mut stdout = io::stdout().lock();
    for expression in args.expressions {
        let modifier = ConditionalModifier::new(expression);
        let satisfied = evaluator.evaluate(&modifier, &placeholders);
        writeln!(stdout, "{satisfied}").map_err(InfraError::from)?;
    }

    Ok(())
}

fn run_normalize(args: NormalizeArgs) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    for expression in &args.expressions {
        writeln!(stdout, "{}", normalize_number_literals(expression)).map_err(InfraError::from)?;
    }

    Ok(())
}
