use std::io::Write as _;

use serial_test::serial;

use super::*;

fn cli(args: &[&str]) -> CliArgs {
    let mut argv = vec!["condeval"];
    argv.extend_from_slice(args);
    CliArgs::try_parse_from(argv).expect("valid arguments")
}

#[test]
fn defaults_match_runtime_evaluator() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.evaluator.pool_size.get(), 10);
    assert_eq!(settings.evaluator.borrow_timeout, Duration::from_millis(1000));
    assert_eq!(settings.evaluator.result_ttl, Duration::from_secs(300));
    assert!(settings.evaluator.placeholders_enabled);
    assert_eq!(settings.evaluator.compiled_cache_limit.get(), 128);
    assert_eq!(settings.logging.level, LevelFilter::WARN);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert!(settings.context.is_empty());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.evaluator.pool_size = Some(4);
    raw.logging.level = Some("info".to_string());

    let overrides = RuntimeOverrides {
        pool_size: Some(2),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_runtime_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.evaluator.pool_size.get(), 2);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = RuntimeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_runtime_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_pool_size_is_rejected() {
    let mut raw = RawSettings::default();
    raw.evaluator.pool_size = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero pool size");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "evaluator.pool_size",
            ..
        }
    ));
}

#[test]
fn zero_durations_are_rejected() {
    let mut raw = RawSettings::default();
    raw.evaluator.borrow_timeout_ms = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero borrow timeout");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "evaluator.borrow_timeout_ms",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.evaluator.result_ttl_seconds = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero ttl");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "evaluator.result_ttl_seconds",
            ..
        }
    ));
}

#[test]
fn invalid_log_level_is_reported() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid level");
    assert!(err.to_string().contains("logging.level"));
}

#[test]
fn eval_command_collects_assignments() {
    let args = cli(&[
        "eval",
        "%player_level% > 10",
        "balance > 1,000",
        "--set",
        "balance=2500",
        "--placeholder",
        "player_level=15",
        "--pool-size",
        "3",
    ]);

    assert_eq!(args.overrides.pool_size, Some(3));
    let Command::Eval(eval) = args.command else {
        panic!("expected eval command");
    };
    assert_eq!(eval.expressions, ["%player_level% > 10", "balance > 1,000"]);
    assert_eq!(eval.variables, [("balance".to_string(), "2500".to_string())]);
    assert_eq!(
        eval.placeholders,
        [("player_level".to_string(), "15".to_string())]
    );
}

#[test]
fn assignment_without_equals_is_rejected() {
    let result = CliArgs::try_parse_from(["condeval", "eval", "x > 1", "--set", "x"]);
    assert!(result.is_err());

    assert!(parse_assignment("=5").is_err());
    assert_eq!(
        parse_assignment("name=a=b").expect("valid"),
        ("name".to_string(), "a=b".to_string())
    );
}

#[test]
fn normalize_command_parses() {
    let args = cli(&["normalize", "x > 1.000"]);
    assert!(matches!(args.command, Command::Normalize(ref normalize) if normalize.expressions == ["x > 1.000"]));
}

#[test]
#[serial]
fn config_file_supplies_evaluator_and_context() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config file");
    writeln!(
        file,
        r#"
[evaluator]
pool_size = 6
result_ttl_seconds = 60
placeholders_enabled = false

[context]
level = 15
ratio = 0.5
vip = true
rank = "gold"
"#
    )
    .expect("write config");

    let path = file.path().to_string_lossy().into_owned();
    let args = cli(&["--config-file", path.as_str(), "normalize", "1"]);
    let settings = load(&args).expect("settings load");

    assert_eq!(settings.evaluator.pool_size.get(), 6);
    assert_eq!(settings.evaluator.result_ttl, Duration::from_secs(60));
    assert!(!settings.evaluator.placeholders_enabled);
    assert_eq!(settings.context.get("level"), Some(&Value::Int(15)));
    assert_eq!(settings.context.get("ratio"), Some(&Value::Float(0.5)));
    assert_eq!(settings.context.get("vip"), Some(&Value::Boolean(true)));
    assert_eq!(
        settings.context.get("rank"),
        Some(&Value::Text("gold".to_string()))
    );
}

#[test]
#[serial]
fn environment_overrides_file_and_cli_overrides_environment() {
    // SAFETY: serialised with the other env-touching tests.
    unsafe {
        std::env::set_var("CONDEVAL__EVALUATOR__POOL_SIZE", "7");
        std::env::set_var("CONDEVAL__EVALUATOR__BORROW_TIMEOUT_MS", "250");
    }

    let from_env = load(&cli(&["normalize", "1"]));
    let from_cli = load(&cli(&["--pool-size", "2", "normalize", "1"]));

    unsafe {
        std::env::remove_var("CONDEVAL__EVALUATOR__POOL_SIZE");
        std::env::remove_var("CONDEVAL__EVALUATOR__BORROW_TIMEOUT_MS");
    }

    let from_env = from_env.expect("settings from env");
    assert_eq!(from_env.evaluator.pool_size.get(), 7);
    assert_eq!(from_env.evaluator.borrow_timeout, Duration::from_millis(250));

    let from_cli = from_cli.expect("settings from cli");
    assert_eq!(from_cli.evaluator.pool_size.get(), 2);
    assert_eq!(from_cli.evaluator.borrow_timeout, Duration::from_millis(250));
}

#[test]
#[serial]
fn missing_explicit_config_file_fails() {
    let args = cli(&["--config-file", "/nonexistent/condeval.toml", "normalize", "1"]);
    let err = load(&args).expect_err("missing file");
    assert!(matches!(err, LoadError::Build(_)));
}
