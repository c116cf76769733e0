//! Loading, validating and re-serializing logging documents.

use std::fs;

use logconf::config::{
    load_config, parse_config, to_document, ConfigError, DocumentFormat, HandlerClass, Level,
    StreamTarget, ValidationError,
};
use logconf::LogSystem;

mod common;

#[test]
fn test_shipped_document_scenario() {
    let config = load_config(&common::shipped_config_path()).unwrap();

    assert_eq!(config.version, 1);
    assert!(!config.disable_existing_loggers);
    assert_eq!(config.retain_logs_days, 30);

    let names: Vec<_> = config.loggers.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["main", "master"]);
    for logger in config.loggers.values() {
        assert_eq!(logger.handlers.len(), 2);
        assert_eq!(logger.handlers[0], "console");
        assert!(!logger.propagate);
    }
    assert_eq!(config.loggers["master"].level, Level::INFO);
    assert_eq!(config.loggers["main"].level, Level::DEBUG);
    assert_eq!(config.loggers_using("console"), vec!["main", "master"]);

    let console = &config.handlers["console"];
    assert_eq!(console.class, HandlerClass::Stream);
    assert_eq!(console.stream, Some(StreamTarget::Stdout));

    let rotating = &config.handlers["rotating_file"];
    assert_eq!(rotating.class, HandlerClass::RotatingFile);
    assert!(rotating.max_bytes.unwrap() > 0);
    assert!(rotating.backup_count.unwrap() >= 0);
    assert!(rotating.is_delayed());
}

#[test]
fn test_shipped_document_references_resolve() {
    let config = load_config(&common::shipped_config_path()).unwrap();
    for handler in config.handlers.values() {
        assert!(config.formatters.contains_key(&handler.formatter));
    }
    for logger in config.loggers.values() {
        for handler in &logger.handlers {
            assert!(config.handlers.contains_key(handler));
        }
    }
}

#[test]
fn test_shipped_document_builds() {
    // Both file handlers are delayed, so nothing is opened here.
    let config = load_config(&common::shipped_config_path()).unwrap();
    let system = LogSystem::build(&config).unwrap();

    assert_eq!(system.logger_names(), vec!["main", "master"]);
    assert_eq!(system.handler_names("master").unwrap(), vec!["console", "file"]);
    assert_eq!(system.handler_names("main").unwrap(), vec!["console", "rotating_file"]);
    assert_eq!(system.resolve("master.engine"), Some("master"));
    assert_eq!(system.effective_level("main"), Some(Level::DEBUG));
}

#[test]
fn test_round_trip_all_formats() {
    let original = load_config(&common::shipped_config_path()).unwrap();

    for format in [DocumentFormat::Yaml, DocumentFormat::Toml, DocumentFormat::Json] {
        let text = to_document(&original, format).unwrap();
        let reloaded = parse_config(&text, format).unwrap();
        assert_eq!(reloaded, original, "round trip through {}", format);
    }
}

#[test]
fn test_canonical_yaml_spelling() {
    let config = load_config(&common::shipped_config_path()).unwrap();
    let text = to_document(&config, DocumentFormat::Yaml).unwrap();
    assert!(text.contains("propagate: false"));
    assert!(!text.contains("propogate"));
    assert!(text.contains("class: rotating-file"));
    assert!(text.contains("maxBytes: 1048576"));
}

#[test]
fn test_load_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logging.toml");
    fs::write(
        &path,
        r#"
version = 1
retain_logs_days = 7

[formatters.plain]
format = "%(message)s"

[handlers.console]
class = "stream"
formatter = "plain"
stream = "stdout"

[loggers.worker]
level = "WARNING"
handlers = ["console"]
propogate = false
"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.retain_logs_days, 7);
    assert_eq!(config.loggers["worker"].level, Level::WARNING);
    assert!(!config.loggers["worker"].propagate);
}

#[test]
fn test_all_validation_errors_reported() {
    let doc = r#"
version: 1
formatters:
  plain:
    format: "%(message)s"
handlers:
  console:
    class: stream
    formatter: fancy
  rolling:
    class: rotating-file
    formatter: plain
    filename: app.log
    maxBytes: 0
    backupCount: -2
loggers:
  master:
    level: 20
    handlers: [console, missing]
"#;
    let err = parse_config(doc, DocumentFormat::Yaml).unwrap_err();
    let errors = match err {
        ConfigError::Validation(errors) => errors,
        other => panic!("expected validation failure, got {other}"),
    };
    assert_eq!(errors.len(), 4);
    assert!(errors.contains(&ValidationError::UnknownFormatter {
        handler: "console".into(),
        formatter: "fancy".into(),
    }));
    assert!(errors.contains(&ValidationError::UnknownHandler {
        logger: "master".into(),
        handler: "missing".into(),
    }));
    assert!(errors.contains(&ValidationError::NegativeBackupCount {
        handler: "rolling".into(),
        value: -2,
    }));
}

#[test]
fn test_both_propagate_spellings_rejected() {
    let doc = r#"
version: 1
loggers:
  master:
    level: 20
    propagate: true
    propogate: false
"#;
    assert!(matches!(
        parse_config(doc, DocumentFormat::Yaml),
        Err(ConfigError::Yaml(_))
    ));
}

#[test]
fn test_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logging.ini");
    fs::write(&path, "[loggers]").unwrap();
    assert!(matches!(load_config(&path), Err(ConfigError::UnsupportedFormat(_))));
}
