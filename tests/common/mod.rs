//! Shared utilities for integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use logconf::config::{
    FormatterConfig, HandlerConfig, Level, LoggerConfig, LoggingConfig,
};

/// Path of the document shipped with the crate.
#[allow(dead_code)]
pub fn shipped_config_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config/log_config.yaml")
}

/// A file-only configuration writing under `dir`:
/// `master` (INFO, no propagation) → master.log,
/// `master.io` (DEBUG, propagates) → io.log,
/// root (WARNING) → root.log.
#[allow(dead_code)]
pub fn file_config(dir: &Path) -> LoggingConfig {
    let mut config = LoggingConfig::default();
    config.formatters.insert(
        "plain".into(),
        FormatterConfig { format: "%(name)s %(levelname)s %(message)s".into(), datefmt: None },
    );
    config
        .handlers
        .insert("master_file".into(), HandlerConfig::file("plain", dir.join("master.log")));
    config.handlers.insert("io_file".into(), HandlerConfig::file("plain", dir.join("io.log")));
    config
        .handlers
        .insert("root_file".into(), HandlerConfig::file("plain", dir.join("root.log")));

    config.loggers.insert(
        "master".into(),
        LoggerConfig { level: Level::INFO, handlers: vec!["master_file".into()], propagate: false },
    );
    config.loggers.insert(
        "master.io".into(),
        LoggerConfig { level: Level::DEBUG, handlers: vec!["io_file".into()], propagate: true },
    );
    config.root = Some(LoggerConfig {
        level: Level::WARNING,
        handlers: vec!["root_file".into()],
        propagate: true,
    });
    config
}

/// Lines of `path`, or nothing if the file does not exist.
#[allow(dead_code)]
pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Write a YAML logging document into `dir` whose `master` logger sends
/// records to the console and to `file_name`.
#[allow(dead_code)]
pub fn write_session_document(dir: &Path, file_name: &str, retain_days: u32) -> PathBuf {
    let doc = format!(
        r#"version: 1
disable_existing_loggers: true
retain_logs_days: {retain_days}
formatters:
  standard:
    format: "%(levelname)s - %(module)s - %(message)s"
handlers:
  console:
    class: logging.StreamHandler
    formatter: standard
    level: 50
  file:
    class: logging.FileHandler
    formatter: standard
    filename: {file}
loggers:
  master:
    level: 20
    handlers: [console, file]
    propogate: false
"#,
        retain_days = retain_days,
        file = dir.join(file_name).display()
    );
    let path = dir.join("log_config.yaml");
    fs::write(&path, doc).unwrap();
    path
}
