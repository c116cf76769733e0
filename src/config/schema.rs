//! Configuration schema definitions.
//!
//! This module defines the complete structure of a logging document.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::level::Level;

/// Root of a logging configuration document.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Schema version. Only `1` is understood.
    pub version: u32,

    /// Drop records from loggers the document does not name.
    #[serde(default = "default_disable_existing")]
    pub disable_existing_loggers: bool,

    /// Days of session logs to keep on disk.
    #[serde(default = "default_retain_days")]
    pub retain_logs_days: u32,

    /// Named output templates.
    #[serde(default)]
    pub formatters: BTreeMap<String, FormatterConfig>,

    /// Named sinks.
    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerConfig>,

    /// Named logging channels.
    #[serde(default)]
    pub loggers: BTreeMap<String, LoggerConfig>,

    /// Fallback logger for propagated and unconfigured records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<LoggerConfig>,
}

fn default_disable_existing() -> bool {
    true
}

fn default_retain_days() -> u32 {
    1
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            version: 1,
            disable_existing_loggers: default_disable_existing(),
            retain_logs_days: default_retain_days(),
            formatters: BTreeMap::new(),
            handlers: BTreeMap::new(),
            loggers: BTreeMap::new(),
            root: None,
        }
    }
}

impl LoggingConfig {
    /// Names of the loggers that list `handler`.
    pub fn loggers_using(&self, handler: &str) -> Vec<&str> {
        self.loggers
            .iter()
            .filter(|(_, logger)| logger.handlers.iter().any(|h| h == handler))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Output template for a record.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FormatterConfig {
    /// Percent-style template, e.g. `%(levelname)s: %(message)s`.
    pub format: String,

    /// strftime-style format for `%(asctime)s`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datefmt: Option<String>,
}

/// Sink kind.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum HandlerClass {
    #[serde(rename = "stream", alias = "logging.StreamHandler")]
    Stream,
    #[serde(rename = "file", alias = "logging.FileHandler")]
    File,
    #[serde(rename = "rotating-file", alias = "logging.handlers.RotatingFileHandler")]
    RotatingFile,
}

impl HandlerClass {
    pub fn writes_file(&self) -> bool {
        matches!(self, HandlerClass::File | HandlerClass::RotatingFile)
    }
}

/// Console stream a stream handler writes to.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
pub enum StreamTarget {
    #[serde(rename = "stdout", alias = "ext://sys.stdout")]
    Stdout,
    #[default]
    #[serde(rename = "stderr", alias = "ext://sys.stderr")]
    Stderr,
}

/// How a file sink opens its file.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
pub enum FileMode {
    #[default]
    #[serde(rename = "a", alias = "append")]
    Append,
    #[serde(rename = "w", alias = "write")]
    Truncate,
}

/// Sink definition.
///
/// Numeric sizes are kept signed so that validation, not the parser,
/// reports out-of-range values.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HandlerConfig {
    pub class: HandlerClass,

    /// Name of the formatter used to render records.
    pub formatter: String,

    /// Records below this level are ignored by this handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamTarget>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<FileMode>,

    /// Open the file on first write instead of at setup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<bool>,

    /// Rotate once the file would reach this many bytes.
    #[serde(rename = "maxBytes", default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<i64>,

    /// Number of rotated files to keep.
    #[serde(rename = "backupCount", default, skip_serializing_if = "Option::is_none")]
    pub backup_count: Option<i64>,
}

impl HandlerConfig {
    /// A stream handler with no optional fields set.
    pub fn stream(formatter: &str) -> Self {
        Self {
            class: HandlerClass::Stream,
            formatter: formatter.to_string(),
            level: None,
            stream: None,
            filename: None,
            mode: None,
            delay: None,
            max_bytes: None,
            backup_count: None,
        }
    }

    /// A plain file handler.
    pub fn file(formatter: &str, filename: impl Into<PathBuf>) -> Self {
        Self {
            class: HandlerClass::File,
            filename: Some(filename.into()),
            ..Self::stream(formatter)
        }
    }

    /// A size-rotating file handler.
    pub fn rotating_file(
        formatter: &str,
        filename: impl Into<PathBuf>,
        max_bytes: i64,
        backup_count: i64,
    ) -> Self {
        Self {
            class: HandlerClass::RotatingFile,
            filename: Some(filename.into()),
            max_bytes: Some(max_bytes),
            backup_count: Some(backup_count),
            ..Self::stream(formatter)
        }
    }

    pub fn is_delayed(&self) -> bool {
        self.delay.unwrap_or(false)
    }
}

/// Logging channel definition.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggerConfig {
    /// Minimum severity; NOTSET defers to the parent logger.
    #[serde(default)]
    pub level: Level,

    /// Handler names, in emission order.
    #[serde(default)]
    pub handlers: Vec<String>,

    /// Pass records on to the parent logger after local handlers ran.
    /// The shipped document spells this key `propogate`; both are read.
    #[serde(default = "default_propagate", alias = "propogate")]
    pub propagate: bool,
}

fn default_propagate() -> bool {
    true
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: Level::NOTSET,
            handlers: Vec::new(),
            propagate: default_propagate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.version, 1);
        assert!(config.disable_existing_loggers);
        assert_eq!(config.retain_logs_days, 1);
        assert!(config.root.is_none());
    }

    #[test]
    fn test_propagate_spellings() {
        let a: LoggerConfig =
            serde_json::from_str(r#"{"level": 20, "handlers": ["console"], "propogate": false}"#)
                .unwrap();
        let b: LoggerConfig =
            serde_json::from_str(r#"{"level": 20, "handlers": ["console"], "propagate": false}"#)
                .unwrap();
        assert_eq!(a, b);
        assert!(!a.propagate);

        let missing: LoggerConfig = serde_json::from_str(r#"{"level": 20}"#).unwrap();
        assert!(missing.propagate);
    }

    #[test]
    fn test_handler_class_aliases() {
        let class: HandlerClass =
            serde_json::from_str("\"logging.handlers.RotatingFileHandler\"").unwrap();
        assert_eq!(class, HandlerClass::RotatingFile);
        assert_eq!(serde_json::to_string(&class).unwrap(), "\"rotating-file\"");

        let stream: StreamTarget = serde_json::from_str("\"ext://sys.stdout\"").unwrap();
        assert_eq!(stream, StreamTarget::Stdout);
    }

    #[test]
    fn test_unknown_handler_field_rejected() {
        let res = serde_json::from_str::<HandlerConfig>(
            r#"{"class": "file", "formatter": "f", "filename": "a.log", "maxbytes": 10}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_loggers_using() {
        let mut config = LoggingConfig::default();
        config.loggers.insert(
            "a".into(),
            LoggerConfig { handlers: vec!["console".into()], ..Default::default() },
        );
        config.loggers.insert(
            "b".into(),
            LoggerConfig { handlers: vec!["file".into(), "console".into()], ..Default::default() },
        );
        assert_eq!(config.loggers_using("console"), vec!["a", "b"]);
        assert_eq!(config.loggers_using("file"), vec!["b"]);
    }
}
