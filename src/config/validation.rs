//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (handlers reference formatters, loggers
//!   reference handlers)
//! - Validate value ranges (rotation sizes, backup counts)
//! - Reject fields that do not apply to a handler's class
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LoggingConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{HandlerClass, HandlerConfig, LoggerConfig, LoggingConfig};
use crate::observability::format::{check_datefmt, Template};

/// Name reported for the `root` logger.
pub const ROOT_LOGGER: &str = "root";

/// A single semantic problem in a logging document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unsupported version {0}, expected 1")]
    UnsupportedVersion(u32),

    #[error("handler '{handler}' references unknown formatter '{formatter}'")]
    UnknownFormatter { handler: String, formatter: String },

    #[error("logger '{logger}' references unknown handler '{handler}'")]
    UnknownHandler { logger: String, handler: String },

    #[error("logger '{logger}' lists handler '{handler}' more than once")]
    DuplicateHandler { logger: String, handler: String },

    #[error("handler '{0}' writes to a file but has no filename")]
    MissingFilename(String),

    #[error("rotating handler '{handler}' needs maxBytes > 0, got {value:?}")]
    InvalidMaxBytes { handler: String, value: Option<i64> },

    #[error("handler '{handler}' has negative backupCount {value}")]
    NegativeBackupCount { handler: String, value: i64 },

    #[error("field '{field}' does not apply to handler '{handler}'")]
    FieldNotApplicable { handler: String, field: &'static str },

    #[error("formatter '{formatter}' has an invalid format: {reason}")]
    InvalidFormat { formatter: String, reason: String },

    #[error("formatter '{formatter}' has an invalid datefmt: {reason}")]
    InvalidDateFormat { formatter: String, reason: String },
}

/// Validate `config`, collecting every problem found.
pub fn validate_config(config: &LoggingConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.version != 1 {
        errors.push(ValidationError::UnsupportedVersion(config.version));
    }

    for (name, formatter) in &config.formatters {
        if let Err(e) = Template::parse(&formatter.format) {
            errors.push(ValidationError::InvalidFormat {
                formatter: name.clone(),
                reason: e.to_string(),
            });
        }
        if let Some(datefmt) = &formatter.datefmt {
            if let Err(reason) = check_datefmt(datefmt) {
                errors.push(ValidationError::InvalidDateFormat {
                    formatter: name.clone(),
                    reason,
                });
            }
        }
    }

    for (name, handler) in &config.handlers {
        if !config.formatters.contains_key(&handler.formatter) {
            errors.push(ValidationError::UnknownFormatter {
                handler: name.clone(),
                formatter: handler.formatter.clone(),
            });
        }
        check_handler_fields(name, handler, &mut errors);
    }

    for (name, logger) in &config.loggers {
        check_logger(name, logger, config, &mut errors);
    }
    if let Some(root) = &config.root {
        check_logger(ROOT_LOGGER, root, config, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_handler_fields(name: &str, handler: &HandlerConfig, errors: &mut Vec<ValidationError>) {
    let mut not_applicable = |field: &'static str| {
        errors.push(ValidationError::FieldNotApplicable {
            handler: name.to_string(),
            field,
        });
    };

    match handler.class {
        HandlerClass::Stream => {
            if handler.filename.is_some() {
                not_applicable("filename");
            }
            if handler.delay.is_some() {
                not_applicable("delay");
            }
            if handler.mode.is_some() {
                not_applicable("mode");
            }
            if handler.max_bytes.is_some() {
                not_applicable("maxBytes");
            }
            if handler.backup_count.is_some() {
                not_applicable("backupCount");
            }
        }
        HandlerClass::File => {
            if handler.stream.is_some() {
                not_applicable("stream");
            }
            if handler.max_bytes.is_some() {
                not_applicable("maxBytes");
            }
            if handler.backup_count.is_some() {
                not_applicable("backupCount");
            }
        }
        HandlerClass::RotatingFile => {
            if handler.stream.is_some() {
                not_applicable("stream");
            }
        }
    }

    if handler.class.writes_file() && handler.filename.is_none() {
        errors.push(ValidationError::MissingFilename(name.to_string()));
    }

    if handler.class == HandlerClass::RotatingFile {
        if !handler.max_bytes.is_some_and(|n| n > 0) {
            errors.push(ValidationError::InvalidMaxBytes {
                handler: name.to_string(),
                value: handler.max_bytes,
            });
        }
        if let Some(count) = handler.backup_count.filter(|n| *n < 0) {
            errors.push(ValidationError::NegativeBackupCount {
                handler: name.to_string(),
                value: count,
            });
        }
    }
}

fn check_logger(
    name: &str,
    logger: &LoggerConfig,
    config: &LoggingConfig,
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();
    for handler in &logger.handlers {
        if !config.handlers.contains_key(handler) {
            errors.push(ValidationError::UnknownHandler {
                logger: name.to_string(),
                handler: handler.clone(),
            });
        }
        if !seen.insert(handler.as_str()) {
            errors.push(ValidationError::DuplicateHandler {
                logger: name.to_string(),
                handler: handler.clone(),
            });
        }
    }
}
