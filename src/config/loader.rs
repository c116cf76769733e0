//! Configuration loading from disk.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::LoggingConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{0}' is not a YAML, TOML or JSON document")]
    UnsupportedFormat(PathBuf),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot serialize configuration: {0}")]
    Serialize(String),

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// On-disk syntax of a logging document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Toml,
    Json,
}

impl DocumentFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(DocumentFormat::Yaml),
            Some("toml") => Ok(DocumentFormat::Toml),
            Some("json") => Ok(DocumentFormat::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentFormat::Yaml => "yaml",
            DocumentFormat::Toml => "toml",
            DocumentFormat::Json => "json",
        };
        f.write_str(name)
    }
}

/// Parse and validate a document held in memory.
pub fn parse_config(content: &str, format: DocumentFormat) -> Result<LoggingConfig, ConfigError> {
    let config: LoggingConfig = match format {
        DocumentFormat::Yaml => serde_yaml::from_str(content)?,
        DocumentFormat::Toml => toml::from_str(content)?,
        DocumentFormat::Json => serde_json::from_str(content)?,
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a YAML, TOML or JSON file.
pub fn load_config(path: &Path) -> Result<LoggingConfig, ConfigError> {
    let format = DocumentFormat::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config = parse_config(&content, format)?;
    tracing::debug!(
        path = %path.display(),
        formatters = config.formatters.len(),
        handlers = config.handlers.len(),
        loggers = config.loggers.len(),
        "Logging configuration loaded"
    );
    Ok(config)
}

/// Serialize `config` back into a document.
pub fn to_document(config: &LoggingConfig, format: DocumentFormat) -> Result<String, ConfigError> {
    match format {
        DocumentFormat::Yaml => {
            serde_yaml::to_string(config).map_err(|e| ConfigError::Serialize(e.to_string()))
        }
        DocumentFormat::Toml => {
            toml::to_string(config).map_err(|e| ConfigError::Serialize(e.to_string()))
        }
        DocumentFormat::Json => {
            serde_json::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string()))
        }
    }
}
