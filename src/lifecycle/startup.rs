//! Session start-up.
//!
//! # Responsibilities
//! - Pick a fresh per-run log file in the log directory
//! - Point the primary logger's file handlers at it
//! - Apply the configuration and write the session header
//! - Prune session logs older than the retention window
//!
//! # Design Decisions
//! - Fail fast: any start-up error is fatal
//! - Header and pruning messages go through the primary logger, so they
//!   land in the session log like any other record

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use thiserror::Error;

use crate::config::schema::LoggingConfig;
use crate::config::{load_config, ConfigError, Level};
use crate::lifecycle::retention::remove_expired_logs;
use crate::observability::{init, DispatchError, LogSystem, SetupError};

/// Logger that receives header and housekeeping records by default.
pub const DEFAULT_PRIMARY_LOGGER: &str = "master";

/// Errors raised while starting a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("logger '{0}' is not defined in the logging configuration")]
    UnknownLogger(String),
}

/// Inputs of a session start-up.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub config_path: PathBuf,
    pub log_dir: PathBuf,
    pub primary_logger: String,
    pub header: Vec<String>,
}

impl SessionOptions {
    pub fn new(config_path: impl Into<PathBuf>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            log_dir: log_dir.into(),
            primary_logger: DEFAULT_PRIMARY_LOGGER.to_string(),
            header: Vec::new(),
        }
    }

    pub fn with_logger(mut self, logger: impl Into<String>) -> Self {
        self.primary_logger = logger.into();
        self
    }

    pub fn with_header<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header = lines.into_iter().map(Into::into).collect();
        self
    }
}

/// First unused `YYYY-MM-DD_NNN.log` path in `log_dir`.
pub fn session_log_path(log_dir: &Path, date: NaiveDate) -> PathBuf {
    let tag = date.format("%Y-%m-%d");
    let mut nth = 1u32;
    loop {
        let candidate = log_dir.join(format!("{}_{:03}.log", tag, nth));
        if !candidate.exists() {
            return candidate;
        }
        nth += 1;
    }
}

/// Point every file-writing handler of `logger` at `path`, opened eagerly
/// so the session file exists from start-up on.
///
/// A handler that other loggers also list is left untouched for them; the
/// primary logger gets a redirected copy named `<handler>@<logger>`.
/// Returns the names of the redirected handlers as listed by `logger`.
pub fn redirect_file_handlers(
    config: &mut LoggingConfig,
    logger: &str,
    path: &Path,
) -> Result<Vec<String>, SessionError> {
    let names = config
        .loggers
        .get(logger)
        .ok_or_else(|| SessionError::UnknownLogger(logger.to_string()))?
        .handlers
        .clone();

    let mut listed = Vec::with_capacity(names.len());
    let mut redirected = Vec::new();
    for name in names {
        let mut handler = match config.handlers.get(&name) {
            Some(handler) if handler.class.writes_file() => handler.clone(),
            _ => {
                listed.push(name);
                continue;
            }
        };
        handler.filename = Some(path.to_path_buf());
        handler.delay = None;

        let shared = config.loggers_using(&name).iter().any(|user| *user != logger)
            || config.root.as_ref().is_some_and(|root| root.handlers.contains(&name));
        let target = if shared { format!("{}@{}", name, logger) } else { name };
        config.handlers.insert(target.clone(), handler);
        listed.push(target.clone());
        redirected.push(target);
    }

    if let Some(primary) = config.loggers.get_mut(logger) {
        primary.handlers = listed;
    }
    Ok(redirected)
}

/// Load the document and retarget it at a fresh session log.
pub fn prepare_session(
    options: &SessionOptions,
    today: NaiveDate,
) -> Result<(LoggingConfig, PathBuf), SessionError> {
    let mut config = load_config(&options.config_path)?;

    fs::create_dir_all(&options.log_dir).map_err(|source| SessionError::Io {
        path: options.log_dir.clone(),
        source,
    })?;
    let log_path = session_log_path(&options.log_dir, today);
    redirect_file_handlers(&mut config, &options.primary_logger, &log_path)?;

    Ok((config, log_path))
}

/// A running logging session.
#[derive(Debug)]
pub struct Session {
    system: Arc<LogSystem>,
    log_path: PathBuf,
    primary_logger: String,
    removed: Vec<PathBuf>,
}

impl Session {
    /// Start a session without installing a global subscriber.
    pub fn open(options: &SessionOptions, today: NaiveDate) -> Result<Self, SessionError> {
        let (config, log_path) = prepare_session(options, today)?;
        let system = Arc::new(LogSystem::build(&config)?);
        Self::begin(system, &config, options, log_path, today)
    }

    fn begin(
        system: Arc<LogSystem>,
        config: &LoggingConfig,
        options: &SessionOptions,
        log_path: PathBuf,
        today: NaiveDate,
    ) -> Result<Self, SessionError> {
        write_header(&system, &options.primary_logger, &options.header)?;
        let removed = remove_expired_logs(
            &system,
            &options.primary_logger,
            &options.log_dir,
            config.retain_logs_days,
            today,
        )?;
        Ok(Self {
            system,
            log_path,
            primary_logger: options.primary_logger.clone(),
            removed,
        })
    }

    pub fn system(&self) -> &Arc<LogSystem> {
        &self.system
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn primary_logger(&self) -> &str {
        &self.primary_logger
    }

    /// Expired logs deleted during start-up.
    pub fn removed(&self) -> &[PathBuf] {
        &self.removed
    }

    /// Record the exit code and flush every handler.
    pub fn shutdown(&self, exit_code: i32) -> Result<(), SessionError> {
        self.system.log(
            &self.primary_logger,
            Level::INFO,
            format!("=== System shutdown with return code: {} ===", exit_code),
        )?;
        self.system.flush().map_err(|source| SessionError::Io {
            path: self.log_path.clone(),
            source,
        })
    }
}

/// Start a session and install it as the global `tracing` subscriber.
pub fn start_session(options: &SessionOptions) -> Result<Session, SessionError> {
    let today = Local::now().date_naive();
    let (config, log_path) = prepare_session(options, today)?;
    let system = init(&config)?;
    Session::begin(system, &config, options, log_path, today)
}

fn write_header(system: &LogSystem, logger: &str, header: &[String]) -> Result<(), SessionError> {
    for (nth, line) in header.iter().enumerate() {
        if nth + 1 == header.len() {
            system.log(logger, Level::INFO, format!("{}\n", line))?;
        } else {
            system.log(logger, Level::INFO, line.as_str())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{HandlerConfig, LoggerConfig};

    #[test]
    fn test_session_log_path_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2023, 1, 17).unwrap();

        let first = session_log_path(dir.path(), date);
        assert_eq!(first, dir.path().join("2023-01-17_001.log"));

        fs::write(&first, "").unwrap();
        fs::write(dir.path().join("2023-01-17_002.log"), "").unwrap();
        assert_eq!(session_log_path(dir.path(), date), dir.path().join("2023-01-17_003.log"));
    }

    #[test]
    fn test_redirect_file_handlers() {
        let mut config = LoggingConfig::default();
        config.handlers.insert("console".into(), HandlerConfig::stream("plain"));
        let mut file = HandlerConfig::file("plain", "logs/app.log");
        file.delay = Some(true);
        config.handlers.insert("file".into(), file);
        config.loggers.insert(
            "master".into(),
            LoggerConfig {
                handlers: vec!["console".into(), "file".into()],
                ..Default::default()
            },
        );

        let target = Path::new("logs/2023-01-17_001.log");
        let redirected = redirect_file_handlers(&mut config, "master", target).unwrap();
        assert_eq!(redirected, vec!["file"]);
        assert_eq!(config.handlers["file"].filename.as_deref(), Some(target));
        assert!(!config.handlers["file"].is_delayed());
        assert!(config.handlers["console"].filename.is_none());

        assert!(matches!(
            redirect_file_handlers(&mut config, "worker", target),
            Err(SessionError::UnknownLogger(_))
        ));
    }

    #[test]
    fn test_redirect_keeps_shared_handler_for_other_loggers() {
        let mut config = LoggingConfig::default();
        config.handlers.insert("file".into(), HandlerConfig::file("plain", "logs/app.log"));
        for name in ["master", "main"] {
            config.loggers.insert(
                name.into(),
                LoggerConfig { handlers: vec!["file".into()], ..Default::default() },
            );
        }

        let target = Path::new("logs/2023-01-17_001.log");
        let redirected = redirect_file_handlers(&mut config, "master", target).unwrap();

        assert_eq!(redirected, vec!["file@master"]);
        assert_eq!(config.loggers["master"].handlers, vec!["file@master"]);
        assert_eq!(config.loggers["main"].handlers, vec!["file"]);
        assert_eq!(config.handlers["file@master"].filename.as_deref(), Some(target));
        assert_eq!(
            config.handlers["file"].filename.as_deref(),
            Some(Path::new("logs/app.log"))
        );
    }
}
