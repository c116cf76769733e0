//! Removal of expired session logs.
//!
//! Session logs are named `YYYY-MM-DD_NNN.log`; the date prefix decides
//! their age. Files without a parsable prefix are never touched.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};

use crate::config::Level;
use crate::lifecycle::startup::SessionError;
use crate::observability::LogSystem;

/// Extension of files considered for removal.
const LOG_EXTENSION: &str = "log";

/// Date encoded in a session log name, if any.
pub fn log_date(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    let token = stem.split('_').next()?;
    NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()
}

/// Session logs in `log_dir` dated before `today - max(1, retain_days)`.
pub fn expired_logs(
    log_dir: &Path,
    retain_days: u32,
    today: NaiveDate,
) -> Result<Vec<PathBuf>, SessionError> {
    let threshold = today - Duration::days(i64::from(retain_days.max(1)));
    let entries = fs::read_dir(log_dir).map_err(|source| SessionError::Io {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let mut expired: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(LOG_EXTENSION))
        .filter(|path| log_date(path).is_some_and(|date| date < threshold))
        .collect();
    expired.sort();
    Ok(expired)
}

/// Delete expired session logs, reporting each step through `logger`.
///
/// A file that cannot be removed is reported at ERROR and skipped.
/// Returns the files actually removed.
pub fn remove_expired_logs(
    system: &LogSystem,
    logger: &str,
    log_dir: &Path,
    retain_days: u32,
    today: NaiveDate,
) -> Result<Vec<PathBuf>, SessionError> {
    let mut removed = Vec::new();
    for path in expired_logs(log_dir, retain_days, today)? {
        system.log(
            logger,
            Level::INFO,
            format!("Removing obsolete log file: '{}' ...", path.display()),
        )?;
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(e) => {
                system.log(
                    logger,
                    Level::ERROR,
                    format!("Cannot remove '{}': {}", path.display(), e),
                )?;
            }
        }
    }
    Ok(removed)
}
