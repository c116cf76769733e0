//! Log records as seen by formatters and handlers.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};

use crate::config::Level;

/// Function name used when a record has no enclosing span or function.
pub const MODULE_SCOPE: &str = "<module>";

static NEXT_THREAD_NUMBER: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Process-unique number of the current thread, assigned on first use.
    static THREAD_NUMBER: u64 = NEXT_THREAD_NUMBER.fetch_add(1, Ordering::Relaxed);
}

/// A single event routed through the configured loggers.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Dotted logger name the record was emitted on.
    pub logger: String,
    pub level: Level,
    pub message: String,
    /// Source path as reported by the caller.
    pub pathname: String,
    pub lineno: u32,
    pub func_name: String,
    pub created: DateTime<Local>,
    pub process: u32,
    pub thread_id: u64,
    pub thread_name: String,
}

impl LogRecord {
    /// Create a record stamped with the current time, process and thread.
    pub fn new(logger: impl Into<String>, level: Level, message: impl Into<String>) -> Self {
        let current = std::thread::current();
        Self {
            logger: logger.into(),
            level,
            message: message.into(),
            pathname: String::new(),
            lineno: 0,
            func_name: MODULE_SCOPE.to_string(),
            created: Local::now(),
            process: std::process::id(),
            thread_id: THREAD_NUMBER.with(|n| *n),
            thread_name: current.name().unwrap_or("unnamed").to_string(),
        }
    }

    pub fn with_location(mut self, pathname: impl Into<String>, lineno: u32) -> Self {
        self.pathname = pathname.into();
        self.lineno = lineno;
        self
    }

    pub fn with_func_name(mut self, func_name: impl Into<String>) -> Self {
        self.func_name = func_name.into();
        self
    }

    /// Final path component of `pathname`.
    pub fn filename(&self) -> &str {
        Path::new(&self.pathname)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.pathname)
    }

    /// `filename` without its extension.
    pub fn module(&self) -> &str {
        Path::new(&self.pathname)
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.pathname)
    }
}
