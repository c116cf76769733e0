//! Output sinks and the handlers that wrap them.
//!
//! # Responsibilities
//! - Write formatted records to stdout/stderr or to a file
//! - Open files eagerly, or on first write for delayed handlers
//! - Roll files over by size
//!
//! Each file sink serializes writes through its own mutex; one record is
//! always written as a single `write_all` of the line plus terminator.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::schema::{FileMode, HandlerClass, HandlerConfig, StreamTarget};
use crate::config::Level;
use crate::observability::format::Formatter;
use crate::observability::record::LogRecord;
use crate::observability::rotation::{self, RotationPolicy};

const TERMINATOR: &str = "\n";

/// Destination for formatted lines.
pub trait Sink: Send + Sync {
    /// Write one already formatted line (without terminator).
    fn write_line(&self, line: &str) -> io::Result<()>;

    fn flush(&self) -> io::Result<()>;
}

/// Console sink.
#[derive(Debug)]
pub struct StreamSink {
    target: StreamTarget,
}

impl StreamSink {
    pub fn new(target: StreamTarget) -> Self {
        Self { target }
    }
}

impl Sink for StreamSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let buf = format!("{}{}", line, TERMINATOR);
        match self.target {
            StreamTarget::Stdout => io::stdout().lock().write_all(buf.as_bytes()),
            StreamTarget::Stderr => io::stderr().lock().write_all(buf.as_bytes()),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self.target {
            StreamTarget::Stdout => io::stdout().flush(),
            StreamTarget::Stderr => io::stderr().flush(),
        }
    }
}

/// An open file and the number of bytes it holds.
#[derive(Debug)]
struct OpenFile {
    file: File,
    size: u64,
}

fn open_file(path: &Path, mode: FileMode) -> io::Result<OpenFile> {
    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        FileMode::Append => options.append(true),
        FileMode::Truncate => options.write(true).truncate(true),
    };
    let file = options.open(path)?;
    let size = file.metadata()?.len();
    Ok(OpenFile { file, size })
}

/// File sink with optional size-based rotation.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    mode: FileMode,
    rotation: Option<RotationPolicy>,
    state: Mutex<Option<OpenFile>>,
}

impl FileSink {
    /// Create the sink; unless `delay` is set the file is opened now so
    /// that an unwritable path fails during setup.
    pub fn open(
        path: impl Into<PathBuf>,
        mode: FileMode,
        rotation: Option<RotationPolicy>,
        delay: bool,
    ) -> io::Result<Self> {
        let path = path.into();
        let state = if delay { None } else { Some(open_file(&path, mode)?) };
        Ok(Self {
            path,
            mode,
            rotation,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True once the file has been opened.
    pub fn is_open(&self) -> bool {
        self.state.lock().map(|s| s.is_some()).unwrap_or(false)
    }
}

impl Sink for FileSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let buf = format!("{}{}", line, TERMINATOR);
        let incoming = buf.len() as u64;

        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "file sink mutex poisoned"))?;

        if state.is_none() {
            *state = Some(open_file(&self.path, self.mode)?);
        }

        if let Some(policy) = self.rotation {
            let current = state.as_ref().map(|s| s.size).unwrap_or(0);
            if policy.should_rollover(current, incoming) {
                // Close before renaming.
                *state = None;
                rotation::rollover(&self.path, policy.backup_count)?;
                // Rotated files always restart empty.
                *state = Some(open_file(&self.path, FileMode::Append)?);
            }
        }

        match state.as_mut() {
            Some(open) => {
                open.file.write_all(buf.as_bytes())?;
                open.size += incoming;
                Ok(())
            }
            None => Err(io::Error::new(io::ErrorKind::Other, "log file is not open")),
        }
    }

    fn flush(&self) -> io::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "file sink mutex poisoned"))?;
        match state.as_mut() {
            Some(open) => open.file.flush(),
            None => Ok(()),
        }
    }
}

/// A configured handler: threshold, formatter and sink.
pub struct Handler {
    pub name: String,
    pub level: Level,
    formatter: Arc<Formatter>,
    sink: Box<dyn Sink>,
    failed: AtomicBool,
}

impl Handler {
    pub fn new(name: &str, level: Level, formatter: Arc<Formatter>, sink: Box<dyn Sink>) -> Self {
        Self {
            name: name.to_string(),
            level,
            formatter,
            sink,
            failed: AtomicBool::new(false),
        }
    }

    /// Build the sink described by `config`.
    pub fn from_config(
        name: &str,
        config: &HandlerConfig,
        formatter: Arc<Formatter>,
    ) -> io::Result<Self> {
        let sink: Box<dyn Sink> = match config.class {
            HandlerClass::Stream => Box::new(StreamSink::new(config.stream.unwrap_or_default())),
            HandlerClass::File | HandlerClass::RotatingFile => {
                let path = config.filename.clone().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "file handler without filename")
                })?;
                let rotation = match config.class {
                    HandlerClass::RotatingFile => Some(RotationPolicy {
                        max_bytes: config.max_bytes.unwrap_or(0).max(0) as u64,
                        backup_count: config.backup_count.unwrap_or(0).clamp(0, u32::MAX as i64)
                            as u32,
                    }),
                    _ => None,
                };
                let mode = match rotation {
                    // Truncating a rotating file would discard what it rotates.
                    Some(_) => FileMode::Append,
                    None => config.mode.unwrap_or_default(),
                };
                Box::new(FileSink::open(path, mode, rotation, config.is_delayed())?)
            }
        };
        Ok(Self::new(
            name,
            config.level.unwrap_or(Level::NOTSET),
            formatter,
            sink,
        ))
    }

    pub fn accepts(&self, level: Level) -> bool {
        level >= self.level
    }

    /// Format and write `record`.
    pub fn emit(&self, record: &LogRecord) -> io::Result<()> {
        let line = self.formatter.format(record);
        self.sink.write_line(&line)
    }

    pub fn flush(&self) -> io::Result<()> {
        self.sink.flush()
    }

    /// Mark the handler as failed; returns true the first time only.
    pub fn mark_failed(&self) -> bool {
        !self.failed.swap(true, Ordering::Relaxed)
    }

    /// True once a write failure has been reported for this handler.
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("formatter", &self.formatter.name)
            .finish()
    }
}
