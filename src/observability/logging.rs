//! Structured logging.
//!
//! # Responsibilities
//! - Build the runtime logger tree from a validated configuration
//! - Route records to handlers with level and propagation rules
//! - Bridge `tracing` events into the tree as a subscriber layer
//!
//! # Design Decisions
//! - The tree is immutable once built and shared via `Arc`
//! - Logger names are dotted; `tracing` targets use `::`, read as `.`
//! - Setup fails fast on any I/O error for eagerly opened files

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::panic::Location;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::field::{Field, Visit};
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::config::schema::{LoggerConfig, LoggingConfig};
use crate::config::validation::{validate_config, ROOT_LOGGER};
use crate::config::{ConfigError, Level};
use crate::observability::format::Formatter;
use crate::observability::handlers::Handler;
use crate::observability::record::{LogRecord, MODULE_SCOPE};

/// Errors raised while building or installing the logging system.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("formatter '{name}': {reason}")]
    Formatter { name: String, reason: String },

    #[error("handler '{handler}' cannot open '{}': {source}", .path.display())]
    Io {
        handler: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("a global logging subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// One handler that failed to write a record.
#[derive(Debug)]
pub struct HandlerFailure {
    pub handler: String,
    pub source: io::Error,
}

/// Handlers that failed while emitting a record.
#[derive(Debug, Error)]
#[error("{} handler(s) failed: {}", .failures.len(), describe(.failures))]
pub struct DispatchError {
    pub failures: Vec<HandlerFailure>,
}

fn describe(failures: &[HandlerFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.handler, f.source))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A configured logger in the runtime tree.
#[derive(Debug)]
struct LoggerNode {
    name: String,
    level: Level,
    handlers: Vec<Arc<Handler>>,
    propagate: bool,
    parent: Option<usize>,
}

/// Where a record starts its walk up the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Node(usize),
    Root,
}

/// The applied logging configuration.
pub struct LogSystem {
    nodes: Vec<LoggerNode>,
    index: BTreeMap<String, usize>,
    root: Option<LoggerNode>,
    handlers: BTreeMap<String, Arc<Handler>>,
    disable_existing: bool,
}

impl LogSystem {
    /// Validate `config` and build the runtime tree.
    pub fn build(config: &LoggingConfig) -> Result<Self, SetupError> {
        validate_config(config).map_err(|e| SetupError::Config(ConfigError::Validation(e)))?;

        let mut formatters = BTreeMap::new();
        for (name, fc) in &config.formatters {
            let formatter = Formatter::new(name, &fc.format, fc.datefmt.as_deref()).map_err(|e| {
                SetupError::Formatter { name: name.clone(), reason: e.to_string() }
            })?;
            formatters.insert(name.clone(), Arc::new(formatter));
        }

        let mut handlers = BTreeMap::new();
        for (name, hc) in &config.handlers {
            let formatter = formatters
                .get(&hc.formatter)
                .cloned()
                .ok_or_else(|| SetupError::Formatter {
                    name: hc.formatter.clone(),
                    reason: format!("not defined, referenced by handler '{}'", name),
                })?;
            let handler = Handler::from_config(name, hc, formatter).map_err(|source| {
                SetupError::Io {
                    handler: name.clone(),
                    path: hc.filename.clone().unwrap_or_default(),
                    source,
                }
            })?;
            handlers.insert(name.clone(), Arc::new(handler));
        }

        let make_node = |name: &str, lc: &LoggerConfig| LoggerNode {
            name: name.to_string(),
            level: lc.level,
            handlers: lc
                .handlers
                .iter()
                .filter_map(|h| handlers.get(h).cloned())
                .collect(),
            propagate: lc.propagate,
            parent: None,
        };

        let mut nodes: Vec<LoggerNode> = config
            .loggers
            .iter()
            .map(|(name, lc)| make_node(name, lc))
            .collect();
        let root = config.root.as_ref().map(|lc| make_node(ROOT_LOGGER, lc));

        let index: BTreeMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.clone(), i))
            .collect();
        for node in nodes.iter_mut() {
            node.parent = parent_name(&node.name).and_then(|p| lookup(&index, p));
        }

        tracing::debug!(
            loggers = nodes.len(),
            handlers = handlers.len(),
            root = root.is_some(),
            "Logging system built"
        );

        Ok(Self {
            nodes,
            index,
            root,
            handlers,
            disable_existing: config.disable_existing_loggers,
        })
    }

    /// Names of the configured loggers, sorted.
    pub fn logger_names(&self) -> Vec<&str> {
        self.index.keys().map(String::as_str).collect()
    }

    /// Names of the handlers attached to `logger`, in emission order.
    pub fn handler_names(&self, logger: &str) -> Option<Vec<&str>> {
        let node = if logger == ROOT_LOGGER {
            self.root.as_ref()?
        } else {
            &self.nodes[*self.index.get(logger)?]
        };
        Some(node.handlers.iter().map(|h| h.name.as_str()).collect())
    }

    /// Handler configured under `name`.
    pub fn handler(&self, name: &str) -> Option<&Arc<Handler>> {
        self.handlers.get(name)
    }

    /// Configured logger a record emitted on `name` starts at, if any.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        match self.position(name)? {
            Position::Node(i) => Some(&self.nodes[i].name),
            Position::Root => self.root.as_ref().map(|r| r.name.as_str()),
        }
    }

    fn position(&self, name: &str) -> Option<Position> {
        if name == ROOT_LOGGER {
            return self.root.as_ref().map(|_| Position::Root);
        }
        match lookup(&self.index, name) {
            Some(i) => Some(Position::Node(i)),
            None if self.disable_existing => None,
            None => self.root.as_ref().map(|_| Position::Root),
        }
    }

    fn node(&self, pos: Position) -> Option<&LoggerNode> {
        match pos {
            Position::Node(i) => self.nodes.get(i),
            Position::Root => self.root.as_ref(),
        }
    }

    fn next(&self, pos: Position) -> Option<Position> {
        match pos {
            Position::Node(i) => match self.nodes[i].parent {
                Some(p) => Some(Position::Node(p)),
                None => self.root.as_ref().map(|_| Position::Root),
            },
            Position::Root => None,
        }
    }

    /// Level below which records on `name` are discarded.
    pub fn effective_level(&self, name: &str) -> Option<Level> {
        let mut pos = self.position(name);
        while let Some(p) = pos {
            let node = self.node(p)?;
            if node.level.is_set() {
                return Some(node.level);
            }
            pos = self.next(p);
        }
        self.position(name).map(|_| Level::WARNING)
    }

    /// True if a record at `level` on `name` would reach any logger.
    pub fn is_enabled_for(&self, name: &str, level: Level) -> bool {
        self.effective_level(name).is_some_and(|threshold| level >= threshold)
    }

    /// Route `record` through its logger and, while propagation allows,
    /// through each ancestor. Every handler is attempted even if an
    /// earlier one fails.
    pub fn dispatch(&self, record: &LogRecord) -> Result<(), DispatchError> {
        if !self.is_enabled_for(&record.logger, record.level) {
            return Ok(());
        }

        let mut failures = Vec::new();
        let mut pos = self.position(&record.logger);
        while let Some(p) = pos {
            let node = match self.node(p) {
                Some(node) => node,
                None => break,
            };
            for handler in node.handlers.iter().filter(|h| h.accepts(record.level)) {
                if let Err(source) = handler.emit(record) {
                    failures.push(HandlerFailure { handler: handler.name.clone(), source });
                }
            }
            if !node.propagate {
                break;
            }
            pos = self.next(p);
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError { failures })
        }
    }

    /// Emit `message` on `logger`, recording the caller's location.
    #[track_caller]
    pub fn log(
        &self,
        logger: &str,
        level: Level,
        message: impl Into<String>,
    ) -> Result<(), DispatchError> {
        let caller = Location::caller();
        let record = LogRecord::new(logger, level, message).with_location(caller.file(), caller.line());
        self.dispatch(&record)
    }

    /// Flush every handler.
    pub fn flush(&self) -> io::Result<()> {
        for handler in self.handlers.values() {
            handler.flush()?;
        }
        Ok(())
    }

    /// Print each failing handler to stderr the first time it fails.
    /// Returns the handlers reported by this call.
    fn report(&self, err: DispatchError) -> Vec<String> {
        let mut reported = Vec::new();
        for failure in err.failures {
            let first = self
                .handlers
                .get(&failure.handler)
                .map(|h| h.mark_failed())
                .unwrap_or(true);
            if first {
                // Last resort: the logging system cannot log its own failure.
                eprintln!(
                    "--- Logging error --- handler '{}': {}",
                    failure.handler, failure.source
                );
                reported.push(failure.handler);
            }
        }
        reported
    }
}

impl fmt::Debug for LogSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSystem")
            .field("loggers", &self.logger_names())
            .field("root", &self.root.is_some())
            .field("disable_existing", &self.disable_existing)
            .finish()
    }
}

fn parent_name(name: &str) -> Option<&str> {
    name.rfind('.').map(|i| &name[..i])
}

/// Longest configured dotted prefix of `name`.
fn lookup(index: &BTreeMap<String, usize>, name: &str) -> Option<usize> {
    let mut candidate = name;
    loop {
        if let Some(i) = index.get(candidate) {
            return Some(*i);
        }
        candidate = parent_name(candidate)?;
    }
}

/// Logger name for a `tracing` target.
pub fn logger_name(target: &str) -> String {
    target.replace("::", ".")
}

/// `tracing` layer feeding events into a [`LogSystem`].
#[derive(Debug, Clone)]
pub struct LogLayer {
    system: Arc<LogSystem>,
}

impl LogLayer {
    pub fn new(system: Arc<LogSystem>) -> Self {
        Self { system }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields.join(" "),
            (false, false) => format!("{} {}", self.message, self.fields.join(" ")),
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

impl<S> Layer<S> for LogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        self.system
            .is_enabled_for(&logger_name(metadata.target()), Level::from(metadata.level()))
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let func_name = ctx
            .event_span(event)
            .map(|span| span.name().to_string())
            .unwrap_or_else(|| MODULE_SCOPE.to_string());

        let record = LogRecord::new(
            logger_name(metadata.target()),
            Level::from(metadata.level()),
            visitor.finish(),
        )
        .with_location(metadata.file().unwrap_or_default(), metadata.line().unwrap_or(0))
        .with_func_name(func_name);

        if let Err(err) = self.system.dispatch(&record) {
            self.system.report(err);
        }
    }
}

/// Build `config` and install it as the global `tracing` subscriber.
///
/// The configuration applies for the rest of the process; a second call
/// fails with [`SetupError::AlreadyInitialized`].
pub fn init(config: &LoggingConfig) -> Result<Arc<LogSystem>, SetupError> {
    let system = Arc::new(LogSystem::build(config)?);
    tracing_subscriber::registry()
        .with(LogLayer::new(system.clone()))
        .try_init()
        .map_err(|e| SetupError::AlreadyInitialized(e.to_string()))?;
    Ok(system)
}
