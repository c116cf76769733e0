//! Observability subsystem: the runtime side of a logging document.
//!
//! # Data Flow
//! ```text
//! tracing event / LogSystem::log
//!     → logging.rs (resolve logger, level check, propagation)
//!     → handlers.rs (per-handler threshold, sink write)
//!     → format.rs (template rendering)
//!     → rotation.rs (size-based rollover for rotating files)
//! ```
//!
//! # Design Decisions
//! - Formatters are compiled once at build time
//! - Sinks own their file handles; writes are serialized per sink
//! - Delayed files surface I/O errors on first write, others at build

pub mod format;
pub mod handlers;
pub mod logging;
pub mod record;
pub mod rotation;

pub use format::{Formatter, Template, TemplateError};
pub use handlers::{FileSink, Handler, Sink, StreamSink};
pub use logging::{init, DispatchError, LogLayer, LogSystem, SetupError};
pub use record::LogRecord;
