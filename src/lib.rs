//! Declarative logging configuration: load, validate and apply a logging
//! document (formatters, handlers, loggers) to a `tracing` subscriber.

pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::schema::LoggingConfig;
pub use config::{load_config, Level};
pub use lifecycle::{start_session, Session, SessionOptions};
pub use observability::{init, LogSystem};
