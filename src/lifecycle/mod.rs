//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Pick session log → Redirect file handlers
//!     → Build & install → Write header
//!
//! Retention (retention.rs):
//!     Scan log dir → Remove logs older than retain_logs_days
//!
//! Shutdown (Session::shutdown):
//!     Record exit code → Flush handlers
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then sinks, then housekeeping
//! - Housekeeping runs after the header so its messages are logged

pub mod retention;
pub mod startup;

pub use retention::{expired_logs, remove_expired_logs};
pub use startup::{
    prepare_session, session_log_path, start_session, Session, SessionError, SessionOptions,
};
