//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML/TOML/JSON)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → LoggingConfig (validated, immutable)
//!     → observability::LogSystem::build
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload path
//! - Optional fields have defaults to allow minimal documents
//! - Validation separates syntactic (serde) from semantic checks

pub mod level;
pub mod loader;
pub mod schema;
pub mod validation;

pub use level::Level;
pub use loader::{load_config, parse_config, to_document, ConfigError, DocumentFormat};
pub use schema::{
    FileMode, FormatterConfig, HandlerClass, HandlerConfig, LoggerConfig, LoggingConfig,
    StreamTarget,
};
pub use validation::{validate_config, ValidationError};
