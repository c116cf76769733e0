//! `logconf`: inspect and apply logging configuration documents.
//!
//! ```text
//! logconf check log_config.yaml
//! logconf normalize log_config.yaml --to toml
//! logconf session --config log_config.yaml --log-dir logs --header "App v1"
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logconf::config::{load_config, to_document, DocumentFormat, Level, LoggingConfig};
use logconf::lifecycle::startup::DEFAULT_PRIMARY_LOGGER;
use logconf::lifecycle::{start_session, SessionOptions};

#[derive(Parser)]
#[command(name = "logconf")]
#[command(about = "Load, validate and apply logging configuration documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a document and print a summary
    Check {
        config: PathBuf,
    },
    /// Print the canonical form of a document
    Normalize {
        config: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        to: OutputFormat,
    },
    /// Start a logging session: fresh log file, header, retention cleanup
    Session {
        #[arg(short, long)]
        config: PathBuf,

        #[arg(short, long)]
        log_dir: PathBuf,

        #[arg(long, default_value = DEFAULT_PRIMARY_LOGGER)]
        logger: String,

        /// Header line written at the start of the session (repeatable)
        #[arg(long)]
        header: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Yaml,
    Toml,
    Json,
}

impl From<OutputFormat> for DocumentFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => DocumentFormat::Yaml,
            OutputFormat::Toml => DocumentFormat::Toml,
            OutputFormat::Json => DocumentFormat::Json,
        }
    }
}

fn init_cli_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logconf=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_summary(config: &LoggingConfig) {
    println!("version: {}", config.version);
    println!("disable_existing_loggers: {}", config.disable_existing_loggers);
    println!("retain_logs_days: {}", config.retain_logs_days);
    println!("formatters: {}", config.formatters.keys().cloned().collect::<Vec<_>>().join(", "));
    for (name, handler) in &config.handlers {
        let target = handler
            .filename
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "console".to_string());
        println!(
            "handler {}: {:?} -> {} (formatter {}, used by {})",
            name,
            handler.class,
            target,
            handler.formatter,
            config.loggers_using(name).join(", ")
        );
    }
    for (name, logger) in &config.loggers {
        println!(
            "logger {}: level {} handlers [{}] propagate {}",
            name,
            logger.level,
            logger.handlers.join(", "),
            logger.propagate
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => {
            init_cli_logging();
            let loaded = load_config(&config)?;
            tracing::info!(path = %config.display(), "Configuration is valid");
            print_summary(&loaded);
        }
        Commands::Normalize { config, to } => {
            init_cli_logging();
            let loaded = load_config(&config)?;
            print!("{}", to_document(&loaded, to.into())?);
        }
        Commands::Session { config, log_dir, logger, header } => {
            let options = SessionOptions::new(config, log_dir)
                .with_logger(logger)
                .with_header(header);
            let session = start_session(&options)?;

            session.system().log(
                session.primary_logger(),
                Level::INFO,
                format!(
                    "Session started: log file '{}', {} expired log(s) removed",
                    session.log_path().display(),
                    session.removed().len()
                ),
            )?;
            session.shutdown(0)?;
        }
    }

    Ok(())
}
