//! Tracing subscriber setup
//!
//! Logs go to stderr by default, or are appended to the file named in
//! `[log] file`. `RUST_LOG` takes precedence over the configured level.

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;
use crate::{Result, ShantyError};

/// Filter used when neither `RUST_LOG` nor `[log] level` is set
pub const DEFAULT_FILTER: &str = "shanty=info";

type BoxedSubscriber = Box<dyn Subscriber + Send + Sync + 'static>;

/// Install the global subscriber described by `config`
///
/// # Errors
///
/// Returns `Io` if the log file cannot be opened and `Configuration` if the
/// level is invalid or a global subscriber is already installed
pub fn init(config: &LogConfig) -> Result<()> {
    let subscriber = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            subscriber_with_writer(config, file)?
        }
        None => {
            let filter = env_filter(config)?;
            Box::new(
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .finish(),
            )
        }
    };

    install(subscriber)
}

/// Install a global subscriber writing to an arbitrary sink
///
/// # Errors
///
/// Same as [`init`]
pub fn init_with_writer<W>(config: &LogConfig, writer: W) -> Result<()>
where
    W: Write + Send + 'static,
{
    install(subscriber_with_writer(config, writer)?)
}

fn install(subscriber: BoxedSubscriber) -> Result<()> {
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ShantyError::Configuration(format!("Failed to install logger: {e}")))
}

fn subscriber_with_writer<W>(config: &LogConfig, writer: W) -> Result<BoxedSubscriber>
where
    W: Write + Send + 'static,
{
    let filter = env_filter(config)?;
    Ok(Box::new(
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(writer))
            .finish(),
    ))
}

fn env_filter(config: &LogConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directive = config.level.as_deref().unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_new(directive)
        .map_err(|e| ShantyError::Configuration(format!("Invalid log level '{directive}': {e}")))
}
