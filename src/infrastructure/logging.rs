use crate::infrastructure::error::InfraError;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

pub const COMMAND_LOG_FILE: &str = "commands.log";
const LOG_FILTER_ENV: &str = "BRAINBUDDY_LOG";
const DEFAULT_FILTER: &str = "info";

/// Installs the process-wide subscriber writing JSON lines to
/// `<logs_dir>/commands.log`. A second call keeps the first subscriber.
pub fn init_logging(logs_dir: &Path) -> Result<(), InfraError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(logs_dir.join(COMMAND_LOG_FILE))?;
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = fmt()
        .json()
        .with_current_span(false)
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
