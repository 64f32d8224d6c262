use color_eyre::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

/// Environment variable holding a filter directive, e.g. `wo=debug`
pub const LOG_ENV: &str = "WO_LOG";

/// Install the global subscriber writing to a daily log file.
///
/// Stdout belongs to the shell, so nothing is logged there. Keep the returned
/// guard alive until exit or buffered lines are lost.
pub fn setup_logging(config: &Config) -> Result<WorkerGuard> {
  let log_dir = config.log_dir();
  std::fs::create_dir_all(&log_dir)?;

  let file_appender = tracing_appender::rolling::daily(&log_dir, "wo.log");
  let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

  let filter = EnvFilter::try_from_env(LOG_ENV)
    .or_else(|_| EnvFilter::try_new(&config.log.level))
    .unwrap_or_else(|_| EnvFilter::new("info"));

  let layer = fmt::layer()
    .with_writer(non_blocking)
    .with_ansi(false)
    .with_target(true)
    .with_line_number(true);

  tracing_subscriber::registry()
    .with(filter)
    .with(layer)
    .try_init()?;

  tracing::info!(dir = %log_dir.display(), "logging started");
  Ok(guard)
}
