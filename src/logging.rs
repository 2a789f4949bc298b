use std::io;
use std::path::Path;

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `kennel=debug`.
pub const LOG_ENV: &str = "KENNEL_LOG";

/// Install the global subscriber: stderr, plus a daily-rolling file under
/// `log_dir` when given.
///
/// Keep the returned guard alive until exit or buffered file lines are lost.
pub fn init(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let filter_layer = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

  let stderr_layer = tracing_subscriber::fmt::layer()
    .with_writer(io::stderr)
    .with_target(false);

  let (file_layer, guard) = match log_dir {
    Some(dir) => {
      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
      let appender = tracing_appender::rolling::daily(dir, "kennel.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_line_number(true);
      (Some(layer), Some(guard))
    }
    None => (None, None),
  };

  tracing_subscriber::registry()
    .with(filter_layer)
    .with(stderr_layer)
    .with(file_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
