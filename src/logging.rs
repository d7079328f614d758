//! File logging. The terminal belongs to the TUI, so events go to a daily-rolling file.
//!
//! Filter priority: `VIDSCOUT_LOG`, then `RUST_LOG`, then `--verbose` (debug) or `info`.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config;

pub const LOG_ENV: &str = "VIDSCOUT_LOG";

/// Pick the filter directive from the environment values and the CLI flag.
pub fn filter_directive(project: Option<String>, rust_log: Option<String>, verbose: bool) -> String {
  project
    .filter(|v| !v.trim().is_empty())
    .or_else(|| rust_log.filter(|v| !v.trim().is_empty()))
    .unwrap_or_else(|| if verbose { "debug".to_string() } else { "info".to_string() })
}

/// Install the global subscriber. The returned guard must live until exit so buffered lines get flushed.
pub fn init(verbose: bool) -> Result<WorkerGuard> {
  let dir = config::log_dir();
  std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create log directory {}", dir.display()))?;

  let directive = filter_directive(std::env::var(LOG_ENV).ok(), std::env::var("RUST_LOG").ok(), verbose);
  let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, "vidscout.log"));
  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
    .try_init()
    .context("Failed to install tracing subscriber")?;

  tracing::info!(dir = %dir.display(), filter = %directive, "logging: initialized");
  Ok(guard)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn project_variable_wins() {
    let d = filter_directive(Some("vidscout=trace".into()), Some("warn".into()), true);
    assert_eq!(d, "vidscout=trace");
  }

  #[test]
  fn rust_log_is_fallback() {
    assert_eq!(filter_directive(None, Some("warn".into()), true), "warn");
    assert_eq!(filter_directive(Some("  ".into()), Some("warn".into()), false), "warn");
  }

  #[test]
  fn verbose_flag_sets_default() {
    assert_eq!(filter_directive(None, None, true), "debug");
    assert_eq!(filter_directive(None, None, false), "info");
  }
}
