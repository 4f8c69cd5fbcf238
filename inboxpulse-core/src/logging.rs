//! Logging setup
//!
//! Events go to a daily-rolling file under the XDG state directory
//! (`~/.local/state/inboxpulse/`). Terminal output belongs to the CLI, so the
//! file is the default sink; `logging.stderr = true` adds a second layer that
//! echoes warnings and errors.

use std::path::PathBuf;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{Config, LoggingConfig};
use crate::error::Result;

const LOG_FILE_PREFIX: &str = "inboxpulse.log";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `config.level` when set. Keep the returned guard
/// alive for the lifetime of the process or buffered lines are lost.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_dir = Config::state_dir();
    std::fs::create_dir_all(&log_dir)?;

    let appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    let stderr_layer = config.stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::debug!(log_dir = %log_dir.display(), level = %config.level, "logging ready");

    Ok(LoggingGuard { _guard: guard })
}

/// Route events to the test harness output. Safe to call repeatedly.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Flushes buffered log lines when dropped.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Path of the current log file (without the date suffix the appender adds).
pub fn log_file_path() -> PathBuf {
    Config::log_path()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_lives_in_state_dir() {
        let path = log_file_path();
        assert!(path.ends_with(LOG_FILE_PREFIX));
        assert!(path.starts_with(Config::state_dir()));
    }
}
