//! Logging infrastructure for cartpulse
//!
//! Logs roll daily under `~/.local/state/cartpulse/` following XDG
//! standards, and old rolled files are pruned down to
//! `logging.max_files` on startup.

use crate::config::{Config, LoggingConfig};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Base name of the log file; daily rotation appends a date suffix.
const LOG_FILE_PREFIX: &str = "cartpulse.log";

/// Initialize the logging system
///
/// Sets up tracing with:
/// - File output to XDG state directory, rolled daily
/// - Startup pruning of rolled files beyond `max_files`
/// - Configurable log level via config or RUST_LOG env var
pub fn init(config: &LoggingConfig) -> crate::error::Result<LoggingGuard> {
    let log_dir = Config::state_dir();

    // Create log directory if it doesn't exist
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);

    // Non-blocking writer for better performance
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Build the filter from config or env var
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();

    let pruned = prune_rotated_logs(&log_dir, config.max_files);

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        max_files = config.max_files,
        pruned,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Delete rolled log files beyond the newest `max_files`.
///
/// Daily rotation names files `cartpulse.log.YYYY-MM-DD`, so a
/// lexicographic sort is a chronological sort. `max_files = 0` disables
/// pruning. Returns how many files were removed; per-file failures are
/// skipped, not fatal.
fn prune_rotated_logs(log_dir: &Path, max_files: usize) -> usize {
    if max_files == 0 {
        return 0;
    }

    let Ok(entries) = std::fs::read_dir(log_dir) else {
        return 0;
    };

    let mut rotated: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX) && n.len() > LOG_FILE_PREFIX.len())
        })
        .collect();

    if rotated.len() <= max_files {
        return 0;
    }

    rotated.sort();
    let excess = rotated.len() - max_files;
    let mut pruned = 0;

    for path in rotated.into_iter().take(excess) {
        match std::fs::remove_file(&path) {
            Ok(()) => pruned += 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to prune old log file");
            }
        }
    }

    pruned
}

/// Initialize logging for tests (logs to stdout)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any pending log writes.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Returns the log file path
pub fn log_file_path() -> PathBuf {
    Config::log_path()
}
