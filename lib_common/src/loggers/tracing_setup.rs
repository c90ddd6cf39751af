//! # Tracing Setup
//!
//! Installs the global `tracing` subscriber used by the binaries:
//! - an `EnvFilter` read from `RUST_LOG`, falling back to the configured level;
//! - a human readable console layer on stderr (stdout is left to program output);
//! - a JSON layer written through a non-blocking, daily-rolling file appender.

use std::io;
use std::path::PathBuf;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where and how verbosely to log.
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Prefix of the rolling log files.
    pub app_name: String,
    /// Directory holding the log files. Created if missing.
    pub log_dir: PathBuf,
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or `lib_common=debug`.
    pub level: String,
    /// Number of daily files kept on disk.
    pub keep_files: usize,
}

impl LogSettings {
    /// Settings for `app_name` honoring `LOG_DIR` and `RUST_LOG`.
    pub fn from_env(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            log_dir: std::env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("logs")),
            level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            keep_files: 7,
        }
    }
}

/// Installs the global subscriber.
///
/// Keep the returned guard alive until the program exits; dropping it flushes
/// and stops the file writer.
pub fn setup_logging(settings: &LogSettings) -> io::Result<WorkerGuard> {
    std::fs::create_dir_all(&settings.log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(settings.app_name.as_str())
        .filename_suffix("log")
        .max_log_files(settings.keep_files.max(1))
        .build(&settings.log_dir)
        .map_err(io::Error::other)?;
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_ansi(true)
        .with_writer(io::stderr);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_appender)
        .json();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(io::Error::other)?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(io::Error::other)?;

    info!(
        log_dir = %settings.log_dir.display(),
        level = %settings.level,
        "logging initialized"
    );
    Ok(guard)
}
