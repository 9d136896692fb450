//! Diagnostic logging using tracing.
//!
//! Records go to a time-rotated file, never to the terminal: stdout carries the
//! archive path and stderr carries only short notices.

use crate::config::LogConfig;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_PREFIX: &str = "bak-cli";
pub const LOG_FILE_SUFFIX: &str = "log";

/// Build the rotating appender for the configured log directory.
pub fn file_appender(config: &LogConfig) -> anyhow::Result<RollingFileAppender> {
    std::fs::create_dir_all(&config.dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(config.max_files.max(1))
        .build(&config.dir)?;

    Ok(appender)
}

/// Initialize the diagnostic log with the configured level and directory
pub fn init(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let appender = file_appender(config)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(appender),
        )
        .try_init()?;

    Ok(())
}
