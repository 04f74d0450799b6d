//! Log subscriber setup.
//!
//! Installs a `tracing` subscriber with:
//!
//! - an [`EnvFilter`] built from the configured level (`RUST_LOG` wins when set)
//! - a human-readable layer on stderr
//! - an optional non-blocking file layer, rotated daily, in the configured
//!   log directory
//!
//! Timestamps use the local offset in RFC 3339 form, falling back to UTC
//! when the local offset cannot be determined.

use std::fs;

use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingSettings;
use crate::error::LoggingError;

/// Base name of the rolling log file.
pub const LOG_FILE_NAME: &str = "streamfetch.log";

/// Filter directive used by `--verbose`.
const VERBOSE_DIRECTIVE: &str = "debug";

/// Keeps the file writer alive. Dropping it flushes buffered log lines.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
pub fn init_logging(settings: &LoggingSettings, verbose: bool) -> Result<LoggingGuard, LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(filter_directive(settings, verbose))?,
    };

    let timer = local_timer();
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(timer.clone());

    let (file_layer, guard) = match settings.directory {
        Some(ref dir) => {
            fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
                path: dir.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(timer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    Ok(LoggingGuard { _file: guard })
}

fn filter_directive(settings: &LoggingSettings, verbose: bool) -> &str {
    if verbose {
        VERBOSE_DIRECTIVE
    } else {
        settings.level.as_str()
    }
}

fn parse_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|e| LoggingError::InvalidFilter {
        filter: directive.to_string(),
        reason: e.to_string(),
    })
}

fn local_timer() -> OffsetTime<Rfc3339> {
    OffsetTime::local_rfc_3339().unwrap_or_else(|_| OffsetTime::new(UtcOffset::UTC, Rfc3339))
}
