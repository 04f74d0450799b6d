//! Shared setup for commands that run jobs.

use streamfetch::config::ConfigFile;
use streamfetch::logging::{init_logging, LoggingGuard};
use tracing::info;

use crate::error::CliError;

/// Loaded configuration plus the active log subscriber.
pub struct CliRunner {
    config: ConfigFile,
    _log_guard: LoggingGuard,
}

impl CliRunner {
    /// Load the config file and install logging.
    pub fn new(verbose: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;
        let log_guard = init_logging(&config.logging, verbose)?;
        Ok(Self {
            config,
            _log_guard: log_guard,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            version = streamfetch::VERSION,
            command,
            "streamfetch starting"
        );
    }
}
