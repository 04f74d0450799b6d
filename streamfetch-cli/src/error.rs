//! CLI error type and exit codes.

use std::fmt;

use streamfetch::error::{ConfigError, FetchError, JobError, LoggingError, MergeError};

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Bad configuration or command-line input.
    Config(String),
    /// Logging could not be set up.
    Logging(LoggingError),
    /// The HTTP client could not be created.
    Client(FetchError),
    /// The job could not be started (manifest, output directory).
    Job(JobError),
    /// Some segments could not be downloaded.
    Incomplete { failed: usize, total: usize },
    /// The user interrupted the download.
    Cancelled,
    /// Reassembly failed.
    Merge(MergeError),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) | CliError::Logging(_) => 2,
            CliError::Cancelled => 130,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "{}", msg),
            CliError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Client(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Job(e) => write!(f, "Download failed: {}", e),
            CliError::Incomplete { failed, total } => {
                write!(f, "{} of {} segments could not be downloaded", failed, total)
            }
            CliError::Cancelled => write!(f, "Download cancelled"),
            CliError::Merge(e) => write!(f, "Merge failed: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<JobError> for CliError {
    fn from(e: JobError) -> Self {
        CliError::Job(e)
    }
}

impl From<MergeError> for CliError {
    fn from(e: MergeError) -> Self {
        CliError::Merge(e)
    }
}
