//! Error types for manifest parsing, segment fetching, and reassembly.
//!
//! The taxonomy follows the blast radius of each failure:
//!
//! - [`ParseError`] is fatal to a job; scheduling never starts.
//! - [`SegmentError`] is local to one segment and only recorded.
//! - [`MergeError`] is local to the merge step and safe to retry.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Transport-level failure of a single HTTP request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The request could not be sent or the body could not be read.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The request exceeded its timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Writing the response body to disk failed.
    #[error("failed to write {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Reasons a manifest could not be turned into a segment list.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The manifest could not be fetched.
    #[error("failed to fetch manifest: {0}")]
    FetchFailed(#[source] FetchError),

    /// The manifest body was empty.
    #[error("manifest {url} is empty")]
    Empty { url: String },

    /// The manifest did not reference any segments.
    #[error("no segments found in manifest {url}")]
    NoSegments { url: String },

    /// The manifest URL itself is not a valid absolute URL.
    #[error("invalid manifest URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Why a single segment ended in the `Failed` state.
///
/// Stored per segment in the job's failed list, so it is cheap to clone and
/// compare.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    /// Every attempt failed; `reason` is the last attempt's error.
    #[error("download failed after {attempts} attempt(s): {reason}")]
    Fetch { attempts: u32, reason: String },

    /// The job was cancelled before the segment could complete.
    #[error("download cancelled")]
    Cancelled,
}

impl SegmentError {
    /// Whether this failure was caused by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors managing the scratch directory.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to reset scratch directory {}: {source}", path.display())]
    Reset { path: PathBuf, source: io::Error },

    #[error("failed to list scratch directory {}: {source}", path.display())]
    List { path: PathBuf, source: io::Error },

    #[error("failed to remove scratch directory {}: {source}", path.display())]
    Clear { path: PathBuf, source: io::Error },
}

/// Errors from the merge step.
#[derive(Debug, Error)]
pub enum MergeError {
    /// `merge` was called before any job was started.
    #[error("no download job to merge")]
    NoJob,

    /// The scratch directory holds no segment files.
    #[error("no segment files found in {}", dir.display())]
    NoSegments { dir: PathBuf },

    /// The external muxer could not be run or exited unsuccessfully.
    #[error("{program} failed ({status}): {stderr}")]
    ExternalToolFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// Local I/O failed while building the output.
    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MergeError {
    pub(crate) fn tool_failed(program: &str, status: Option<ExitStatus>, stderr: &str) -> Self {
        Self::ExternalToolFailed {
            program: program.to_string(),
            status: status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "not started".to_string()),
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Errors that abort a job before or during setup.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors loading, saving, or editing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("failed to write config {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// Errors installing the log subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("a global log subscriber is already installed")]
    AlreadyInitialized,
}
