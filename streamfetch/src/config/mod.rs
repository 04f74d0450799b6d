//! Runtime configuration for download jobs.
//!
//! [`DownloadConfig`] holds everything a job needs at runtime. It is built
//! either programmatically with the `with_*` builder methods or from the
//! user's INI file via [`ConfigFile::to_download_config`].

mod file;

pub use file::{config_file_path, ConfigFile, ConfigKey, LoggingSettings};

use std::path::PathBuf;
use std::time::Duration;

/// Smallest allowed worker pool size.
pub const MIN_CONCURRENCY: usize = 1;

/// Largest allowed worker pool size.
pub const MAX_CONCURRENCY: usize = 50;

/// Default worker pool size.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default number of attempts per segment.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default timeout for the manifest request.
pub const DEFAULT_MANIFEST_TIMEOUT_SECS: u64 = 10;

/// Default timeout for each segment attempt.
pub const DEFAULT_SEGMENT_TIMEOUT_SECS: u64 = 30;

/// Browser-like user agent; some CDNs reject obvious non-browser clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Default file extension for downloaded segments.
pub const DEFAULT_SEGMENT_EXTENSION: &str = "ts";

/// Default container for the stream-copy output.
pub const DEFAULT_CONTAINER: &str = "mp4";

/// Default external muxer program.
pub const DEFAULT_MUXER: &str = "ffmpeg";

/// Default job name; the scratch directory is `temp_<job_name>`.
pub const DEFAULT_JOB_NAME: &str = "ts_files";

/// Configuration for a download job.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Number of concurrent segment downloads.
    pub concurrency: usize,

    /// Attempts per segment before it is marked failed.
    pub max_attempts: u32,

    /// Timeout for the manifest request.
    pub manifest_timeout: Duration,

    /// Timeout for each segment attempt.
    pub segment_timeout: Duration,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// File extension for segment files (without the dot).
    pub segment_extension: String,

    /// Container extension for the stream-copy output (without the dot).
    pub container: String,

    /// Program used for stream-copy concatenation.
    pub muxer: String,

    /// Job name used for the scratch directory.
    pub job_name: String,

    /// Whether to keep segment files after a successful merge.
    pub keep_segments: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            manifest_timeout: Duration::from_secs(DEFAULT_MANIFEST_TIMEOUT_SECS),
            segment_timeout: Duration::from_secs(DEFAULT_SEGMENT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            segment_extension: DEFAULT_SEGMENT_EXTENSION.to_string(),
            container: DEFAULT_CONTAINER.to_string(),
            muxer: DEFAULT_MUXER.to_string(),
            job_name: DEFAULT_JOB_NAME.to_string(),
            keep_segments: false,
        }
    }
}

impl DownloadConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerce a requested pool size into the supported range.
    pub fn clamp_concurrency(requested: usize) -> usize {
        requested.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
    }

    /// Set the number of concurrent downloads (clamped to 1..=50).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Self::clamp_concurrency(concurrency);
        self
    }

    /// Set the attempts per segment (at least 1).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the manifest request timeout.
    pub fn with_manifest_timeout(mut self, timeout: Duration) -> Self {
        self.manifest_timeout = timeout;
        self
    }

    /// Set the per-attempt segment timeout.
    pub fn with_segment_timeout(mut self, timeout: Duration) -> Self {
        self.segment_timeout = timeout;
        self
    }

    /// Set the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the segment file extension.
    pub fn with_segment_extension(mut self, extension: impl Into<String>) -> Self {
        self.segment_extension = extension.into();
        self
    }

    /// Set the output container extension.
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    /// Set the external muxer program.
    pub fn with_muxer(mut self, muxer: impl Into<String>) -> Self {
        self.muxer = muxer.into();
        self
    }

    /// Set the job name.
    pub fn with_job_name(mut self, job_name: impl Into<String>) -> Self {
        self.job_name = job_name.into();
        self
    }

    /// Keep or discard segment files after a successful merge.
    pub fn with_keep_segments(mut self, keep: bool) -> Self {
        self.keep_segments = keep;
        self
    }

    /// Scratch directory for a job saving into `save_path`.
    pub fn scratch_dir(&self, save_path: &std::path::Path) -> PathBuf {
        save_path.join(format!("temp_{}", self.job_name))
    }
}
