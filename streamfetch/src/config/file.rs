//! INI configuration file.
//!
//! The file lives at `<config_dir>/streamfetch/config.ini`:
//!
//! ```ini
//! [download]
//! concurrency = 10
//! max_attempts = 3
//! manifest_timeout = 10
//! segment_timeout = 30
//! save_dir = /home/me/Videos
//!
//! [output]
//! container = mp4
//! segment_extension = ts
//! muxer = ffmpeg
//! keep_segments = false
//!
//! [logging]
//! level = info
//! directory = /home/me/.local/state/streamfetch
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{EscapePolicy, Ini};

use super::{
    DownloadConfig, DEFAULT_CONCURRENCY, DEFAULT_CONTAINER, DEFAULT_MANIFEST_TIMEOUT_SECS,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MUXER, DEFAULT_SEGMENT_EXTENSION, DEFAULT_SEGMENT_TIMEOUT_SECS,
    DEFAULT_USER_AGENT,
};
use crate::error::ConfigError;

/// Path of the user's configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("streamfetch")
        .join("config.ini")
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSettings {
    pub concurrency: usize,
    pub max_attempts: u32,
    pub manifest_timeout: u64,
    pub segment_timeout: u64,
    pub user_agent: String,
    pub save_dir: Option<PathBuf>,
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub container: String,
    pub segment_extension: String,
    pub muxer: String,
    pub keep_segments: bool,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Directory for the rolling log file; `None` logs to stderr only.
    pub directory: Option<PathBuf>,
}

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub download: DownloadSettings,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            download: DownloadSettings {
                concurrency: DEFAULT_CONCURRENCY,
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                manifest_timeout: DEFAULT_MANIFEST_TIMEOUT_SECS,
                segment_timeout: DEFAULT_SEGMENT_TIMEOUT_SECS,
                user_agent: DEFAULT_USER_AGENT.to_string(),
                save_dir: None,
            },
            output: OutputSettings {
                container: DEFAULT_CONTAINER.to_string(),
                segment_extension: DEFAULT_SEGMENT_EXTENSION.to_string(),
                muxer: DEFAULT_MUXER.to_string(),
                keep_segments: false,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                directory: None,
            },
        }
    }
}

impl ConfigFile {
    /// Load the user's configuration file, or defaults if it does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load a configuration file from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if !path.exists() {
            return Ok(config);
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|props| props.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }

        Ok(config)
    }

    /// Save to the user's configuration file.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }

        // Reserved escaping keeps ';' and '#' in values (user agents) intact.
        ini.write_to_file_policy(path, EscapePolicy::Reserved)
            .map_err(write_err)
    }

    /// Build the runtime download configuration from this file.
    pub fn to_download_config(&self) -> DownloadConfig {
        DownloadConfig::new()
            .with_concurrency(self.download.concurrency)
            .with_max_attempts(self.download.max_attempts)
            .with_manifest_timeout(Duration::from_secs(self.download.manifest_timeout))
            .with_segment_timeout(Duration::from_secs(self.download.segment_timeout))
            .with_user_agent(self.download.user_agent.clone())
            .with_container(self.output.container.clone())
            .with_segment_extension(self.output.segment_extension.clone())
            .with_muxer(self.output.muxer.clone())
            .with_keep_segments(self.output.keep_segments)
    }
}

/// A settable configuration key, addressed as `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    DownloadConcurrency,
    DownloadMaxAttempts,
    DownloadManifestTimeout,
    DownloadSegmentTimeout,
    DownloadUserAgent,
    DownloadSaveDir,
    OutputContainer,
    OutputSegmentExtension,
    OutputMuxer,
    OutputKeepSegments,
    LoggingLevel,
    LoggingDirectory,
}

impl ConfigKey {
    /// All keys, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &[
            Self::DownloadConcurrency,
            Self::DownloadMaxAttempts,
            Self::DownloadManifestTimeout,
            Self::DownloadSegmentTimeout,
            Self::DownloadUserAgent,
            Self::DownloadSaveDir,
            Self::OutputContainer,
            Self::OutputSegmentExtension,
            Self::OutputMuxer,
            Self::OutputKeepSegments,
            Self::LoggingLevel,
            Self::LoggingDirectory,
        ]
    }

    pub fn section(&self) -> &'static str {
        match self {
            Self::DownloadConcurrency
            | Self::DownloadMaxAttempts
            | Self::DownloadManifestTimeout
            | Self::DownloadSegmentTimeout
            | Self::DownloadUserAgent
            | Self::DownloadSaveDir => "download",
            Self::OutputContainer
            | Self::OutputSegmentExtension
            | Self::OutputMuxer
            | Self::OutputKeepSegments => "output",
            Self::LoggingLevel | Self::LoggingDirectory => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            Self::DownloadConcurrency => "concurrency",
            Self::DownloadMaxAttempts => "max_attempts",
            Self::DownloadManifestTimeout => "manifest_timeout",
            Self::DownloadSegmentTimeout => "segment_timeout",
            Self::DownloadUserAgent => "user_agent",
            Self::DownloadSaveDir => "save_dir",
            Self::OutputContainer => "container",
            Self::OutputSegmentExtension => "segment_extension",
            Self::OutputMuxer => "muxer",
            Self::OutputKeepSegments => "keep_segments",
            Self::LoggingLevel => "level",
            Self::LoggingDirectory => "directory",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as a string; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        let path_str = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };

        match self {
            Self::DownloadConcurrency => config.download.concurrency.to_string(),
            Self::DownloadMaxAttempts => config.download.max_attempts.to_string(),
            Self::DownloadManifestTimeout => config.download.manifest_timeout.to_string(),
            Self::DownloadSegmentTimeout => config.download.segment_timeout.to_string(),
            Self::DownloadUserAgent => config.download.user_agent.clone(),
            Self::DownloadSaveDir => path_str(&config.download.save_dir),
            Self::OutputContainer => config.output.container.clone(),
            Self::OutputSegmentExtension => config.output.segment_extension.clone(),
            Self::OutputMuxer => config.output.muxer.clone(),
            Self::OutputKeepSegments => config.output.keep_segments.to_string(),
            Self::LoggingLevel => config.logging.level.clone(),
            Self::LoggingDirectory => path_str(&config.logging.directory),
        }
    }

    /// Validate and store `value`.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            Self::DownloadConcurrency => config.download.concurrency = self.parse(value)?,
            Self::DownloadMaxAttempts => {
                let attempts: u32 = self.parse(value)?;
                if attempts == 0 {
                    return Err(self.invalid(value, "must be at least 1"));
                }
                config.download.max_attempts = attempts;
            }
            Self::DownloadManifestTimeout => config.download.manifest_timeout = self.parse(value)?,
            Self::DownloadSegmentTimeout => config.download.segment_timeout = self.parse(value)?,
            Self::DownloadUserAgent => config.download.user_agent = value.to_string(),
            Self::DownloadSaveDir => config.download.save_dir = optional_path(value),
            Self::OutputContainer => config.output.container = self.non_empty(value)?,
            Self::OutputSegmentExtension => {
                config.output.segment_extension = self.non_empty(value)?
            }
            Self::OutputMuxer => config.output.muxer = self.non_empty(value)?,
            Self::OutputKeepSegments => config.output.keep_segments = self.parse(value)?,
            Self::LoggingLevel => config.logging.level = self.non_empty(value)?,
            Self::LoggingDirectory => config.logging.directory = optional_path(value),
        }
        Ok(())
    }

    fn parse<T>(&self, value: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        value
            .parse()
            .map_err(|e: T::Err| self.invalid(value, &e.to_string()))
    }

    fn non_empty(&self, value: &str) -> Result<String, ConfigError> {
        if value.is_empty() {
            Err(self.invalid(value, "must not be empty"))
        } else {
            Ok(value.to_string())
        }
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn optional_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}
