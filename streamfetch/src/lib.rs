//! streamfetch - Concurrent HLS segment downloader
//!
//! This library fetches an HLS media playlist, downloads every listed media
//! segment with a bounded pool of worker threads, and reassembles the
//! segments into a single playable file.
//!
//! The main entry point is [`Downloader`]. The building blocks are public
//! as well so other front ends can drive a job step by step:
//!
//! - [`manifest`] parses playlists into absolute segment URLs
//! - [`download`] runs the worker pool and reports progress
//! - [`store`] owns the on-disk scratch area
//! - [`merge`] reassembles segments in order

pub mod config;
pub mod controller;
pub mod download;
pub mod error;
pub mod http;
pub mod logging;
pub mod manifest;
pub mod merge;
pub mod store;

pub use config::DownloadConfig;
pub use controller::Downloader;
pub use download::{CancelFlag, JobOutcome, JobReport, NullSink, ProgressEvent, ProgressSink};
pub use error::{FetchError, JobError, MergeError, ParseError, SegmentError};
pub use http::{HttpClient, ReqwestClient};
pub use merge::{MergeMethod, MergeReport, Reassembler};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
