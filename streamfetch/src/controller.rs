//! Top-level control surface for a download job.
//!
//! [`Downloader`] ties the pieces together: it parses the manifest, prepares
//! the scratch area, runs the [`FetchScheduler`], and later merges whatever
//! was downloaded. `start` blocks the calling thread; `stop` may be called
//! from any other thread (a Ctrl+C handler, a UI thread) while it runs.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use streamfetch::{DownloadConfig, Downloader};
//!
//! let downloader = Downloader::with_defaults(DownloadConfig::default())?;
//! let report = downloader.start("https://cdn.example/v/index.m3u8", Path::new("out"), 10)?;
//! if report.is_mergeable() {
//!     downloader.merge()?;
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::DownloadConfig;
use crate::download::{
    CancelFlag, FetchScheduler, JobOutcome, JobReport, JobState, ProgressEvent, ProgressSink,
    TracingSink,
};
use crate::error::{FetchError, JobError, MergeError};
use crate::http::{HttpClient, ReqwestClient};
use crate::manifest::ManifestParser;
use crate::merge::{MergeReport, Reassembler};
use crate::store::SegmentStore;

/// Where the most recent job left its segments.
#[derive(Debug, Clone)]
struct LastJob {
    save_path: PathBuf,
    store: SegmentStore,
}

/// Runs download jobs and merges their output.
pub struct Downloader<C: HttpClient = ReqwestClient> {
    config: DownloadConfig,
    client: Arc<C>,
    sink: Arc<dyn ProgressSink>,
    cancel: Mutex<CancelFlag>,
    last_job: Mutex<Option<LastJob>>,
}

impl Downloader<ReqwestClient> {
    /// Create a downloader using the real HTTP client and logging progress
    /// through `tracing`.
    pub fn with_defaults(config: DownloadConfig) -> Result<Self, FetchError> {
        let client = ReqwestClient::new(&config)?;
        Ok(Self::new(config, Arc::new(client), Arc::new(TracingSink)))
    }
}

impl<C: HttpClient> Downloader<C> {
    pub fn new(config: DownloadConfig, client: Arc<C>, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            config,
            client,
            sink,
            cancel: Mutex::new(CancelFlag::new()),
            last_job: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Download every segment listed by `manifest_url` into
    /// `<save_path>/temp_<job>/`.
    ///
    /// Blocks until all segments reached a terminal status or the job was
    /// cancelled. Individual segment failures are part of the returned
    /// report; only setup failures (output directory, manifest, scratch
    /// area) are errors.
    pub fn start(
        &self,
        manifest_url: &str,
        save_path: &Path,
        concurrency: usize,
    ) -> Result<JobReport, JobError> {
        let result = self.run_job(manifest_url, save_path, concurrency);
        if let Err(ref e) = result {
            warn!(url = manifest_url, error = %e, "Download job failed");
            self.sink.on_progress(&ProgressEvent::error(0, 0, e.to_string()));
        }
        result
    }

    /// Request cancellation of the running job.
    ///
    /// Returns immediately. Requests already in flight finish on their own.
    pub fn stop(&self) {
        info!("Cancellation requested");
        self.cancel.lock().cancel();
    }

    /// Merge the segments of the most recent job.
    ///
    /// The scratch directory is removed afterwards unless the configuration
    /// asks to keep segments.
    pub fn merge(&self) -> Result<MergeReport, MergeError> {
        let Some(job) = self.last_job.lock().clone() else {
            self.sink
                .on_progress(&ProgressEvent::error(0, 0, MergeError::NoJob.to_string()));
            return Err(MergeError::NoJob);
        };
        self.merge_store(&job.save_path, &job.store)
    }

    /// Merge a scratch area left in `save_path` by an earlier run.
    pub fn merge_dir(&self, save_path: &Path) -> Result<MergeReport, MergeError> {
        let store = SegmentStore::new(
            save_path,
            &self.config.job_name,
            self.config.segment_extension.as_str(),
        );
        self.merge_store(save_path, &store)
    }

    fn run_job(
        &self,
        manifest_url: &str,
        save_path: &Path,
        concurrency: usize,
    ) -> Result<JobReport, JobError> {
        // Installed first so a stop() during setup lands on this job.
        let cancel = CancelFlag::new();
        *self.cancel.lock() = cancel.clone();

        fs::create_dir_all(save_path).map_err(|source| JobError::CreateDir {
            path: save_path.to_path_buf(),
            source,
        })?;

        self.sink
            .on_progress(&ProgressEvent::message(0, 0, "Parsing manifest..."));
        let manifest = ManifestParser::new(Arc::clone(&self.client)).parse(manifest_url)?;
        let total = manifest.len();
        self.sink.on_progress(&ProgressEvent::message(
            0,
            total,
            format!("Found {} segments", total),
        ));

        let store = SegmentStore::new(
            save_path,
            &self.config.job_name,
            self.config.segment_extension.as_str(),
        );
        store.reset()?;
        *self.last_job.lock() = Some(LastJob {
            save_path: save_path.to_path_buf(),
            store: store.clone(),
        });

        let job = JobState::new(total, cancel);
        let scheduler =
            FetchScheduler::new(Arc::clone(&self.client), concurrency, self.config.max_attempts);
        let report = scheduler.run(
            &job,
            &manifest.segment_urls,
            manifest_url,
            &store,
            self.sink.as_ref(),
        );

        self.sink.on_progress(&summary_event(&report));
        Ok(report)
    }

    fn merge_store(&self, save_path: &Path, store: &SegmentStore) -> Result<MergeReport, MergeError> {
        let result = self.try_merge(save_path, store);
        if let Err(ref e) = result {
            warn!(dir = %store.root().display(), error = %e, "Merge failed");
            self.sink
                .on_progress(&ProgressEvent::error(0, 0, format!("Merge failed: {}", e)));
        }
        result
    }

    fn try_merge(&self, save_path: &Path, store: &SegmentStore) -> Result<MergeReport, MergeError> {
        let files = store.list_completed()?;
        let reassembler = Reassembler::new(save_path, store.concat_list_path(), &self.config);
        let report = reassembler.merge(&files, self.sink.as_ref())?;

        if !self.config.keep_segments {
            store.clear()?;
        }
        Ok(report)
    }
}

/// Terminal event describing how a job ended.
fn summary_event(report: &JobReport) -> ProgressEvent {
    match report.outcome {
        JobOutcome::Success => ProgressEvent::message(
            report.completed,
            report.total,
            format!("Download complete: {} segments", report.total),
        ),
        JobOutcome::PartialFailure => {
            let indices: Vec<String> = report
                .failed
                .iter()
                .map(|f| f.index.to_string())
                .collect();
            ProgressEvent::error(
                report.completed,
                report.total,
                format!(
                    "Download finished with {} failed segment(s): {}",
                    report.failed.len(),
                    indices.join(", ")
                ),
            )
        }
        JobOutcome::Cancelled => ProgressEvent::message(
            report.completed,
            report.total,
            format!(
                "Download cancelled: {} of {} segments downloaded",
                report.succeeded(),
                report.total
            ),
        ),
    }
}
