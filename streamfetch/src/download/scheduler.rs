//! Bounded-parallelism segment fetcher.
//!
//! A fixed pool of scoped worker threads pulls segment indices from a shared
//! cursor. Each worker runs the retry loop for the segment it claimed and
//! records the terminal status in the shared [`JobState`].
//!
//! Cancellation is cooperative. Workers check the flag before claiming a
//! segment and before every attempt; a request already in flight runs to
//! completion. Retries are immediate with a fixed attempt cap.

use std::fs;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};
use url::Url;

use super::progress::{ProgressEvent, ProgressSink};
use super::state::{JobOutcome, JobReport, JobState, Segment, SegmentStatus};
use crate::config::DownloadConfig;
use crate::error::SegmentError;
use crate::http::HttpClient;
use crate::store::SegmentStore;

/// Everything a worker needs for one run.
struct RunContext<'a> {
    job: &'a JobState,
    urls: &'a [Url],
    referer: &'a str,
    store: &'a SegmentStore,
    sink: &'a dyn ProgressSink,
    /// Next unclaimed segment index.
    cursor: AtomicUsize,
    /// Set when cancellation stopped a worker from doing remaining work.
    cancel_observed: AtomicBool,
}

/// Downloads all segments of a job with a bounded worker pool.
#[derive(Debug)]
pub struct FetchScheduler<C: HttpClient> {
    client: Arc<C>,
    concurrency: usize,
    max_attempts: u32,
}

impl<C: HttpClient> FetchScheduler<C> {
    /// Create a scheduler.
    ///
    /// # Arguments
    ///
    /// * `client` - Transport used for every attempt
    /// * `concurrency` - Worker pool size, clamped to 1..=50
    /// * `max_attempts` - Attempts per segment (minimum 1)
    pub fn new(client: Arc<C>, concurrency: usize, max_attempts: u32) -> Self {
        Self {
            client,
            concurrency: DownloadConfig::clamp_concurrency(concurrency),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Download every URL in `urls` into `store`.
    ///
    /// `job` must have been created for `urls.len()` segments; its cancel
    /// flag may be set from another thread at any time. Segment failures are
    /// recorded in `job` and the report, never returned as an error.
    pub fn run(
        &self,
        job: &JobState,
        urls: &[Url],
        referer: &str,
        store: &SegmentStore,
        sink: &dyn ProgressSink,
    ) -> JobReport {
        debug_assert_eq!(job.total(), urls.len());

        let total = urls.len();
        let workers = self.concurrency.min(total);
        info!(
            segments = total,
            workers,
            max_attempts = self.max_attempts,
            "Starting segment downloads"
        );

        let ctx = RunContext {
            job,
            urls,
            referer,
            store,
            sink,
            cursor: AtomicUsize::new(0),
            cancel_observed: AtomicBool::new(false),
        };

        let finished = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let ctx = &ctx;
                    scope.spawn(move || self.work(worker, ctx))
                })
                .collect();

            let mut finished = Vec::with_capacity(total);
            for handle in handles {
                match handle.join() {
                    Ok(segments) => finished.extend(segments),
                    Err(_) => warn!("Fetch worker panicked"),
                }
            }
            finished
        });

        let mut segments: Vec<Segment> = urls
            .iter()
            .enumerate()
            .map(|(index, url)| Segment::new(index, url.clone()))
            .collect();
        for segment in finished {
            let index = segment.index;
            segments[index] = segment;
        }

        let all_succeeded = segments
            .iter()
            .all(|s| s.status == SegmentStatus::Succeeded);
        let outcome = if all_succeeded {
            JobOutcome::Success
        } else if ctx.cancel_observed.load(Ordering::SeqCst) {
            JobOutcome::Cancelled
        } else {
            JobOutcome::PartialFailure
        };

        info!(
            ?outcome,
            completed = job.completed(),
            failed = job.failure_count(),
            total,
            "Segment downloads finished"
        );

        JobReport {
            outcome,
            total,
            completed: job.completed(),
            failed: job.failed(),
            segments,
        }
    }

    /// Worker loop: claim, fetch, record, until nothing is left or the job
    /// is cancelled.
    fn work(&self, worker: usize, ctx: &RunContext<'_>) -> Vec<Segment> {
        let mut done = Vec::new();

        loop {
            if ctx.job.is_cancelled() {
                if ctx.cursor.load(Ordering::SeqCst) < ctx.urls.len() {
                    ctx.cancel_observed.store(true, Ordering::SeqCst);
                }
                debug!(worker, "Cancellation observed, worker exiting");
                break;
            }

            let index = ctx.cursor.fetch_add(1, Ordering::SeqCst);
            let Some(url) = ctx.urls.get(index) else {
                break;
            };

            let mut segment = Segment::new(index, url.clone());
            let result = self.fetch_segment(&mut segment, ctx);

            let total = ctx.job.total();
            let event = match result {
                Ok(()) => {
                    let completed = ctx.job.record_success();
                    ProgressEvent::progress(completed, total)
                }
                Err(ref err) => {
                    let completed = ctx.job.record_failure(index, err.clone());
                    if err.is_cancelled() {
                        ProgressEvent::message(
                            completed,
                            total,
                            format!("Segment {} cancelled", index),
                        )
                    } else {
                        ProgressEvent::error(
                            completed,
                            total,
                            format!("Segment {} failed: {}", index, err),
                        )
                    }
                }
            };
            ctx.sink.on_progress(&event);

            done.push(segment);
            if matches!(result, Err(SegmentError::Cancelled)) {
                break;
            }
        }

        done
    }

    /// Per-segment retry loop.
    fn fetch_segment(
        &self,
        segment: &mut Segment,
        ctx: &RunContext<'_>,
    ) -> Result<(), SegmentError> {
        let dest = ctx.store.segment_path(segment.index);
        let mut last_error = String::new();

        while segment.attempts < self.max_attempts {
            if ctx.job.is_cancelled() {
                ctx.cancel_observed.store(true, Ordering::SeqCst);
                segment.status = SegmentStatus::Failed;
                discard_partial(&dest);
                return Err(SegmentError::Cancelled);
            }

            segment.attempts += 1;
            segment.status = SegmentStatus::InFlight;

            match self.client.download(segment.url.as_str(), ctx.referer, &dest) {
                Ok(bytes) => {
                    debug!(
                        index = segment.index,
                        attempt = segment.attempts,
                        bytes,
                        "Segment downloaded"
                    );
                    segment.status = SegmentStatus::Succeeded;
                    segment.path = Some(dest);
                    return Ok(());
                }
                Err(e) => {
                    debug!(
                        index = segment.index,
                        attempt = segment.attempts,
                        error = %e,
                        "Segment attempt failed"
                    );
                    last_error = e.to_string();
                }
            }
        }

        warn!(
            index = segment.index,
            url = %segment.url,
            attempts = segment.attempts,
            error = %last_error,
            "Segment failed"
        );
        segment.status = SegmentStatus::Failed;
        discard_partial(&dest);

        Err(SegmentError::Fetch {
            attempts: segment.attempts,
            reason: last_error,
        })
    }
}

/// Remove a failed segment's partial file so a later merge skips it.
fn discard_partial(path: &std::path::Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove partial segment");
        }
    }
}
