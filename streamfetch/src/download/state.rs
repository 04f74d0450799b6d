//! Segment and job state.
//!
//! A [`Segment`] is owned by the worker that claimed it and is never shared.
//! The job-wide [`JobState`] is shared by all workers: an atomic completion
//! counter, a mutex-guarded failed list, and the [`CancelFlag`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use url::Url;

use crate::error::SegmentError;

/// Lifecycle of a single segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStatus {
    Pending,
    InFlight,
    Succeeded,
    Failed,
}

impl SegmentStatus {
    /// Whether the segment has reached `Succeeded` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// One fetchable chunk of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// 0-based position in the manifest.
    pub index: usize,
    /// Absolute source URL.
    pub url: Url,
    pub status: SegmentStatus,
    /// Number of attempts started so far.
    pub attempts: u32,
    /// Local file, set once the segment has succeeded.
    pub path: Option<PathBuf>,
}

impl Segment {
    /// Create a pending segment.
    pub fn new(index: usize, url: Url) -> Self {
        Self {
            index,
            url,
            status: SegmentStatus::Pending,
            attempts: 0,
            path: None,
        }
    }
}

/// A segment that ended in `Failed`, with its last error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSegment {
    pub index: usize,
    pub error: SegmentError,
}

/// Job-wide cancellation flag.
///
/// Cloning shares the flag. Once set it stays set.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Callable from any thread.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Shared bookkeeping for one job.
#[derive(Debug)]
pub struct JobState {
    total: usize,
    completed: AtomicUsize,
    failed: Mutex<Vec<FailedSegment>>,
    cancel: CancelFlag,
}

impl JobState {
    /// Create state for a job of `total` segments using `cancel`.
    pub fn new(total: usize, cancel: CancelFlag) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            failed: Mutex::new(Vec::new()),
            cancel,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Segments that reached a terminal status.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Failed segments, ordered by index.
    pub fn failed(&self) -> Vec<FailedSegment> {
        self.failed.lock().clone()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.lock().len()
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Record a succeeded segment. Returns the new completed count.
    pub fn record_success(&self) -> usize {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record a failed segment. Returns the new completed count.
    pub fn record_failure(&self, index: usize, error: SegmentError) -> usize {
        {
            let mut failed = self.failed.lock();
            let pos = failed.partition_point(|f| f.index < index);
            failed.insert(pos, FailedSegment { index, error });
        }
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Terminal state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Every segment succeeded.
    Success,
    /// Scheduling finished but at least one segment failed.
    PartialFailure,
    /// Cancellation was observed before every segment succeeded.
    Cancelled,
}

/// Result of a scheduler run.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub outcome: JobOutcome,
    pub total: usize,
    /// Segments that reached a terminal status.
    pub completed: usize,
    pub failed: Vec<FailedSegment>,
    /// Final state of every segment, by index.
    pub segments: Vec<Segment>,
}

impl JobReport {
    /// Number of segments that succeeded.
    pub fn succeeded(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.status == SegmentStatus::Succeeded)
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.outcome == JobOutcome::Success
    }

    /// Whether at least one segment is available for merging.
    pub fn is_mergeable(&self) -> bool {
        self.succeeded() > 0
    }
}
