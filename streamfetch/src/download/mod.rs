//! Concurrent segment acquisition.
//!
//! This module provides:
//! - Segment and job state with atomic bookkeeping (`state`)
//! - The progress event type and sink trait (`progress`)
//! - The bounded worker pool with per-segment retries (`scheduler`)
//!
//! # Architecture
//!
//! ```text
//! FetchScheduler::run
//!         │
//!         ├── worker 0 ─┐
//!         ├── worker 1 ─┼── claim next index ── retry loop ── SegmentStore file
//!         └── worker N ─┘                │
//!                                        ├── JobState (completed, failed, cancel)
//!                                        └── ProgressSink
//! ```

mod progress;
mod scheduler;
mod state;

pub use progress::{NullSink, ProgressEvent, ProgressSink, TracingSink};
pub use scheduler::FetchScheduler;
pub use state::{
    CancelFlag, FailedSegment, JobOutcome, JobReport, JobState, Segment, SegmentStatus,
};
