//! Progress reporting.
//!
//! Every state change a caller may care about, including errors, goes
//! through one [`ProgressSink`]. Sinks are called from worker threads and
//! must marshal onto their own display thread if they need one.

use tracing::{error, info};

/// A progress update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Segments that reached a terminal status.
    pub completed: usize,
    /// Total segments in the job (0 when not yet known).
    pub total: usize,
    /// Human-readable status text.
    pub message: Option<String>,
    /// Error text; set for error-tagged events.
    pub error: Option<String>,
}

impl ProgressEvent {
    /// Plain progress update with a "Downloading: c/t (p%)" message.
    pub fn progress(completed: usize, total: usize) -> Self {
        let mut event = Self::counts(completed, total);
        event.message = Some(format!(
            "Downloading: {}/{} ({}%)",
            completed,
            total,
            event.percent()
        ));
        event
    }

    /// Informational message.
    pub fn message(completed: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::counts(completed, total)
        }
    }

    /// Error-tagged event.
    pub fn error(completed: usize, total: usize, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::counts(completed, total)
        }
    }

    fn counts(completed: usize, total: usize) -> Self {
        Self {
            completed,
            total,
            message: None,
            error: None,
        }
    }

    /// Completion percentage, capped at 100. Zero when the total is unknown.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total).min(100) as u8
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Receiver of progress events.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Sink that writes every event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn on_progress(&self, event: &ProgressEvent) {
        if let Some(ref err) = event.error {
            error!(completed = event.completed, total = event.total, "{}", err);
        } else if let Some(ref msg) = event.message {
            info!(completed = event.completed, total = event.total, "{}", msg);
        }
    }
}
