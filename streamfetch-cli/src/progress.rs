//! Terminal progress display.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use streamfetch::{ProgressEvent, ProgressSink};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) | {msg}";

/// Progress sink drawing an indicatif bar.
///
/// Errors are printed above the bar so they stay visible after it finishes.
pub struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Stop redrawing and leave the bar on screen.
    pub fn finish(&self) {
        self.bar.disable_steady_tick();
        self.bar.abandon();
    }
}

impl ProgressSink for BarSink {
    fn on_progress(&self, event: &ProgressEvent) {
        if event.total > 0 {
            self.bar.set_length(event.total as u64);
            self.bar.set_position(event.completed as u64);
        }

        if let Some(ref err) = event.error {
            self.bar
                .println(format!("{} {}", style("error:").red().bold(), err));
        } else if let Some(ref msg) = event.message {
            self.bar.set_message(msg.clone());
        }
    }
}
