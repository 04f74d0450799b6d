//! Download command - fetch a playlist's segments and merge them.

use std::path::PathBuf;
use std::sync::Arc;

use console::style;
use streamfetch::{
    DownloadConfig, Downloader, JobOutcome, JobReport, MergeMethod, MergeReport, ReqwestClient,
};

use crate::error::CliError;
use crate::progress::BarSink;
use crate::runner::CliRunner;

/// Arguments for the download command.
pub struct DownloadArgs {
    pub url: String,
    pub output: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub attempts: Option<u32>,
    pub no_merge: bool,
    pub keep_segments: bool,
}

/// Run the download command.
pub fn run(args: DownloadArgs, runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("download");
    let file = runner.config();

    // CLI takes precedence, then config
    let mut config = file.to_download_config();
    if let Some(attempts) = args.attempts {
        config = config.with_max_attempts(attempts);
    }
    if args.keep_segments {
        config = config.with_keep_segments(true);
    }
    let concurrency = args.concurrency.unwrap_or(config.concurrency);
    let save_path = args
        .output
        .or_else(|| file.download.save_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let scratch = config.scratch_dir(&save_path);

    let client = ReqwestClient::new(&config).map_err(CliError::Client)?;
    let sink = Arc::new(BarSink::new());
    let downloader = Arc::new(Downloader::new(config, Arc::new(client), sink.clone()));

    let handler_downloader = Arc::clone(&downloader);
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received interrupt, stopping after in-flight segments...");
        handler_downloader.stop();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    println!("Playlist:    {}", args.url);
    println!("Output:      {}", save_path.display());
    println!(
        "Workers:     {}",
        DownloadConfig::clamp_concurrency(concurrency)
    );
    println!();

    let result = downloader.start(&args.url, &save_path, concurrency);
    sink.finish();
    let report = result?;
    println!();
    print_summary(&report);

    if report.outcome == JobOutcome::Cancelled {
        println!("Partial segments kept in {}", scratch.display());
        println!("Run 'streamfetch merge' to merge what was downloaded.");
        return Err(CliError::Cancelled);
    }

    if args.no_merge {
        println!("Segments kept in {}", scratch.display());
    } else if report.is_mergeable() {
        let merged = downloader.merge()?;
        print_merge(&merged);
    }

    if report.outcome == JobOutcome::PartialFailure {
        return Err(CliError::Incomplete {
            failed: report.failed.len(),
            total: report.total,
        });
    }

    Ok(())
}

fn print_summary(report: &JobReport) {
    match report.outcome {
        JobOutcome::Success => println!(
            "{} Downloaded {} segments",
            style("✓").green(),
            report.total
        ),
        JobOutcome::PartialFailure => {
            println!(
                "{} Downloaded {} of {} segments",
                style("!").yellow(),
                report.succeeded(),
                report.total
            );
            for failed in &report.failed {
                println!("  segment {}: {}", failed.index, failed.error);
            }
        }
        JobOutcome::Cancelled => println!(
            "{} Cancelled after {} of {} segments",
            style("✗").red(),
            report.succeeded(),
            report.total
        ),
    }
}

pub(crate) fn print_merge(merged: &MergeReport) {
    let method = match merged.method {
        MergeMethod::StreamCopy => "stream copy",
        MergeMethod::Concatenate => "raw concatenation",
    };
    println!(
        "{} Saved {} ({} segments, {} bytes, {})",
        style("✓").green(),
        merged.output.display(),
        merged.segments,
        merged.bytes,
        method
    );
}
