//! Merge command - reassemble segments left on disk by an earlier run.

use std::path::PathBuf;
use std::sync::Arc;

use streamfetch::{Downloader, ReqwestClient};

use super::download::print_merge;
use crate::error::CliError;
use crate::progress::BarSink;
use crate::runner::CliRunner;

/// Arguments for the merge command.
pub struct MergeArgs {
    pub output: Option<PathBuf>,
    pub keep_segments: bool,
}

/// Run the merge command.
pub fn run(args: MergeArgs, runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("merge");
    let file = runner.config();

    let mut config = file.to_download_config();
    if args.keep_segments {
        config = config.with_keep_segments(true);
    }
    let save_path = args
        .output
        .or_else(|| file.download.save_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    println!("Merging segments in {}", config.scratch_dir(&save_path).display());

    let client = ReqwestClient::new(&config).map_err(CliError::Client)?;
    let sink = Arc::new(BarSink::new());
    let downloader = Downloader::new(config, Arc::new(client), sink.clone());

    let result = downloader.merge_dir(&save_path);
    sink.finish();
    let merged = result?;

    print_merge(&merged);
    Ok(())
}
