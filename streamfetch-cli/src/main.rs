//! streamfetch CLI - Command-line interface
//!
//! Downloads the media segments of an HLS playlist in parallel and merges
//! them into one file.

mod commands;
mod error;
mod progress;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;

use commands::config::ConfigCommands;
use commands::download::DownloadArgs;
use commands::merge::MergeArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Debug, Parser)]
#[command(name = "streamfetch", version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download a playlist's segments and merge them into one file
    Download {
        /// URL of the HLS media playlist (.m3u8)
        url: String,

        /// Output directory (default: download.save_dir from config, else ".")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of parallel downloads (1-50)
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Attempts per segment before giving up
        #[arg(long)]
        attempts: Option<u32>,

        /// Keep the segments on disk without merging
        #[arg(long)]
        no_merge: bool,

        /// Keep the segment files after merging
        #[arg(long)]
        keep_segments: bool,
    },

    /// Merge segments left on disk by an earlier download
    Merge {
        /// Directory the download was saved to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the segment files after merging
        #[arg(long)]
        keep_segments: bool,
    },

    /// View or edit configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Download {
            url,
            output,
            concurrency,
            attempts,
            no_merge,
            keep_segments,
        } => {
            let runner = CliRunner::new(cli.verbose)?;
            commands::download::run(
                DownloadArgs {
                    url,
                    output,
                    concurrency,
                    attempts,
                    no_merge,
                    keep_segments,
                },
                &runner,
            )
        }
        Commands::Merge {
            output,
            keep_segments,
        } => {
            let runner = CliRunner::new(cli.verbose)?;
            commands::merge::run(
                MergeArgs {
                    output,
                    keep_segments,
                },
                &runner,
            )
        }
        Commands::Config { command } => commands::config::run(command),
    }
}
