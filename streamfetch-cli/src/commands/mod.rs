//! CLI subcommands.

pub mod config;
pub mod download;
pub mod merge;
