// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use clap::Subcommand;
use ll_logging::CliLoggingArgs;
use std::path::PathBuf;

pub mod config;
pub mod console;
pub mod offline;
pub mod session;
pub mod tasks;

pub use clap::Parser;

#[derive(clap::Parser)]
#[command(
    name = "living-log",
    about = "Records keyboard and pointer activity into a plain-text log",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub recorder: config::RecorderArgs,
    #[command(flatten)]
    pub logging: CliLoggingArgs,
    /// Without a subcommand the interactive recorder starts
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Show size and line count of a log
    Stats {
        /// Log file (default: the live log)
        file: Option<PathBuf>,
    },
    /// Move a log into monthly archive files
    Split {
        /// Log file (default: the live log)
        file: Option<PathBuf>,
    },
    /// Reorder and deduplicate a log or archive in place
    Repair { file: PathBuf },
}
