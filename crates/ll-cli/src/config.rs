// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Runtime configuration from flags and environment

use anyhow::{Result, bail};
use ll_recorder::DEFAULT_BLOCK_SIZE;
use std::path::PathBuf;
use std::time::Duration;

/// Flush interval when nothing else is configured
pub const DEFAULT_DUMP_INTERVAL_SECS: u64 = 60;

/// Sync heartbeat interval when nothing else is configured
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 3600;

pub const DEFAULT_LOG_NAME: &str = "living-log.log";

#[derive(Clone, Debug, Default, clap::Args)]
pub struct RecorderArgs {
    /// Live activity log
    #[arg(long = "log", global = true, env = "LIVING_LOG_FILE", value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Seconds between writes of buffered activity to the live log
    #[arg(long, env = "LIVING_LOG_DUMP_INTERVAL", default_value_t = DEFAULT_DUMP_INTERVAL_SECS)]
    pub dump_interval_secs: u64,

    /// Seconds between sync markers while recording
    #[arg(long, env = "LIVING_LOG_SYNC_INTERVAL", default_value_t = DEFAULT_SYNC_INTERVAL_SECS)]
    pub sync_interval_secs: u64,

    /// Records held in memory per block while splitting
    #[arg(long, global = true, default_value_t = DEFAULT_BLOCK_SIZE)]
    pub split_block_size: usize,

    /// Start with recording paused
    #[arg(long)]
    pub paused: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecorderConfig {
    pub log_path: PathBuf,
    pub dump_interval: Duration,
    pub sync_interval: Duration,
    pub split_block_size: usize,
    pub start_paused: bool,
}

impl RecorderConfig {
    pub fn from_args(args: &RecorderArgs) -> Result<Self> {
        if args.dump_interval_secs == 0 {
            bail!("--dump-interval-secs must be greater than zero");
        }
        if args.sync_interval_secs == 0 {
            bail!("--sync-interval-secs must be greater than zero");
        }
        if args.split_block_size == 0 {
            bail!("--split-block-size must be greater than zero");
        }

        Ok(Self {
            log_path: args.log.clone().unwrap_or_else(default_log_path),
            dump_interval: Duration::from_secs(args.dump_interval_secs),
            sync_interval: Duration::from_secs(args.sync_interval_secs),
            split_block_size: args.split_block_size,
            start_paused: args.paused,
        })
    }

    /// Default configuration recording into `log_path`
    pub fn for_log(log_path: PathBuf) -> Self {
        Self {
            log_path,
            dump_interval: Duration::from_secs(DEFAULT_DUMP_INTERVAL_SECS),
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            split_block_size: DEFAULT_BLOCK_SIZE,
            start_paused: false,
        }
    }
}

/// `living-log.log` in the user's documents folder, falling back to the home
/// directory and then the working directory.
pub fn default_log_path() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_LOG_NAME)
}
