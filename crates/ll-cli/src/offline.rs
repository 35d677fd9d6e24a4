// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! One-shot subcommands that work on log files without recording

use crate::Commands;
use crate::config::RecorderConfig;
use crate::session::split_failure;
use anyhow::{Context, Result};
use ll_recorder::{LogWriter, log_stats, repair_log, split_log};
use std::path::Path;

/// Run `command` and return the text to print
pub fn run(command: &Commands, config: &RecorderConfig) -> Result<String> {
    let live = config.log_path.as_path();
    match command {
        Commands::Stats { file } => stats(file.as_deref().unwrap_or(live)),
        Commands::Split { file } => split(file.as_deref().unwrap_or(live), config.split_block_size),
        Commands::Repair { file } => repair(file),
    }
}

fn stats(path: &Path) -> Result<String> {
    let stats = log_stats(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(match stats {
        Some(stats) => format!("{}: {}", path.display(), stats),
        None => format!("{} does not exist", path.display()),
    })
}

fn split(path: &Path, block_size: usize) -> Result<String> {
    // Nothing is buffered in a one-shot run, so a fresh writer only serves
    // the flush step.
    let writer = LogWriter::new();
    let outcome = split_log(&writer, path, block_size).map_err(|e| split_failure(path, e))?;
    Ok(outcome.to_string())
}

fn repair(path: &Path) -> Result<String> {
    let repaired = repair_log(path)
        .with_context(|| format!("Repair of {} failed, the file was restored", path.display()))?;
    Ok(match repaired {
        Some(records) => format!("{}: {} records after reconciliation", path.display(), records),
        None => format!("{} is missing or empty", path.display()),
    })
}
