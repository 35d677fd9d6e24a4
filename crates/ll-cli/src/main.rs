// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use ll_cli::config::RecorderConfig;
use ll_cli::session::Session;
use ll_cli::{Cli, Parser, console, offline};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = RecorderConfig::from_args(&cli.recorder)?;

    // The interactive recorder owns the console, so its diagnostics go to a file
    let interactive = cli.command.is_none();
    cli.logging.init("living-log", interactive)?;

    match cli.command {
        Some(command) => {
            let text = tokio::task::spawn_blocking(move || offline::run(&command, &config)).await??;
            println!("{}", text);
            Ok(())
        }
        None => console::run_interactive(Arc::new(Session::new(config))).await,
    }
}
