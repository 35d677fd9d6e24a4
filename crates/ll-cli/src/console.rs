// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Interactive command loop
//
// Reads one command per line, runs it on the blocking pool and prints the
// reply. Ends on `exit`, on end of input, or when Ctrl-C is received; the
// last two are treated exactly like `exit`.

use crate::session::{Command, Reply, Session};
use crate::tasks::{spawn_flush_task, spawn_sync_task};
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{info, warn};

const PROMPT: &str = "> ";

async fn run_command(session: &Arc<Session>, command: Command) -> Result<Reply> {
    let session = Arc::clone(session);
    tokio::task::spawn_blocking(move || session.handle(command))
        .await
        .context("Command task failed")
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

/// Drive `session` from `input` until exit. `interrupt` resolving acts as an
/// `exit` command.
pub async fn run_console<R, W, I>(
    session: Arc<Session>,
    input: R,
    mut output: W,
    interrupt: I,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    I: Future,
{
    let mut lines = input.lines();
    tokio::pin!(interrupt);

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read command")?,
            _ = &mut interrupt => {
                info!("Interrupted");
                None
            }
        };
        let Some(line) = line else {
            let reply = run_command(&session, Command::Exit).await?;
            write_line(&mut output, reply.text()).await?;
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(message) => {
                write_line(&mut output, &message).await?;
                continue;
            }
        };
        match run_command(&session, command).await? {
            Reply::Message(text) => write_line(&mut output, &text).await?,
            Reply::Exit(text) => {
                write_line(&mut output, &text).await?;
                return Ok(());
            }
        }
    }
}

/// Interactive recorder on stdin/stdout with the background timers running
pub async fn run_interactive(session: Arc<Session>) -> Result<()> {
    let (stop, shutdown) = watch::channel(false);
    let flush = spawn_flush_task(Arc::clone(&session), shutdown.clone());
    let sync = spawn_sync_task(Arc::clone(&session), shutdown);

    if !session.config().start_paused {
        session.resume()?;
    }
    info!(log = %session.config().log_path.display(), recording = session.is_enabled(), "Recorder started");

    let mut stdout = tokio::io::stdout();
    write_line(
        &mut stdout,
        &format!(
            "Recording to {} ({}). Type 'help' for commands.",
            session.config().log_path.display(),
            if session.is_enabled() { "active" } else { "paused" }
        ),
    )
    .await?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let result = run_console(Arc::clone(&session), stdin, stdout, tokio::signal::ctrl_c()).await;

    let _ = stop.send(true);
    for task in [flush, sync] {
        if let Err(e) = task.await {
            warn!(error = %e, "Background task ended abnormally");
        }
    }
    result
}
