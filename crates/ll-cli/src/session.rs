// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Recorder session
//
// Owns the shared writer and the enabled flag. Event sources get an
// `ActivitySink` that drops activity while recording is paused. Console
// commands are dispatched through `Session::handle`, which never fails: every
// outcome is turned into a message for the user.

use crate::config::RecorderConfig;
use anyhow::{Context, Result, bail};
use ll_recorder::{
    Activity, Category, LogStats, LogWriter, RecorderError, SplitOutcome, Timestamp, log_stats,
    split_log,
};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Pause,
    Resume,
    Stats,
    Split,
    Dump,
    Exit,
    Help,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pause" => Ok(Command::Pause),
            "resume" => Ok(Command::Resume),
            "stats" => Ok(Command::Stats),
            "split" => Ok(Command::Split),
            "dump" => Ok(Command::Dump),
            "exit" | "quit" => Ok(Command::Exit),
            "help" | "?" => Ok(Command::Help),
            other => Err(format!(
                "Unknown command '{}'. Type 'help' for the list of commands",
                other
            )),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Stats => "stats",
            Command::Split => "split",
            Command::Dump => "dump",
            Command::Exit => "exit",
            Command::Help => "help",
        };
        f.write_str(name)
    }
}

pub const HELP: &str = "\
Commands:
  pause   stop recording (writes an exit marker)
  resume  start recording (writes a startup marker)
  stats   show size and line count of the live log
  split   move the live log into monthly archives (pause first)
  dump    write buffered activity to the live log now
  exit    pause, write everything and quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Message(String),
    Exit(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Message(text) | Reply::Exit(text) => text,
        }
    }
}

/// Only a failure to empty the live log happens after the archives were
/// committed; every other split error was rolled back.
pub(crate) fn split_failure(path: &Path, error: RecorderError) -> anyhow::Error {
    let message = match &error {
        RecorderError::LiveLogNotTruncated { .. } => format!(
            "Split archived {} but could not empty it",
            path.display()
        ),
        _ => format!(
            "Split of {} failed, archives and live log were left as they were",
            path.display()
        ),
    };
    anyhow::Error::new(error).context(message)
}

/// Producer-side handle. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ActivitySink {
    writer: Arc<LogWriter>,
    enabled: Arc<AtomicBool>,
}

impl ActivitySink {
    /// Returns whether the activity was accepted
    pub fn submit(&self, activity: Activity) -> bool {
        if !self.enabled.load(Ordering::Acquire) {
            return false;
        }
        self.writer.record(activity);
        true
    }
}

#[derive(Debug)]
pub struct Session {
    config: RecorderConfig,
    writer: Arc<LogWriter>,
    enabled: Arc<AtomicBool>,
}

impl Session {
    /// Starts paused; call `resume` to begin recording.
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            writer: Arc::new(LogWriter::new()),
            enabled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn writer(&self) -> &LogWriter {
        &self.writer
    }

    pub fn sink(&self) -> ActivitySink {
        ActivitySink {
            writer: Arc::clone(&self.writer),
            enabled: Arc::clone(&self.enabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn mark(&self, category: Category) -> Result<()> {
        let marker = Activity::sync_marker(category, Timestamp::now())
            .context("Failed to build sync marker")?;
        self.writer.record(marker);
        Ok(())
    }

    /// Returns false when recording was already on
    pub fn resume(&self) -> Result<bool> {
        if self.enabled.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }
        self.mark(Category::Startup)?;
        info!("Recording resumed");
        Ok(true)
    }

    /// Returns false when recording was already off
    pub fn pause(&self) -> Result<bool> {
        if !self.enabled.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }
        self.mark(Category::Exit)?;
        info!("Recording paused");
        Ok(true)
    }

    /// Record a periodic sync marker while recording
    pub fn heartbeat(&self) -> Result<bool> {
        if !self.is_enabled() {
            return Ok(false);
        }
        self.mark(Category::Sync)?;
        debug!("Recorded sync marker");
        Ok(true)
    }

    pub fn dump(&self) -> ll_recorder::Result<usize> {
        self.writer.flush(&self.config.log_path)
    }

    pub fn stats(&self) -> Result<Option<LogStats>> {
        let path = &self.config.log_path;
        log_stats(path).with_context(|| format!("Failed to read stats of {}", path.display()))
    }

    pub fn split(&self) -> Result<SplitOutcome> {
        if self.is_enabled() {
            bail!("Recording is active. Pause it before splitting");
        }
        let path = &self.config.log_path;
        split_log(&self.writer, path, self.config.split_block_size)
            .map_err(|e| split_failure(path, e))
    }

    pub fn handle(&self, command: Command) -> Reply {
        debug!(%command, "Handling command");
        match command {
            Command::Pause => Reply::Message(match self.pause() {
                Ok(true) => "Recording paused".to_string(),
                Ok(false) => "Recording is already paused".to_string(),
                Err(e) => format!("{:#}", e),
            }),
            Command::Resume => Reply::Message(match self.resume() {
                Ok(true) => "Recording resumed".to_string(),
                Ok(false) => "Recording is already active".to_string(),
                Err(e) => format!("{:#}", e),
            }),
            Command::Stats => Reply::Message(self.stats_message()),
            Command::Split => Reply::Message(match self.split() {
                Ok(outcome) => outcome.to_string(),
                Err(e) => {
                    warn!(error = %format!("{:#}", e), "Split refused or failed");
                    format!("{:#}", e)
                }
            }),
            Command::Dump => Reply::Message(self.dump_message()),
            Command::Exit => {
                let mut text = String::new();
                if let Err(e) = self.pause() {
                    text.push_str(&format!("{:#}\n", e));
                }
                text.push_str(&self.dump_message());
                Reply::Exit(text)
            }
            Command::Help => Reply::Message(HELP.to_string()),
        }
    }

    fn stats_message(&self) -> String {
        let path = self.config.log_path.display();
        match self.stats() {
            Ok(Some(stats)) => format!("{}: {}", path, stats),
            Ok(None) => format!("{} does not exist", path),
            Err(e) => format!("{:#}", e),
        }
    }

    fn dump_message(&self) -> String {
        let path = self.config.log_path.display();
        match self.dump() {
            Ok(0) => "Nothing to write".to_string(),
            Ok(count) => format!("Wrote {} activities to {}", count, path),
            Err(e) => format!(
                "Could not write to {} ({}); {} activities kept for the next attempt",
                path,
                e,
                self.writer.pending()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ll_recorder::read_activities;
    use tempfile::TempDir;

    fn session(dir: &TempDir) -> Session {
        Session::new(RecorderConfig::for_log(dir.path().join("living-log.log")))
    }

    fn categories(path: &Path) -> Vec<Category> {
        read_activities(path)
            .unwrap()
            .map(|a| a.unwrap().category())
            .collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("pause".parse::<Command>(), Ok(Command::Pause));
        assert_eq!(" Resume \n".parse::<Command>(), Ok(Command::Resume));
        assert_eq!("STATS".parse::<Command>(), Ok(Command::Stats));
        assert_eq!("quit".parse::<Command>(), Ok(Command::Exit));
        assert!("rewind".parse::<Command>().is_err());
    }

    #[test]
    fn test_sink_drops_while_paused() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir);
        let sink = session.sink();

        assert!(!sink.submit(Activity::pointer_wheel(Timestamp::now(), 1)));
        assert_eq!(session.writer().pending(), 0);

        session.resume().unwrap();
        assert!(sink.submit(Activity::pointer_wheel(Timestamp::now(), 1)));
        assert_eq!(session.writer().pending(), 2);
    }

    #[test]
    fn test_lifecycle_markers() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir);

        assert!(session.resume().unwrap());
        assert!(!session.resume().unwrap());
        assert!(session.heartbeat().unwrap());
        assert!(session.pause().unwrap());
        assert!(!session.pause().unwrap());
        assert!(!session.heartbeat().unwrap());
        session.dump().unwrap();

        assert_eq!(
            categories(&session.config().log_path),
            vec![Category::Startup, Category::Sync, Category::Exit]
        );
    }

    #[test]
    fn test_split_refused_while_recording() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir);
        session.resume().unwrap();

        let reply = session.handle(Command::Split);
        assert!(reply.text().contains("Pause it before splitting"));
        assert!(!session.config().log_path.exists());
    }

    #[test]
    fn test_exit_pauses_and_writes() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir);
        session.resume().unwrap();
        session.sink().submit(Activity::key_press(Timestamp::now(), 'k'));

        let reply = session.handle(Command::Exit);
        assert!(matches!(reply, Reply::Exit(_)));
        assert!(!session.is_enabled());
        assert_eq!(
            categories(&session.config().log_path),
            vec![Category::Startup, Category::KeyPress, Category::Exit]
        );
    }

    #[test]
    fn test_stats_and_split_messages() {
        let dir = TempDir::new().unwrap();
        let session = session(&dir);

        let reply = session.handle(Command::Stats);
        assert!(reply.text().ends_with("does not exist"));

        session.resume().unwrap();
        session.handle(Command::Pause);
        let reply = session.handle(Command::Split);
        assert!(reply.text().starts_with("Archived 2 records"), "{}", reply.text());

        let reply = session.handle(Command::Stats);
        assert!(reply.text().ends_with("0 bytes, 0 lines"), "{}", reply.text());
    }

    #[test]
    fn test_split_failure_wording() {
        let path = Path::new("/data/living-log.log");
        let denied = || std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");

        let committed = split_failure(
            path,
            RecorderError::LiveLogNotTruncated {
                path: path.to_path_buf(),
                source: denied(),
            },
        );
        let text = format!("{:#}", committed);
        assert!(text.starts_with("Split archived /data/living-log.log but could not empty it"), "{text}");
        assert!(!text.contains("left as they were"));

        let rolled_back = split_failure(path, RecorderError::Io(denied()));
        assert!(format!("{:#}", rolled_back).contains("archives and live log were left as they were"));
    }
}
