// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Buffered activity log writer
//
// Producers append to an in-memory buffer; a periodic task (or an explicit
// dump) serializes the buffer as delta lines and appends it to the live log.
// The buffer and the previous-timestamp cursor only advance once the append
// has fully succeeded, so a failed flush is retried with the same data.

use crate::activity::Activity;
use crate::error::{IoContext, Result};
use crate::format::LineEncoder;
use crate::timestamp::Timestamp;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

#[derive(Debug, Default)]
struct WriterState {
    pending: Vec<Activity>,
    previous: Timestamp,
}

/// Shared writer. All access goes through one mutex; `flush` holds it for
/// the duration of the file append.
#[derive(Debug, Default)]
pub struct LogWriter {
    state: Mutex<WriterState>,
}

impl LogWriter {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the state half-updated:
    // both fields are replaced only after the append succeeded.
    fn lock(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, activity: Activity) {
        trace!(category = %activity.category(), ts = %activity.timestamp(), "Recording activity");
        self.lock().pending.push(activity);
    }

    /// Number of buffered records not yet written
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Absolute timestamp the next delta is computed against
    pub fn previous(&self) -> Timestamp {
        self.lock().previous
    }

    /// Append all pending records to `path`. Returns how many were written.
    ///
    /// On error nothing is consumed; the next call retries the same records.
    pub fn flush(&self, path: &Path) -> Result<usize> {
        let mut state = self.lock();
        if state.pending.is_empty() {
            return Ok(0);
        }

        let mut encoder = LineEncoder::starting_at(state.previous);
        let text = encoder.encode_all(state.pending.iter());

        let written = append(path, text.as_bytes());
        if let Err(e) = written {
            warn!(path = %path.display(), pending = state.pending.len(), error = %e, "Flush failed, keeping buffer");
            return Err(e);
        }

        let count = state.pending.len();
        state.pending.clear();
        state.previous = encoder.previous();
        debug!(path = %path.display(), records = count, bytes = text.len(), "Flushed activities");
        Ok(count)
    }

    /// Forget the previous timestamp. Used after the live log was truncated so
    /// the next delta is relative to the reader's zero base again.
    pub fn reset_cursor(&self) {
        self.lock().previous = Timestamp::ZERO;
    }
}

/// Append `bytes` to `path`. An unterminated last line is closed first so the
/// new records never run into it.
pub(crate) fn append(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .with_path("open", path)?;
    if ends_mid_line(&mut file).with_path("inspect", path)? {
        trace!(path = %path.display(), "Terminating unfinished last line");
        file.write_all(b"\n").with_path("append to", path)?;
    }
    file.write_all(bytes).with_path("append to", path)?;
    file.flush().with_path("flush", path)?;
    Ok(())
}

fn ends_mid_line(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_flush_writes_deltas_and_clears() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live.log");
        let writer = LogWriter::new();

        writer.record(Activity::pointer_wheel(Timestamp::from_millis(100), 120));
        writer.record(Activity::pointer_move(Timestamp::from_millis(130), 4, 5));
        assert_eq!(writer.pending(), 2);

        assert_eq!(writer.flush(&path).unwrap(), 2);
        assert_eq!(writer.pending(), 0);
        assert_eq!(writer.previous(), Timestamp::from_millis(130));

        writer.record(Activity::key_press(Timestamp::from_millis(140), 'q'));
        writer.flush(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "100 6 120\n30 1 4 5\n10 9 q\n");
    }

    #[test]
    fn test_empty_flush_does_not_create_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live.log");
        let writer = LogWriter::new();

        assert_eq!(writer.flush(&path).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_flush_keeps_buffer_and_cursor() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be opened for appending
        let blocked = dir.path().join("blocked");
        fs::create_dir(&blocked).unwrap();
        let writer = LogWriter::new();

        writer.record(Activity::pointer_wheel(Timestamp::from_millis(50), 1));
        assert!(writer.flush(&blocked).is_err());
        assert_eq!(writer.pending(), 1);
        assert_eq!(writer.previous(), Timestamp::ZERO);

        let path = dir.path().join("live.log");
        assert_eq!(writer.flush(&path).unwrap(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "50 6 1\n");
    }

    #[test]
    fn test_flush_after_unterminated_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live.log");
        fs::write(&path, "0 10 2015-04-01_00:00:00.000 1\n5 6 9").unwrap();
        let writer = LogWriter::new();

        writer.record(Activity::pointer_wheel(Timestamp::from_millis(20), 1));
        writer.flush(&path).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "0 10 2015-04-01_00:00:00.000 1\n5 6 9\n20 6 1\n"
        );
    }

    #[test]
    fn test_reset_cursor() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live.log");
        let writer = LogWriter::new();

        writer.record(Activity::pointer_wheel(Timestamp::from_millis(500), 1));
        writer.flush(&path).unwrap();
        writer.reset_cursor();
        writer.record(Activity::pointer_wheel(Timestamp::from_millis(600), 2));
        writer.flush(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "500 6 1\n600 6 2\n");
    }
}
