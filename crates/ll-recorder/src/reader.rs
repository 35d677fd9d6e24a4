// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Streaming activity log reader
//
// Lines are parsed one at a time and absolute timestamps are rebuilt from the
// deltas: a sync marker moves the cursor to its payload time, every other
// record advances the cursor by its delta. Unreadable lines are skipped.

use crate::activity::Activity;
use crate::error::{IoContext, Result};
use crate::format::parse_line;
use crate::timestamp::Timestamp;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::trace;

/// Lazy iterator over the records of a log.
///
/// Yields `Err` for an I/O failure and then ends; parse failures never
/// surface as errors.
pub struct ActivityReader<R> {
    input: R,
    cursor: Timestamp,
    line: Vec<u8>,
    line_number: u64,
    skipped: u64,
    failed: bool,
}

impl<R: BufRead> ActivityReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            cursor: Timestamp::ZERO,
            line: Vec::new(),
            line_number: 0,
            skipped: 0,
            failed: false,
        }
    }

    /// Lines dropped so far because they did not parse
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn next_line(&mut self) -> io::Result<Option<Option<Activity>>> {
        self.line.clear();
        if self.input.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;

        let parsed = std::str::from_utf8(&self.line).ok().and_then(parse_line);
        let Some(parsed) = parsed else {
            self.skipped += 1;
            trace!(line = self.line_number, "Skipping unreadable log line");
            return Ok(Some(None));
        };

        self.cursor = match parsed.activity.anchor() {
            Some(absolute) => absolute,
            None => self.cursor + parsed.delta,
        };
        Ok(Some(Some(parsed.activity.with_timestamp(self.cursor))))
    }
}

impl<R: BufRead> Iterator for ActivityReader<R> {
    type Item = io::Result<Activity>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            match self.next_line() {
                Ok(None) => return None,
                Ok(Some(None)) => continue,
                Ok(Some(Some(activity))) => return Some(Ok(activity)),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Open `path` and stream its records. Each call starts from the beginning.
pub fn read_activities(path: &Path) -> Result<ActivityReader<BufReader<File>>> {
    let file = File::open(path).with_path("open", path)?;
    Ok(ActivityReader::new(BufReader::new(file)))
}
