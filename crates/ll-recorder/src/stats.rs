// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Size and line counts of a log file

use crate::error::{IoContext, Result};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogStats {
    pub bytes: u64,
    pub lines: u64,
}

impl fmt::Display for LogStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes, {} lines",
            human_count(self.bytes),
            human_count(self.lines)
        )
    }
}

/// `None` when the file does not exist
pub fn log_stats(path: &Path) -> Result<Option<LogStats>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_path("open", path),
    };
    let bytes = file.metadata().with_path("inspect", path)?.len();
    let lines = count_lines(BufReader::new(file)).with_path("read", path)?;
    Ok(Some(LogStats { bytes, lines }))
}

// A final line without a newline still counts.
fn count_lines<R: BufRead>(mut input: R) -> io::Result<u64> {
    let mut lines = 0u64;
    let mut open_line = false;
    loop {
        let chunk = input.fill_buf()?;
        if chunk.is_empty() {
            break;
        }
        lines += chunk.iter().filter(|&&b| b == b'\n').count() as u64;
        open_line = chunk.last() != Some(&b'\n');
        let consumed = chunk.len();
        input.consume(consumed);
    }
    Ok(lines + u64::from(open_line))
}

/// Compact rendering of a count: `999`, `1.2K`, `12K`, `123K`, `1.2M`, ...
pub fn human_count(value: u64) -> String {
    const UNITS: [&str; 7] = ["", "K", "M", "G", "T", "P", "E"];

    if value < 1000 {
        return value.to_string();
    }
    let mut scaled = value as f64;
    let mut unit = 0;
    while scaled >= 999.5 && unit < UNITS.len() - 1 {
        scaled /= 1000.0;
        unit += 1;
    }
    if scaled >= 9.95 {
        format!("{:.0}{}", scaled, UNITS[unit])
    } else {
        format!("{:.1}{}", scaled, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_human_count() {
        assert_eq!(human_count(0), "0");
        assert_eq!(human_count(999), "999");
        assert_eq!(human_count(1_234), "1.2K");
        assert_eq!(human_count(12_345), "12K");
        assert_eq!(human_count(123_456), "123K");
        assert_eq!(human_count(999_999), "1.0M");
        assert_eq!(human_count(1_234_567), "1.2M");
        assert_eq!(human_count(5_000_000_000), "5.0G");
        assert_eq!(human_count(u64::MAX), "18E");
    }

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines(Cursor::new(b"")).unwrap(), 0);
        assert_eq!(count_lines(Cursor::new(b"a\nb\n")).unwrap(), 2);
        assert_eq!(count_lines(Cursor::new(b"a\nb")).unwrap(), 2);
        assert_eq!(count_lines(Cursor::new(b"\n\n\n")).unwrap(), 3);
    }

    #[test]
    fn test_log_stats() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live.log");
        assert_eq!(log_stats(&path).unwrap(), None);

        std::fs::write(&path, "10 6 1\n5 6 2\n").unwrap();
        assert_eq!(
            log_stats(&path).unwrap(),
            Some(LogStats { bytes: 13, lines: 2 })
        );
    }
}
