// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Monthly archival of the live log
//
// Split moves every record of the live log into one archive file per
// calendar month (`<base>.<yyyy>-<mm><ext>`), reconciles each touched
// archive and finally truncates the live log. The whole run is a
// transaction: archives that existed are backed up to `<archive>.bak` before
// their first write, and any failure restores them (or removes archives the
// run created) while the live log stays as it was. A backup still present
// when a run starts is left over from an interrupted run and is restored
// before a new one is taken.

use crate::activity::Activity;
use crate::error::{IoContext, RecorderError, Result};
use crate::format::LineEncoder;
use crate::reader::read_activities;
use crate::reconcile::{blocks, process};
use crate::writer::{LogWriter, append as append_to_file};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

/// Default number of records held in memory per split block
pub const DEFAULT_BLOCK_SIZE: usize = 100_000;

/// Naming of files derived from a live log path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogInfo {
    dir: PathBuf,
    base_name: String,
    extension: String,
}

impl LogInfo {
    /// The file name is split at its last `.`; a name without one has an
    /// empty extension.
    pub fn new(path: &Path) -> Self {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (base_name, extension) = match name.rfind('.') {
            Some(i) => (name[..i].to_string(), name[i..].to_string()),
            None => (name, String::new()),
        };
        Self {
            dir,
            base_name,
            extension,
        }
    }

    pub fn archive_path(&self, year: i32, month: u32) -> PathBuf {
        self.dir.join(format!(
            "{}.{:04}-{:02}{}",
            self.base_name, year, month, self.extension
        ))
    }
}

/// Convenience wrapper over [`LogInfo::archive_path`]
pub fn archive_path(log: &Path, year: i32, month: u32) -> PathBuf {
    LogInfo::new(log).archive_path(year, month)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn backup_path(path: &Path) -> PathBuf {
    sibling(path, ".bak")
}

/// A backup found before a run starts is the last clean copy of `path`.
fn restore_stale_backup(path: &Path) -> Result<()> {
    let backup = backup_path(path);
    if !backup.is_file() {
        return Ok(());
    }
    warn!(archive = %path.display(), backup = %backup.display(), "Restoring archive from the backup of an interrupted run");
    fs::rename(&backup, path).with_path("restore", path)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitReport {
    /// Archives written, in (year, month) order
    pub archives: Vec<PathBuf>,
    /// Records moved out of the live log
    pub records: u64,
    /// Records archived at zero-based times because no sync marker preceded them
    pub unanchored: u64,
    /// Records dropped because their time falls outside the calendar range
    pub out_of_range: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitOutcome {
    /// Nothing to do; carries a human readable reason
    Skipped(String),
    Archived(SplitReport),
}

impl fmt::Display for SplitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitOutcome::Skipped(reason) => f.write_str(reason),
            SplitOutcome::Archived(report) => {
                write!(
                    f,
                    "Archived {} records into {} file(s)",
                    report.records,
                    report.archives.len()
                )?;
                if report.out_of_range > 0 {
                    write!(
                        f,
                        " ({} records with an impossible time skipped)",
                        report.out_of_range
                    )?;
                }
                for archive in &report.archives {
                    write!(f, "\n  {}", archive.display())?;
                }
                Ok(())
            }
        }
    }
}

struct TouchedArchive {
    backup: Option<PathBuf>,
    encoder: LineEncoder,
}

/// Archives touched by one split run, keyed by (year, month)
struct SplitTransaction {
    info: LogInfo,
    touched: BTreeMap<(i32, u32), TouchedArchive>,
}

impl SplitTransaction {
    fn new(log: &Path) -> Self {
        Self {
            info: LogInfo::new(log),
            touched: BTreeMap::new(),
        }
    }

    fn append(&mut self, month: (i32, u32), group: &[Activity]) -> Result<()> {
        let Some(first) = group.first() else {
            return Ok(());
        };
        let path = self.info.archive_path(month.0, month.1);
        let mut text = String::new();

        if !self.touched.contains_key(&month) {
            restore_stale_backup(&path)?;
            let backup = if path.exists() {
                let backup = backup_path(&path);
                fs::copy(&path, &backup).with_path("back up", &path)?;
                debug!(archive = %path.display(), backup = %backup.display(), "Backed up archive");
                Some(backup)
            } else {
                None
            };
            self.touched.insert(
                month,
                TouchedArchive {
                    backup,
                    encoder: LineEncoder::new(),
                },
            );
            if !first.is_sync_marker() {
                let anchor = Activity::sync(first.timestamp())?;
                if let Some(entry) = self.touched.get_mut(&month) {
                    entry.encoder.encode_into(&anchor, &mut text);
                }
            }
        }

        let Some(entry) = self.touched.get_mut(&month) else {
            return Ok(());
        };
        let mut encoder = entry.encoder;
        for activity in group {
            encoder.encode_into(activity, &mut text);
        }

        append_to_file(&path, text.as_bytes())?;
        entry.encoder = encoder;
        Ok(())
    }

    fn reconcile(&self) -> Result<()> {
        for &(year, month) in self.touched.keys() {
            let path = self.info.archive_path(year, month);
            let records = rewrite_reconciled(&path)?;
            debug!(archive = %path.display(), records, "Reconciled archive");
        }
        Ok(())
    }

    fn archives(&self) -> Vec<PathBuf> {
        self.touched
            .keys()
            .map(|&(year, month)| self.info.archive_path(year, month))
            .collect()
    }

    fn commit(self) {
        for entry in self.touched.values() {
            if let Some(backup) = &entry.backup {
                if let Err(e) = fs::remove_file(backup) {
                    warn!(backup = %backup.display(), error = %e, "Failed to remove archive backup");
                }
            }
        }
    }

    fn rollback(self) {
        for (&(year, month), entry) in &self.touched {
            let path = self.info.archive_path(year, month);
            let _ = fs::remove_file(sibling(&path, ".tmp"));
            let restored = match &entry.backup {
                Some(backup) => fs::rename(backup, &path),
                None => match fs::remove_file(&path) {
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                    other => other,
                },
            };
            match restored {
                Ok(()) => debug!(archive = %path.display(), "Rolled back archive"),
                Err(e) => warn!(archive = %path.display(), error = %e, "Failed to roll back archive"),
            }
        }
    }
}

/// Read `path`, reconcile it and replace it atomically. Returns the number of
/// records kept. A non-empty result always starts with a sync marker.
fn rewrite_reconciled(path: &Path) -> Result<usize> {
    let raw = read_activities(path)?
        .collect::<io::Result<Vec<_>>>()
        .with_path("read", path)?;
    let total = raw.len();
    let raw: Vec<Activity> = raw.into_iter().filter(in_calendar_range).collect();
    if raw.len() < total {
        warn!(log = %path.display(), dropped = total - raw.len(), "Dropped records outside the calendar range");
    }
    let mut records: Vec<Activity> = process(raw).collect();
    if let Some(first) = records.first() {
        if !first.is_sync_marker() {
            let anchor = Activity::sync(first.timestamp())?;
            records.insert(0, anchor);
        }
    }

    let text = LineEncoder::new().encode_all(records.iter());
    let temp = sibling(path, ".tmp");
    {
        let mut file = File::create(&temp).with_path("create", &temp)?;
        file.write_all(text.as_bytes()).with_path("write", &temp)?;
        file.sync_all().with_path("sync", &temp)?;
    }
    fs::rename(&temp, path).with_path("replace", path)?;
    Ok(records.len())
}

fn in_calendar_range(activity: &Activity) -> bool {
    activity.timestamp().to_calendar().is_some()
}

fn check_log(path: &Path) -> Result<Option<String>> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => Ok(Some(format!("{} is empty", path.display()))),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Ok(Some(format!("{} does not exist", path.display())))
        }
        Err(e) => Err(RecorderError::file("inspect", path, e)),
    }
}

/// Move the live log at `path` into monthly archives.
///
/// The caller must keep producers away from `writer` for the duration.
/// Pending records are flushed first. On error every touched archive is
/// restored and the live log is left untouched, except for
/// [`RecorderError::LiveLogNotTruncated`]: the archives are then complete and
/// only emptying the live log failed.
pub fn split_log(writer: &LogWriter, path: &Path, block_size: usize) -> Result<SplitOutcome> {
    writer.flush(path)?;
    if let Some(reason) = check_log(path)? {
        info!(log = %path.display(), %reason, "Nothing to split");
        return Ok(SplitOutcome::Skipped(reason));
    }

    info!(log = %path.display(), block_size, "Splitting activity log");
    let mut transaction = SplitTransaction::new(path);
    let result = archive_records(&mut transaction, path, block_size)
        .and_then(|report| transaction.reconcile().map(|()| report));

    let counts = match result {
        Ok(counts) => counts,
        Err(e) => {
            warn!(log = %path.display(), error = %e, "Split failed, rolling back");
            transaction.rollback();
            return Err(e);
        }
    };

    let archives = transaction.archives();
    transaction.commit();
    File::create(path).map_err(|source| RecorderError::LiveLogNotTruncated {
        path: path.to_path_buf(),
        source,
    })?;
    writer.reset_cursor();

    if counts.unanchored > 0 {
        warn!(log = %path.display(), unanchored = counts.unanchored, "Archived records without a preceding sync marker at zero-based times");
    }
    if counts.out_of_range > 0 {
        warn!(log = %path.display(), out_of_range = counts.out_of_range, "Skipped records outside the calendar range");
    }
    info!(log = %path.display(), records = counts.records, archives = archives.len(), "Split complete");
    Ok(SplitOutcome::Archived(SplitReport {
        archives,
        records: counts.records,
        unanchored: counts.unanchored,
        out_of_range: counts.out_of_range,
    }))
}

#[derive(Default)]
struct RecordCounts {
    records: u64,
    unanchored: u64,
    out_of_range: u64,
}

fn archive_records(
    transaction: &mut SplitTransaction,
    path: &Path,
    block_size: usize,
) -> Result<RecordCounts> {
    let mut counts = RecordCounts::default();
    let mut anchored = false;

    for block in blocks(read_activities(path)?, block_size) {
        let block = block
            .into_iter()
            .collect::<io::Result<Vec<_>>>()
            .with_path("read", path)?;

        let mut months: BTreeMap<(i32, u32), Vec<Activity>> = BTreeMap::new();
        for activity in block {
            let ts = activity.timestamp();
            let Some(month) = ts.year_month() else {
                trace!(log = %path.display(), ms = ts.millis(), "Skipping record outside the calendar range");
                counts.out_of_range += 1;
                continue;
            };
            anchored |= activity.is_sync_marker();
            if !anchored {
                counts.unanchored += 1;
            }
            months.entry(month).or_default().push(activity);
            counts.records += 1;
        }
        for (month, group) in &months {
            transaction.append(*month, group)?;
        }
    }
    Ok(counts)
}

/// Reconcile a single log file in place. Returns the number of records kept,
/// or `None` when there is no file or it is empty.
pub fn repair_log(path: &Path) -> Result<Option<usize>> {
    restore_stale_backup(path)?;
    if let Some(reason) = check_log(path)? {
        info!(log = %path.display(), %reason, "Nothing to repair");
        return Ok(None);
    }

    let backup = backup_path(path);
    fs::copy(path, &backup).with_path("back up", path)?;
    match rewrite_reconciled(path) {
        Ok(records) => {
            if let Err(e) = fs::remove_file(&backup) {
                warn!(backup = %backup.display(), error = %e, "Failed to remove backup");
            }
            info!(log = %path.display(), records, "Repaired log");
            Ok(Some(records))
        }
        Err(e) => {
            let _ = fs::remove_file(sibling(path, ".tmp"));
            if let Err(restore) = fs::rename(&backup, path) {
                warn!(log = %path.display(), error = %restore, "Failed to restore log from backup");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_naming() {
        let info = LogInfo::new(Path::new("/data/living-log.log"));
        assert_eq!(
            info.archive_path(2015, 5),
            PathBuf::from("/data/living-log.2015-05.log")
        );
        assert_eq!(
            archive_path(Path::new("notes.tar.txt"), 987, 12),
            PathBuf::from("notes.tar.0987-12.txt")
        );
        assert_eq!(
            archive_path(Path::new("/v1.2/activity"), 2020, 1),
            PathBuf::from("/v1.2/activity.2020-01")
        );
    }

    #[test]
    fn test_backup_names() {
        let path = Path::new("/data/living-log.2015-05.log");
        assert_eq!(
            backup_path(path),
            PathBuf::from("/data/living-log.2015-05.log.bak")
        );
    }

    #[test]
    fn test_split_outcome_message() {
        let outcome = SplitOutcome::Skipped("live.log is empty".to_string());
        assert_eq!(outcome.to_string(), "live.log is empty");
    }
}
