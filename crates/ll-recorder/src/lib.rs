// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Living Log activity recording
//
// Input activity is buffered by a `LogWriter` and appended to a plain-text,
// delta-encoded live log. The live log can be streamed back with
// `read_activities`, cleaned up by the reconciliation pipeline and moved into
// monthly archive files by `split_log`.

pub mod activity;
pub mod archive;
pub mod category;
pub mod error;
pub mod format;
pub mod reader;
pub mod reconcile;
pub mod stats;
pub mod timestamp;
pub mod varint;
pub mod writer;

// Re-export key types for convenience
pub use activity::{Activity, KeyCode, Payload, PayloadKind, PointerButton, SYNC_VERSION, SyncInfo};
pub use archive::{
    DEFAULT_BLOCK_SIZE, LogInfo, SplitOutcome, SplitReport, archive_path, repair_log, split_log,
};
pub use category::Category;
pub use error::{RecorderError, Result};
pub use format::{LineEncoder, LogLine, parse_line};
pub use reader::{ActivityReader, read_activities};
pub use stats::{LogStats, human_count, log_stats};
pub use timestamp::{SYNC_TIME_FORMAT, Timestamp};
pub use writer::LogWriter;
