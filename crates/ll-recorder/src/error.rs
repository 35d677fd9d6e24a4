// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for activity recording and log maintenance

use crate::category::Category;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for recorder operations
pub type Result<T> = std::result::Result<T, RecorderError>;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to {action} {path}: {source}")]
    File {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Archives were written but the live log {path} could not be emptied: {source}")]
    LiveLogNotTruncated {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Payload '{payload}' does not belong to category {category}")]
    PayloadMismatch { category: Category, payload: String },

    #[error("Timestamp {0} ms is outside the calendar range")]
    TimestampOutOfRange(i64),
}

impl RecorderError {
    pub(crate) fn file(action: &'static str, path: &Path, source: io::Error) -> Self {
        RecorderError::File {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Attach the failing action and path to an I/O result
pub(crate) trait IoContext<T> {
    fn with_path(self, action: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn with_path(self, action: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| RecorderError::file(action, path, source))
    }
}
