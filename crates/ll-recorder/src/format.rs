// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Text line format for activity logs
//
// Each record is one newline-terminated line:
//
//   <signed delta millis> <category id> <payload text>
//
// The payload is everything after the second space and may itself contain
// spaces. Deltas are relative to the previous record's absolute timestamp
// (the first one to zero); sync markers additionally carry their absolute
// time in the payload, which resets the base when reading.

use crate::activity::Activity;
use crate::category::Category;
use crate::timestamp::Timestamp;

/// A parsed line before absolute-time reconstruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub delta: Timestamp,
    /// Carries `delta` as its timestamp until the reader rebases it
    pub activity: Activity,
}

/// Parse one line. Any field that fails to parse, or an unknown category id,
/// makes the whole line unreadable.
pub fn parse_line(line: &str) -> Option<LogLine> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return None;
    }

    let mut fields = line.splitn(3, ' ');
    let delta = Timestamp::from_millis(fields.next()?.parse().ok()?);
    let category = Category::lookup(fields.next()?.parse().ok()?)?;
    let payload = category.parse_payload(fields.next()?)?;
    let activity = Activity::new(delta, category, payload).ok()?;

    Some(LogLine { delta, activity })
}

/// Encodes records as delta lines, tracking the previous absolute timestamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineEncoder {
    previous: Timestamp,
}

impl LineEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(previous: Timestamp) -> Self {
        Self { previous }
    }

    pub fn previous(&self) -> Timestamp {
        self.previous
    }

    /// Append the line for `activity` to `out` and advance the cursor
    pub fn encode_into(&mut self, activity: &Activity, out: &mut String) {
        let delta = activity.timestamp() - self.previous;
        out.push_str(&format!(
            "{} {} {}\n",
            delta,
            activity.category().id(),
            activity.payload()
        ));
        self.previous = activity.timestamp();
    }

    pub fn encode_all<'a, I>(&mut self, activities: I) -> String
    where
        I: IntoIterator<Item = &'a Activity>,
    {
        let mut out = String::new();
        for activity in activities {
            self.encode_into(activity, &mut out);
        }
        out
    }
}
