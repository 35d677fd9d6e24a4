// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Activity records and their payloads
//
// Payload is a closed union with one shape per category family. The text
// rendering produced by `Display` is what lands in the log after the
// category id, and `PayloadKind::parse` is its inverse.

use crate::category::Category;
use crate::error::{RecorderError, Result};
use crate::timestamp::{Timestamp, SYNC_TIME_FORMAT};
use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

/// Version string written into sync-marker payloads
pub const SYNC_VERSION: &str = "1";

/// Payload codec selector stored in the category registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Sync,
    PointerButton,
    PointerWheel,
    PointerMove,
    KeyCode,
    KeyChar,
}

impl PayloadKind {
    /// Parse payload text. Returns `None` unless the whole text is a valid
    /// rendering for this kind.
    pub fn parse(self, text: &str) -> Option<Payload> {
        if text.is_empty() {
            return None;
        }
        match self {
            PayloadKind::Sync => SyncInfo::parse(text).map(Payload::Sync),
            PayloadKind::PointerButton => text.parse().ok().map(Payload::PointerButton),
            PayloadKind::PointerWheel => text.parse().ok().map(Payload::PointerWheel),
            PayloadKind::PointerMove => {
                let mut items = text.split(' ');
                let x = items.next()?.parse().ok()?;
                let y = items.next()?.parse().ok()?;
                if items.next().is_some() {
                    return None;
                }
                Some(Payload::PointerMove { x, y })
            }
            PayloadKind::KeyCode => KeyCode::new(text).map(Payload::KeyCode),
            PayloadKind::KeyChar => parse_key_char(text).map(Payload::KeyChar),
        }
    }
}

/// Absolute time anchor carried by Startup, Sync and Exit records
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncInfo {
    time: NaiveDateTime,
    version: String,
}

impl SyncInfo {
    pub fn at(timestamp: Timestamp) -> Result<Self> {
        let time = timestamp
            .to_calendar()
            .ok_or(RecorderError::TimestampOutOfRange(timestamp.millis()))?;
        Ok(Self {
            time,
            version: SYNC_VERSION.to_string(),
        })
    }

    pub fn time(&self) -> NaiveDateTime {
        self.time
    }

    pub fn timestamp(&self) -> Timestamp {
        Timestamp::from_datetime(self.time)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn parse(text: &str) -> Option<Self> {
        let (time, version) = text.split_once(' ')?;
        if version.contains(' ') {
            return None;
        }
        let time = NaiveDateTime::parse_from_str(time, SYNC_TIME_FORMAT).ok()?;
        Some(Self {
            time,
            version: version.to_string(),
        })
    }
}

impl fmt::Display for SyncInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.time.format(SYNC_TIME_FORMAT), self.version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    None,
    Left,
    Right,
    Middle,
    XButton1,
    XButton2,
}

impl PointerButton {
    pub fn as_str(self) -> &'static str {
        match self {
            PointerButton::None => "None",
            PointerButton::Left => "Left",
            PointerButton::Right => "Right",
            PointerButton::Middle => "Middle",
            PointerButton::XButton1 => "XButton1",
            PointerButton::XButton2 => "XButton2",
        }
    }
}

impl FromStr for PointerButton {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "None" => Ok(PointerButton::None),
            "Left" => Ok(PointerButton::Left),
            "Right" => Ok(PointerButton::Right),
            "Middle" => Ok(PointerButton::Middle),
            "XButton1" => Ok(PointerButton::XButton1),
            "XButton2" => Ok(PointerButton::XButton2),
            _ => Err(format!("Invalid pointer button: {}", s)),
        }
    }
}

impl fmt::Display for PointerButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Symbolic key name as reported by the keyboard source (`A`, `Return`,
/// `LShiftKey`, `D7`, ...). Restricted to a single ASCII word so it survives
/// the space-separated line format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCode(String);

impl KeyCode {
    pub fn new(name: &str) -> Option<Self> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        valid.then(|| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Control characters would break the line framing, so they are written as
// `U+XXXX`. Any other character is written as itself.
fn write_key_char(f: &mut fmt::Formatter<'_>, c: char) -> fmt::Result {
    if c.is_control() {
        write!(f, "U+{:04X}", c as u32)
    } else {
        write!(f, "{}", c)
    }
}

fn parse_key_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    let first = chars.next()?;
    if chars.next().is_none() {
        return Some(first);
    }
    let hex = text.strip_prefix("U+")?;
    if !(4..=6).contains(&hex.len()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Payload {
    Sync(SyncInfo),
    PointerButton(PointerButton),
    PointerWheel(i32),
    PointerMove { x: i32, y: i32 },
    KeyCode(KeyCode),
    KeyChar(char),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Sync(_) => PayloadKind::Sync,
            Payload::PointerButton(_) => PayloadKind::PointerButton,
            Payload::PointerWheel(_) => PayloadKind::PointerWheel,
            Payload::PointerMove { .. } => PayloadKind::PointerMove,
            Payload::KeyCode(_) => PayloadKind::KeyCode,
            Payload::KeyChar(_) => PayloadKind::KeyChar,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Sync(info) => write!(f, "{}", info),
            Payload::PointerButton(button) => write!(f, "{}", button),
            Payload::PointerWheel(delta) => write!(f, "{}", delta),
            Payload::PointerMove { x, y } => write!(f, "{} {}", x, y),
            Payload::KeyCode(key) => write!(f, "{}", key),
            Payload::KeyChar(c) => write_key_char(f, *c),
        }
    }
}

/// One logged event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    timestamp: Timestamp,
    category: Category,
    payload: Payload,
}

impl Activity {
    /// Fails when the payload shape does not belong to the category.
    pub fn new(timestamp: Timestamp, category: Category, payload: Payload) -> Result<Self> {
        if payload.kind() != category.payload_kind() {
            return Err(RecorderError::PayloadMismatch {
                category,
                payload: payload.to_string(),
            });
        }
        Ok(Self {
            timestamp,
            category,
            payload,
        })
    }

    /// Startup, Sync or Exit marker anchored at `timestamp`
    pub fn sync_marker(category: Category, timestamp: Timestamp) -> Result<Self> {
        Self::new(timestamp, category, Payload::Sync(SyncInfo::at(timestamp)?))
    }

    pub fn sync(timestamp: Timestamp) -> Result<Self> {
        Self::sync_marker(Category::Sync, timestamp)
    }

    pub fn pointer_move(timestamp: Timestamp, x: i32, y: i32) -> Self {
        Self {
            timestamp,
            category: Category::PointerMove,
            payload: Payload::PointerMove { x, y },
        }
    }

    pub fn pointer_wheel(timestamp: Timestamp, delta: i32) -> Self {
        Self {
            timestamp,
            category: Category::PointerWheel,
            payload: Payload::PointerWheel(delta),
        }
    }

    pub fn key_press(timestamp: Timestamp, c: char) -> Self {
        Self {
            timestamp,
            category: Category::KeyPress,
            payload: Payload::KeyChar(c),
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn is_sync_marker(&self) -> bool {
        self.category.is_sync_marker()
    }

    /// Absolute time carried by a sync marker's payload
    pub fn anchor(&self) -> Option<Timestamp> {
        match (&self.payload, self.is_sync_marker()) {
            (Payload::Sync(info), true) => Some(info.timestamp()),
            _ => None,
        }
    }

    pub(crate) fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Duplicate test used by reconciliation: same timestamp, same category
    /// and same rendered payload.
    pub fn same_record(&self, other: &Activity) -> bool {
        self.timestamp == other.timestamp
            && self.category == other.category
            && self.payload.to_string() == other.payload.to_string()
    }
}
