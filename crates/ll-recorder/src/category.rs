// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Category registry
//
// Ids are written to every log line and are never renumbered or reused. The
// registry binds each id to its display name and the payload codec that
// parses and renders the rest of the line.

use crate::activity::{Payload, PayloadKind};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Startup = 0,
    PointerMove = 1,
    PointerDown = 2,
    PointerUp = 3,
    PointerClick = 4,
    PointerDoubleClick = 5,
    PointerWheel = 6,
    KeyDown = 7,
    KeyUp = 8,
    KeyPress = 9,
    Sync = 10,
    Exit = 11,
}

/// One row of the registry
#[derive(Debug)]
pub struct CategoryEntry {
    pub category: Category,
    pub name: &'static str,
    pub kind: PayloadKind,
}

/// Indexed by category id
static REGISTRY: [CategoryEntry; 12] = [
    CategoryEntry {
        category: Category::Startup,
        name: "startup",
        kind: PayloadKind::Sync,
    },
    CategoryEntry {
        category: Category::PointerMove,
        name: "pointer_move",
        kind: PayloadKind::PointerMove,
    },
    CategoryEntry {
        category: Category::PointerDown,
        name: "pointer_down",
        kind: PayloadKind::PointerButton,
    },
    CategoryEntry {
        category: Category::PointerUp,
        name: "pointer_up",
        kind: PayloadKind::PointerButton,
    },
    CategoryEntry {
        category: Category::PointerClick,
        name: "pointer_click",
        kind: PayloadKind::PointerButton,
    },
    CategoryEntry {
        category: Category::PointerDoubleClick,
        name: "pointer_double_click",
        kind: PayloadKind::PointerButton,
    },
    CategoryEntry {
        category: Category::PointerWheel,
        name: "pointer_wheel",
        kind: PayloadKind::PointerWheel,
    },
    CategoryEntry {
        category: Category::KeyDown,
        name: "key_down",
        kind: PayloadKind::KeyCode,
    },
    CategoryEntry {
        category: Category::KeyUp,
        name: "key_up",
        kind: PayloadKind::KeyCode,
    },
    CategoryEntry {
        category: Category::KeyPress,
        name: "key_press",
        kind: PayloadKind::KeyChar,
    },
    CategoryEntry {
        category: Category::Sync,
        name: "sync",
        kind: PayloadKind::Sync,
    },
    CategoryEntry {
        category: Category::Exit,
        name: "exit",
        kind: PayloadKind::Sync,
    },
];

impl Category {
    /// Resolve a category id read from a log line. Unknown ids yield `None`
    /// so newer logs stay readable by older builds.
    pub fn lookup(id: u32) -> Option<Category> {
        REGISTRY.get(id as usize).map(|entry| entry.category)
    }

    pub fn all() -> impl Iterator<Item = Category> {
        REGISTRY.iter().map(|entry| entry.category)
    }

    fn entry(self) -> &'static CategoryEntry {
        &REGISTRY[self as usize]
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn payload_kind(self) -> PayloadKind {
        self.entry().kind
    }

    /// Startup, Sync and Exit carry an absolute time and anchor delta
    /// reconstruction.
    pub fn is_sync_marker(self) -> bool {
        matches!(self, Category::Startup | Category::Sync | Category::Exit)
    }

    /// Parse payload text with this category's codec
    pub fn parse_payload(self, text: &str) -> Option<Payload> {
        self.payload_kind().parse(text)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id(), self.name())
    }
}
