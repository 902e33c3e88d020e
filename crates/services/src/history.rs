use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    /// Something heard or a recognizer lifecycle change.
    Recognition,
    /// Something said, or an attempt to say it.
    Speaker,
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub kind: HistoryKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Bounded log of speech activity, newest first.
#[derive(Debug, Clone)]
pub struct SpeechHistoryLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    visible: usize,
}

impl SpeechHistoryLog {
    #[must_use]
    pub fn new(capacity: usize, visible: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
            visible: visible.min(capacity),
        }
    }

    /// Prepends an entry, evicting the oldest one past capacity.
    pub fn record(&mut self, kind: HistoryKind, message: impl Into<String>, at: DateTime<Utc>) {
        self.entries.push_front(HistoryEntry {
            kind,
            message: message.into(),
            timestamp: at,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    /// Every retained entry, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// The entries a history panel shows, newest first.
    pub fn visible(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().take(self.visible)
    }

    #[must_use]
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
