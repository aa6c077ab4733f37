//! Utterance history, newest first.

use crate::host::SpeechStatus;
use crate::voice_directory::Voice;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

/// Format of [`HistoryEntry::time`]
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Snapshot of one status transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique entry identifier
    pub id: Uuid,
    /// Text at the time of the transition
    pub text: String,
    /// Voice at the time of the transition
    pub voice: Option<Voice>,
    /// Status that was reported
    pub status: SpeechStatus,
    /// Local wall-clock time, `YYYY-MM-DD HH:mm:ss`
    pub time: String,
    /// Speaking rate
    pub rate: f32,
    /// Pitch
    pub pitch: f32,
    /// Last committed playback duration in seconds
    pub elapsed: f64,
}

impl HistoryEntry {
    /// Record an entry stamped with the current local time
    #[must_use]
    pub fn new(
        text: String,
        voice: Option<Voice>,
        status: SpeechStatus,
        rate: f32,
        pitch: f32,
        elapsed: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            voice,
            status,
            time: chrono::Local::now().format(TIME_FORMAT).to_string(),
            rate,
            pitch,
            elapsed: elapsed.as_secs_f64(),
        }
    }
}

/// Shared, observable log of history entries.
///
/// Cloning yields another handle to the same log. Entries are never removed.
#[derive(Clone)]
pub struct HistoryLog {
    entries: Arc<RwLock<VecDeque<HistoryEntry>>>,
    revision: Arc<watch::Sender<usize>>,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HistoryLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryLog").field("len", &self.len()).finish()
    }
}

impl HistoryLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            revision: Arc::new(revision),
        }
    }

    /// Prepend an entry
    pub fn push(&self, entry: HistoryEntry) {
        let len = {
            let mut entries = self.entries.write();
            entries.push_front(entry);
            entries.len()
        };
        self.revision.send_replace(len);
    }

    /// All entries, newest first
    #[must_use]
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.read().iter().cloned().collect()
    }

    /// Most recent entry
    #[must_use]
    pub fn latest(&self) -> Option<HistoryEntry> {
        self.entries.read().front().cloned()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Receiver of the entry count, updated on every push
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.revision.subscribe()
    }
}
