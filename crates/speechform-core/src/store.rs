//! Process-wide voice list and history shared by every form.
//!
//! Build order: host collaborators, then a [`VoiceDirectory`], then one
//! [`SpeechStore`], then any number of
//! [`FormController`](crate::form_controller::FormController)s that borrow it.

use crate::history::HistoryLog;
use crate::voice_directory::{Voice, VoiceDirectory};
use std::sync::Arc;

/// Shared voice directory and timeline
#[derive(Debug, Clone)]
pub struct SpeechStore {
    directory: VoiceDirectory,
    history: HistoryLog,
}

impl SpeechStore {
    /// Create the store and start loading voices
    #[must_use]
    pub fn new(directory: VoiceDirectory) -> Self {
        directory.load();
        Self {
            directory,
            history: HistoryLog::new(),
        }
    }

    /// Shared voice directory
    #[must_use]
    pub fn directory(&self) -> &VoiceDirectory {
        &self.directory
    }

    /// Current voice list
    #[must_use]
    pub fn voices(&self) -> Arc<Vec<Voice>> {
        self.directory.voices()
    }

    /// Sorted language tags of the current voice list
    #[must_use]
    pub fn langs(&self) -> Vec<String> {
        self.directory.langs()
    }

    /// Timeline shared by every form built from this store
    #[must_use]
    pub fn history(&self) -> &HistoryLog {
        &self.history
    }
}
