//! Voice discovery and language listing.
//!
//! Hosts often report an empty voice list until their speech backend has
//! initialized. [`VoiceDirectory::load`] queries once and, if nothing is
//! available yet, polls on a fixed interval while also listening for the
//! host's voices-changed notification. Whichever sees a non-empty list first
//! settles the directory and cancels the timer.

use crate::host::VoiceSource;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default interval between voice list queries while waiting for the host
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Host-provided synthesis voice
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Voice {
    /// Unique identifier for the voice
    pub voice_uri: String,
    /// Human-readable name
    pub name: String,
    /// Language tag (e.g., "en-US", "ja-JP")
    pub lang: String,
    /// Whether synthesis happens locally
    pub local_service: bool,
    /// Whether this is the host default voice
    pub default: bool,
}

impl Voice {
    /// Create a new voice descriptor
    #[must_use]
    pub fn new(
        voice_uri: impl Into<String>,
        name: impl Into<String>,
        lang: impl Into<String>,
    ) -> Self {
        Self {
            voice_uri: voice_uri.into(),
            name: name.into(),
            lang: lang.into(),
            local_service: true,
            default: false,
        }
    }

    /// Set whether synthesis happens locally
    #[must_use]
    pub fn with_local_service(mut self, local_service: bool) -> Self {
        self.local_service = local_service;
        self
    }

    /// Mark as the host default voice
    #[must_use]
    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }
}

/// Sorted, deduplicated language tags of `voices`.
///
/// Tags compare case-insensitively first so `en-gb` sits next to `en-GB`;
/// ties fall back to byte order, which keeps equal tags adjacent for dedup.
#[must_use]
pub fn sorted_langs(voices: &[Voice]) -> Vec<String> {
    let mut langs: Vec<String> = voices.iter().map(|voice| voice.lang.clone()).collect();
    langs.sort_by(|a, b| compare_lang_tags(a, b));
    langs.dedup();
    langs
}

fn compare_lang_tags(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Voice directory configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    /// Interval between host queries while the list is empty
    pub poll_interval: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Readiness of the voice list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// `load` has not run since creation or the last `reload`
    Uninitialized,
    /// Waiting for the host to supply voices
    Polling,
    /// The host list is non-empty
    Ready,
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Polling => write!(f, "Polling"),
            Self::Ready => write!(f, "Ready"),
        }
    }
}

enum Phase {
    Uninitialized,
    Polling { timer: Option<JoinHandle<()>> },
    Ready,
}

impl Phase {
    const fn state(&self) -> LoadState {
        match self {
            Self::Uninitialized => LoadState::Uninitialized,
            Self::Polling { .. } => LoadState::Polling,
            Self::Ready => LoadState::Ready,
        }
    }

    fn cancel_timer(self) {
        if let Self::Polling { timer: Some(timer) } = self {
            timer.abort();
        }
    }
}

struct DirectoryInner {
    source: Arc<dyn VoiceSource>,
    config: DirectoryConfig,
    voices: watch::Sender<Arc<Vec<Voice>>>,
    phase: Mutex<Phase>,
}

impl DirectoryInner {
    /// Re-query the host and publish the list. Returns whether it is non-empty.
    fn refresh(&self) -> bool {
        let voices = self.source.voices();
        let non_empty = !voices.is_empty();
        self.voices.send_if_modified(|current| {
            if **current == voices {
                false
            } else {
                *current = Arc::new(voices);
                true
            }
        });
        non_empty
    }

    /// Single exit from polling, shared by the timer and the change handler.
    fn settle(&self) {
        let previous = std::mem::replace(&mut *self.phase.lock(), Phase::Ready);
        if previous.state() == LoadState::Polling {
            info!("Voice list ready with {} voices", self.voices.borrow().len());
        }
        previous.cancel_timer();
    }

    /// Drop back to polling after the host emptied a list that was ready
    fn unsettle(self: &Arc<Self>) {
        let mut phase = self.phase.lock();
        if matches!(*phase, Phase::Ready) {
            warn!("Host voice list became empty, polling again");
            *phase = Phase::Polling {
                timer: spawn_poll_timer(self),
            };
        }
    }
}

fn spawn_poll_timer(inner: &Arc<DirectoryInner>) -> Option<JoinHandle<()>> {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!("No tokio runtime, waiting for the host voices-changed notification only");
        return None;
    };

    let weak = Arc::downgrade(inner);
    let period = inner.config.poll_interval;
    Some(runtime.spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            if inner.refresh() {
                inner.settle();
                break;
            }
        }
    }))
}

impl Drop for DirectoryInner {
    fn drop(&mut self) {
        std::mem::replace(self.phase.get_mut(), Phase::Uninitialized).cancel_timer();
    }
}

/// Observable list of host voices
#[derive(Clone)]
pub struct VoiceDirectory {
    inner: Arc<DirectoryInner>,
}

impl std::fmt::Debug for VoiceDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceDirectory")
            .field("config", &self.inner.config)
            .field("state", &self.load_state())
            .field("voices", &self.inner.voices.borrow().len())
            .finish()
    }
}

impl VoiceDirectory {
    /// Create an empty directory over `source`. Call [`load`](Self::load) to populate it.
    #[must_use]
    pub fn new(source: Arc<dyn VoiceSource>, config: DirectoryConfig) -> Self {
        let (voices, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            inner: Arc::new(DirectoryInner {
                source,
                config,
                voices,
                phase: Mutex::new(Phase::Uninitialized),
            }),
        }
    }

    /// Populate the voice list, polling until the host supplies one.
    ///
    /// No-op when the list is already non-empty or a poll is in flight.
    /// The poll timer needs a tokio runtime; without one only the host's
    /// change notification can settle the directory.
    pub fn load(&self) {
        if !self.inner.voices.borrow().is_empty() {
            return;
        }

        let mut phase = self.inner.phase.lock();
        if matches!(*phase, Phase::Polling { .. }) {
            debug!("Voice list load already in progress");
            return;
        }

        if self.inner.refresh() {
            info!("Voice list ready with {} voices", self.inner.voices.borrow().len());
            *phase = Phase::Ready;
            return;
        }

        info!(
            "Voice list empty, polling every {:?}",
            self.inner.config.poll_interval
        );
        let timer = spawn_poll_timer(&self.inner);
        *phase = Phase::Polling { timer };
        // The handler may fire during installation and takes the phase lock
        drop(phase);
        self.install_change_handler();
    }

    /// Clear the list and load it again
    pub fn reload(&self) {
        info!("Reloading voice list");
        std::mem::replace(&mut *self.inner.phase.lock(), Phase::Uninitialized).cancel_timer();
        self.inner.voices.send_replace(Arc::new(Vec::new()));
        self.load();
    }

    fn install_change_handler(&self) {
        let weak: Weak<DirectoryInner> = Arc::downgrade(&self.inner);
        self.inner.source.set_voices_changed(Arc::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            debug!("Host reported voices changed");
            if inner.refresh() {
                inner.settle();
            } else {
                inner.unsettle();
            }
        }));
    }

    /// Current voice list
    #[must_use]
    pub fn voices(&self) -> Arc<Vec<Voice>> {
        let voices = self.inner.voices.borrow();
        Arc::clone(&*voices)
    }

    /// Sorted, deduplicated language tags of the current list
    #[must_use]
    pub fn langs(&self) -> Vec<String> {
        sorted_langs(&self.voices())
    }

    /// Voice with the given identifier
    #[must_use]
    pub fn find(&self, voice_uri: &str) -> Option<Voice> {
        self.inner
            .voices
            .borrow()
            .iter()
            .find(|voice| voice.voice_uri == voice_uri)
            .cloned()
    }

    /// Voices whose language tag equals `lang`
    #[must_use]
    pub fn voices_for_lang(&self, lang: &str) -> Vec<Voice> {
        self.inner
            .voices
            .borrow()
            .iter()
            .filter(|voice| voice.lang == lang)
            .cloned()
            .collect()
    }

    /// Receiver notified whenever the list changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Voice>>> {
        self.inner.voices.subscribe()
    }

    /// Current readiness
    #[must_use]
    pub fn load_state(&self) -> LoadState {
        self.inner.phase.lock().state()
    }

    /// Whether a non-empty list has been received
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.load_state() == LoadState::Ready
    }

    /// Wait until the list is non-empty and return it
    pub async fn wait_until_ready(&self) -> Arc<Vec<Voice>> {
        let mut receiver = self.subscribe();
        let ready = match receiver.wait_for(|voices| !voices.is_empty()).await {
            Ok(voices) => Arc::clone(&*voices),
            Err(_) => self.voices(),
        };
        ready
    }
}
