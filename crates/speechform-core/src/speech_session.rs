//! Speak/stop control, elapsed-time tracking and per-status history.

use crate::error::{SpeechError, SpeechResult};
use crate::history::{HistoryEntry, HistoryLog};
use crate::host::{AudioPrimer, SpeechEngine, SpeechStatus, StatusListener, Utterance};
use crate::primer::PrimingTone;
use crate::voice_directory::Voice;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Speech parameters read at the start of each utterance
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechParams {
    /// Voice to use, host default when `None`
    pub voice: Option<Voice>,
    /// Speaking rate (0.1 to 10.0, 1.0 = normal)
    pub rate: f32,
    /// Pitch (0.0 to 2.0, 1.0 = normal)
    pub pitch: f32,
    /// Language tag, host default when `None`
    pub lang: Option<String>,
}

impl Default for SpeechParams {
    fn default() -> Self {
        Self {
            voice: None,
            rate: 1.0,
            pitch: 1.0,
            lang: None,
        }
    }
}

impl SpeechParams {
    /// Check a speaking rate
    ///
    /// # Errors
    ///
    /// Returns an error if rate is not in the valid range (0.1 to 10.0)
    pub fn validate_rate(rate: f32) -> SpeechResult<()> {
        if !(0.1..=10.0).contains(&rate) {
            return Err(SpeechError::invalid_input(format!(
                "Rate must be between 0.1 and 10.0, got {rate}"
            )));
        }
        Ok(())
    }

    /// Check a pitch
    ///
    /// # Errors
    ///
    /// Returns an error if pitch is not in the valid range (0.0 to 2.0)
    pub fn validate_pitch(pitch: f32) -> SpeechResult<()> {
        if !(0.0..=2.0).contains(&pitch) {
            return Err(SpeechError::invalid_input(format!(
                "Pitch must be between 0.0 and 2.0, got {pitch}"
            )));
        }
        Ok(())
    }

    /// Validate speech parameters
    ///
    /// # Errors
    ///
    /// Returns an error if rate or pitch is out of range
    pub fn validate(&self) -> SpeechResult<()> {
        Self::validate_rate(self.rate)?;
        Self::validate_pitch(self.pitch)
    }
}

/// Mutable text and parameters a session reads from
pub trait UtteranceSource: Send + Sync {
    /// Text to speak
    fn text(&self) -> String;

    /// Current speech parameters
    fn params(&self) -> SpeechParams;
}

/// Standalone [`UtteranceSource`] backed by in-memory fields
#[derive(Debug, Default)]
pub struct SharedUtterance {
    text: RwLock<String>,
    params: RwLock<SpeechParams>,
}

impl SharedUtterance {
    /// Create a source with the given text and default parameters
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: RwLock::new(text.into()),
            params: RwLock::new(SpeechParams::default()),
        }
    }

    /// Replace the text
    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.write() = text.into();
    }

    /// Replace the parameters
    pub fn set_params(&self, params: SpeechParams) {
        *self.params.write() = params;
    }
}

impl UtteranceSource for SharedUtterance {
    fn text(&self) -> String {
        self.text.read().clone()
    }

    fn params(&self) -> SpeechParams {
        self.params.read().clone()
    }
}

/// Speech session configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionConfig {
    /// Tone played before each utterance; `None` disables priming
    pub priming: Option<PrimingTone>,
    /// Wait between priming and starting the utterance
    pub start_delay: Duration,
}

#[derive(Debug, Default)]
struct Timing {
    start: Option<Instant>,
    last_elapsed: Duration,
}

impl Timing {
    fn running(&self) -> Duration {
        self.start.map_or(Duration::ZERO, |start| start.elapsed())
    }
}

struct SessionInner {
    source: Arc<dyn UtteranceSource>,
    engine: Arc<dyn SpeechEngine>,
    primer: Option<Arc<dyn AudioPrimer>>,
    config: SessionConfig,
    timing: Mutex<Timing>,
    status: watch::Sender<SpeechStatus>,
    history: HistoryLog,
    mirror: Option<HistoryLog>,
}

impl SessionInner {
    fn on_status(&self, status: SpeechStatus) {
        let changed = self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        if !changed {
            return;
        }

        let elapsed = {
            let mut timing = self.timing.lock();
            if status.is_terminal() {
                timing.last_elapsed = timing.running();
            }
            timing.last_elapsed
        };
        debug!("Speech status {status}, elapsed {:.3}s", elapsed.as_secs_f64());

        let params = self.source.params();
        let entry = HistoryEntry::new(
            self.source.text(),
            params.voice,
            status,
            params.rate,
            params.pitch,
            elapsed,
        );
        if let Some(mirror) = &self.mirror {
            mirror.push(entry.clone());
        }
        self.history.push(entry);
    }

    fn prime(&self) {
        let (Some(primer), Some(tone)) = (&self.primer, &self.config.priming) else {
            return;
        };
        if let Err(err) = primer.prime(tone) {
            warn!("Audio priming failed: {err}");
        }
    }

    fn start_utterance(self: &Arc<Self>) {
        let utterance = Utterance::new(self.source.text(), self.source.params());
        let weak = Arc::downgrade(self);
        let listener: StatusListener = Arc::new(move |status: SpeechStatus| {
            if let Some(inner) = weak.upgrade() {
                inner.on_status(status);
            }
        });
        if let Err(err) = self.engine.speak(&utterance, listener) {
            warn!("Speech engine rejected utterance: {err}");
            self.on_status(SpeechStatus::Error);
        }
    }
}

/// Drives utterances on a [`SpeechEngine`] and records their history
#[derive(Clone)]
pub struct SpeechSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for SpeechSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechSession")
            .field("config", &self.inner.config)
            .field("status", &self.status())
            .field("history", &self.inner.history)
            .finish()
    }
}

/// Builder for [`SpeechSession`]
pub struct SpeechSessionBuilder {
    source: Arc<dyn UtteranceSource>,
    engine: Arc<dyn SpeechEngine>,
    primer: Option<Arc<dyn AudioPrimer>>,
    config: SessionConfig,
    mirror: Option<HistoryLog>,
}

impl SpeechSessionBuilder {
    /// Prime the output with this primer when the config enables it
    #[must_use]
    pub fn with_primer(mut self, primer: Arc<dyn AudioPrimer>) -> Self {
        self.primer = Some(primer);
        self
    }

    /// Set the session configuration
    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Also push every entry into `log`
    #[must_use]
    pub fn with_history_mirror(mut self, log: HistoryLog) -> Self {
        self.mirror = Some(log);
        self
    }

    /// Build the session
    #[must_use]
    pub fn build(self) -> SpeechSession {
        let (status, _) = watch::channel(SpeechStatus::Init);
        SpeechSession {
            inner: Arc::new(SessionInner {
                source: self.source,
                engine: self.engine,
                primer: self.primer,
                config: self.config,
                timing: Mutex::new(Timing::default()),
                status,
                history: HistoryLog::new(),
                mirror: self.mirror,
            }),
        }
    }
}

impl SpeechSession {
    /// Start building a session over `source` and `engine`
    #[must_use]
    pub fn builder(
        source: Arc<dyn UtteranceSource>,
        engine: Arc<dyn SpeechEngine>,
    ) -> SpeechSessionBuilder {
        SpeechSessionBuilder {
            source,
            engine,
            primer: None,
            config: SessionConfig::default(),
            mirror: None,
        }
    }

    /// Speak the current text.
    ///
    /// Resets elapsed time and records the start instant, primes the output
    /// when configured, then starts the utterance after `start_delay`.
    /// A delayed start runs on the current tokio runtime and cannot be
    /// cancelled; without a runtime the utterance starts immediately.
    pub fn speak(&self) {
        {
            let mut timing = self.inner.timing.lock();
            timing.last_elapsed = Duration::ZERO;
            timing.start = Some(Instant::now());
        }
        info!("Speak requested");

        self.inner.prime();

        let delay = self.inner.config.start_delay;
        if delay.is_zero() {
            self.inner.start_utterance();
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let inner = Arc::clone(&self.inner);
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    inner.start_utterance();
                });
            }
            Err(_) => {
                warn!("No tokio runtime, starting speech without the {delay:?} delay");
                self.inner.start_utterance();
            }
        }
    }

    /// Reset elapsed time and cancel in-progress speech.
    ///
    /// The start instant is kept, so the `end` the host reports for the
    /// cancelled utterance commits the time actually spoken, whether it
    /// arrives during `cancel` or later.
    pub fn stop(&self) {
        info!("Stopping speech");
        self.inner.timing.lock().last_elapsed = Duration::ZERO;
        self.inner.engine.cancel();
    }

    /// Same as [`stop`](Self::stop); named for form resets
    pub fn reset(&self) {
        self.stop();
    }

    /// Last reported status
    #[must_use]
    pub fn status(&self) -> SpeechStatus {
        *self.inner.status.borrow()
    }

    /// Receiver notified on every status change
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SpeechStatus> {
        self.inner.status.subscribe()
    }

    /// Whether the engine is currently speaking
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.status() == SpeechStatus::Play
    }

    /// Last committed playback duration
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.inner.timing.lock().last_elapsed
    }

    /// Live playback duration while speaking, otherwise the committed one
    #[must_use]
    pub fn current_elapsed(&self) -> Duration {
        let playing = self.is_playing();
        let timing = self.inner.timing.lock();
        if playing {
            timing.running()
        } else {
            timing.last_elapsed
        }
    }

    /// This session's own history
    #[must_use]
    pub fn history(&self) -> &HistoryLog {
        &self.inner.history
    }
}
