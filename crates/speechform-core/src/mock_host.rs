//! In-memory host implementations for tests and headless use.
//!
//! These mirror the behavior of a real host closely enough to drive the
//! directory and session state machines: the voice list can start empty and
//! be filled later, and the engine reports statuses only when told to.

use crate::error::{SpeechError, SpeechResult};
use crate::host::{
    AudioSink, SpeechEngine, SpeechStatus, StatusListener, Utterance, VoiceSource,
    VoicesChangedHandler,
};
use crate::voice_directory::Voice;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;

/// Mock voice source whose list can be changed at any time
#[derive(Default)]
pub struct MockVoiceSource {
    voices: Mutex<Vec<Voice>>,
    handler: Mutex<Option<VoicesChangedHandler>>,
    queries: AtomicUsize,
}

impl MockVoiceSource {
    /// Create a source that has no voices yet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source that is ready immediately
    #[must_use]
    pub fn with_voices(voices: Vec<Voice>) -> Self {
        Self {
            voices: Mutex::new(voices),
            ..Self::default()
        }
    }

    /// Replace the voice list without notifying
    pub fn set_voices(&self, voices: Vec<Voice>) {
        *self.voices.lock() = voices;
    }

    /// Fire the installed voices-changed handler, if any
    pub fn notify_voices_changed(&self) {
        // Clone out so the handler can call back into `voices()`
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler();
        }
    }

    /// Copy of the current list without counting a query
    #[must_use]
    pub fn voices_snapshot(&self) -> Vec<Voice> {
        self.voices.lock().clone()
    }

    /// Number of `voices()` calls so far
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Whether a voices-changed handler is installed
    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.handler.lock().is_some()
    }
}

impl VoiceSource for MockVoiceSource {
    fn voices(&self) -> Vec<Voice> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.voices.lock().clone()
    }

    fn set_voices_changed(&self, handler: VoicesChangedHandler) {
        *self.handler.lock() = Some(handler);
    }
}

/// Mock speech engine that records utterances and reports statuses on demand.
///
/// Like a real host it runs one utterance at a time: starting a new one
/// routes later reports to the new utterance's listener.
#[derive(Default)]
pub struct MockSpeechEngine {
    listener: Mutex<Option<StatusListener>>,
    spoken: Mutex<Vec<Utterance>>,
    last_status: Mutex<SpeechStatus>,
    cancels: AtomicUsize,
    auto_start: bool,
    defer_end: bool,
    fail_next: AtomicBool,
}

impl MockSpeechEngine {
    /// Create an engine that only reports statuses through [`emit`](Self::emit)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine that reports `play` as soon as an utterance starts
    #[must_use]
    pub fn auto_start() -> Self {
        Self {
            auto_start: true,
            ..Self::default()
        }
    }

    /// Leave the `end` for a cancelled utterance to a later [`emit`](Self::emit),
    /// as hosts that report asynchronously do
    #[must_use]
    pub fn with_deferred_end(mut self) -> Self {
        self.defer_end = true;
        self
    }

    /// Report a status for the current utterance
    pub fn emit(&self, status: SpeechStatus) {
        *self.last_status.lock() = status;
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(status);
        }
    }

    /// Make the next `speak` call fail
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Utterances started so far
    #[must_use]
    pub fn spoken(&self) -> Vec<Utterance> {
        self.spoken.lock().clone()
    }

    /// Number of `cancel` calls so far
    #[must_use]
    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl SpeechEngine for MockSpeechEngine {
    fn speak(&self, utterance: &Utterance, listener: StatusListener) -> SpeechResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(SpeechError::engine("synthesis-unavailable"));
        }
        debug!("Mock speaking {} chars", utterance.text.chars().count());
        self.spoken.lock().push(utterance.clone());
        *self.listener.lock() = Some(listener);
        *self.last_status.lock() = SpeechStatus::Init;
        if self.auto_start {
            self.emit(SpeechStatus::Play);
        }
        Ok(())
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        let status = *self.last_status.lock();
        if !self.defer_end && matches!(status, SpeechStatus::Play | SpeechStatus::Pause) {
            self.emit(SpeechStatus::End);
        }
    }
}

/// Mock audio sink that keeps every buffer it is asked to play
#[derive(Default)]
pub struct MockAudioSink {
    played: Mutex<Vec<(usize, u32)>>,
    peak: Mutex<f32>,
}

impl MockAudioSink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `(sample count, sample rate)` of every buffer played
    #[must_use]
    pub fn played(&self) -> Vec<(usize, u32)> {
        self.played.lock().clone()
    }

    /// Largest absolute sample seen
    #[must_use]
    pub fn peak(&self) -> f32 {
        *self.peak.lock()
    }
}

impl AudioSink for MockAudioSink {
    fn play(&self, samples: &[f32], sample_rate: u32) -> SpeechResult<()> {
        if samples.is_empty() {
            return Err(SpeechError::invalid_input("Audio data cannot be empty"));
        }
        let peak = samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
        let mut current = self.peak.lock();
        *current = current.max(peak);
        self.played.lock().push((samples.len(), sample_rate));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_voice_source_counts_queries() {
        let source = MockVoiceSource::new();
        assert!(source.voices().is_empty());
        source.set_voices(vec![Voice::new("v1", "Samantha", "en-US")]);
        assert_eq!(source.voices().len(), 1);
        assert_eq!(source.query_count(), 2);
        assert_eq!(source.voices_snapshot().len(), 1);
        assert_eq!(source.query_count(), 2);
    }

    #[test]
    fn test_handler_is_replaced() {
        let source = MockVoiceSource::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        source.set_voices_changed(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = second.clone();
        source.set_voices_changed(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        source.notify_voices_changed();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    fn recording_listener() -> (StatusListener, Arc<Mutex<Vec<SpeechStatus>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (Arc::new(move |status: SpeechStatus| sink.lock().push(status)), seen)
    }

    #[test]
    fn test_engine_cancel_ends_playback() {
        let engine = MockSpeechEngine::auto_start();
        let (listener, seen) = recording_listener();

        let utterance = Utterance::new("hi", crate::speech_session::SpeechParams::default());
        engine.speak(&utterance, listener).expect("Should speak");
        engine.cancel();
        engine.cancel();

        assert_eq!(*seen.lock(), vec![SpeechStatus::Play, SpeechStatus::End]);
        assert_eq!(engine.cancel_count(), 2);
        assert_eq!(engine.spoken().len(), 1);
    }

    #[test]
    fn test_engine_reports_to_current_utterance() {
        let engine = MockSpeechEngine::new();
        let (first, first_seen) = recording_listener();
        let (second, second_seen) = recording_listener();
        let params = crate::speech_session::SpeechParams::default();

        engine.speak(&Utterance::new("one", params.clone()), first).expect("Should speak");
        engine.emit(SpeechStatus::Play);
        engine.speak(&Utterance::new("two", params), second).expect("Should speak");
        engine.emit(SpeechStatus::Play);

        assert_eq!(*first_seen.lock(), vec![SpeechStatus::Play]);
        assert_eq!(*second_seen.lock(), vec![SpeechStatus::Play]);
    }

    #[test]
    fn test_engine_fail_next() {
        let engine = MockSpeechEngine::new();
        engine.fail_next();
        let utterance = Utterance::new("hi", crate::speech_session::SpeechParams::default());
        let (listener, seen) = recording_listener();
        assert!(engine.speak(&utterance, listener.clone()).is_err());
        assert!(engine.spoken().is_empty());
        assert!(engine.speak(&utterance, listener).is_ok());
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_sink_rejects_empty_buffer() {
        let sink = MockAudioSink::new();
        assert!(sink.play(&[], 24_000).is_err());
        sink.play(&[0.1, -0.3], 24_000).expect("Should play");
        assert_eq!(sink.played(), vec![(2, 24_000)]);
        assert!((sink.peak() - 0.3).abs() < f32::EPSILON);
    }
}
