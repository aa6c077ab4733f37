//! Interfaces to the host environment: voice enumeration, the utterance
//! engine, audio output used for priming, and per-key preference storage.

use crate::error::SpeechResult;
use crate::speech_session::SpeechParams;
use crate::voice_directory::Voice;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Audio samples, 32-bit float in `-1.0..=1.0`
pub type AudioData = Vec<f32>;

/// Callback fired by the host when its voice list changes
pub type VoicesChangedHandler = Arc<dyn Fn() + Send + Sync>;

/// Callback fired by the engine on every status report for one utterance
pub type StatusListener = Arc<dyn Fn(SpeechStatus) + Send + Sync>;

/// Engine-reported utterance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechStatus {
    /// Nothing has been spoken yet
    Init,
    /// Utterance accepted, waiting for the engine
    Queued,
    /// Utterance is being spoken
    Play,
    /// Playback paused
    Pause,
    /// Utterance finished or was cancelled
    End,
    /// Engine reported a failure
    Error,
}

impl SpeechStatus {
    /// Label used in history entries
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Queued => "queued",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::End => "end",
            Self::Error => "error",
        }
    }

    /// Whether this status commits the elapsed playback time
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::End)
    }
}

impl Default for SpeechStatus {
    fn default() -> Self {
        Self::Init
    }
}

impl std::fmt::Display for SpeechStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request to speak a text with given parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    /// Text to speak
    pub text: String,
    /// Voice to use, host default when `None`
    pub voice: Option<Voice>,
    /// Language tag, host default when `None`
    pub lang: Option<String>,
    /// Speaking rate (1.0 = normal)
    pub rate: f32,
    /// Pitch (1.0 = normal)
    pub pitch: f32,
}

impl Utterance {
    /// Build an utterance from text and the current parameters
    #[must_use]
    pub fn new(text: impl Into<String>, params: SpeechParams) -> Self {
        Self {
            text: text.into(),
            voice: params.voice,
            lang: params.lang,
            rate: params.rate,
            pitch: params.pitch,
        }
    }
}

/// Source of synthesis voices
pub trait VoiceSource: Send + Sync {
    /// Current voice list. May be empty until the host has initialized.
    fn voices(&self) -> Vec<Voice>;

    /// Install the voice-list-changed handler. Replaces any previous handler.
    fn set_voices_changed(&self, handler: VoicesChangedHandler);
}

/// Host speech-synthesis engine
pub trait SpeechEngine: Send + Sync {
    /// Start speaking an utterance.
    ///
    /// Status reports for this utterance go to `listener` only, so several
    /// sessions can share one engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses the utterance
    fn speak(&self, utterance: &Utterance, listener: StatusListener) -> SpeechResult<()>;

    /// Cancel any in-progress or queued speech
    fn cancel(&self);
}

/// Plays a short tone ahead of speech so the output path is awake
#[cfg_attr(test, mockall::automock)]
pub trait AudioPrimer: Send + Sync {
    /// Play the priming tone
    ///
    /// # Errors
    ///
    /// Returns an error if the output device is unavailable
    fn prime(&self, tone: &crate::primer::PrimingTone) -> SpeechResult<()>;
}

/// Default audio output device
pub trait AudioSink: Send + Sync {
    /// Queue samples for playback
    ///
    /// # Errors
    ///
    /// Returns an error if the samples cannot be queued
    fn play(&self, samples: &[f32], sample_rate: u32) -> SpeechResult<()>;
}

/// Durable per-key storage for scalar preferences
pub trait PreferenceStore: Send + Sync {
    /// Read the raw value stored under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read
    fn get(&self, key: &str) -> SpeechResult<Option<String>>;

    /// Store `value` under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written
    fn set(&self, key: &str, value: &str) -> SpeechResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(SpeechStatus::Init.to_string(), "init");
        assert_eq!(SpeechStatus::Queued.to_string(), "queued");
        assert_eq!(SpeechStatus::Play.to_string(), "play");
        assert_eq!(SpeechStatus::Pause.to_string(), "pause");
        assert_eq!(SpeechStatus::End.to_string(), "end");
        assert_eq!(SpeechStatus::Error.to_string(), "error");
    }

    #[test]
    fn test_only_end_is_terminal() {
        assert!(SpeechStatus::End.is_terminal());
        assert!(!SpeechStatus::Error.is_terminal());
        assert!(!SpeechStatus::Pause.is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&SpeechStatus::Play).expect("Should serialize");
        assert_eq!(json, "\"play\"");
    }

    #[test]
    fn test_utterance_from_params() {
        let params = SpeechParams {
            voice: None,
            rate: 1.5,
            pitch: 0.8,
            lang: Some("ja-JP".to_string()),
        };
        let utterance = Utterance::new("こんにちは", params);
        assert_eq!(utterance.text, "こんにちは");
        assert_eq!(utterance.lang.as_deref(), Some("ja-JP"));
        assert_eq!(utterance.rate, 1.5);
        assert_eq!(utterance.pitch, 0.8);
    }
}
