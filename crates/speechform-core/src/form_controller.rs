//! Persisted speech form bound to a speech session.

use crate::config::SpeechFormConfig;
use crate::error::SpeechResult;
use crate::history::HistoryLog;
use crate::host::{AudioPrimer, PreferenceStore, SpeechEngine};
use crate::preferences::Persisted;
use crate::speech_session::{SpeechParams, SpeechSession, UtteranceSource};
use crate::store::SpeechStore;
use crate::voice_directory::{Voice, VoiceDirectory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Storage key of the speaking rate
pub const KEY_RATE: &str = "rate";
/// Storage key of the pitch
pub const KEY_PITCH: &str = "pitch";
/// Storage key of the text
pub const KEY_TEXT: &str = "text";
/// Storage key of the selected voice identifier
pub const KEY_VOICE_URI: &str = "voiceURI";
/// Storage key of the language filter
pub const KEY_LANG: &str = "lang";

/// Values restored by [`FormController::reset`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormDefaults {
    /// Speaking rate
    pub rate: f32,
    /// Pitch
    pub pitch: f32,
    /// Text
    pub text: String,
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            text: crate::DEFAULT_TEXT.to_string(),
        }
    }
}

/// Snapshot of every persisted field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormPreferences {
    /// Speaking rate
    pub rate: f32,
    /// Pitch
    pub pitch: f32,
    /// Text
    pub text: String,
    /// Selected voice identifier
    pub voice_uri: Option<String>,
    /// Language filter
    pub lang: Option<String>,
}

struct FormFields {
    rate: Persisted<f32>,
    pitch: Persisted<f32>,
    text: Persisted<String>,
    voice_uri: Persisted<Option<String>>,
    lang: Persisted<Option<String>>,
    directory: VoiceDirectory,
}

impl FormFields {
    fn voice(&self) -> Option<Voice> {
        self.voice_uri
            .get()
            .and_then(|voice_uri| self.directory.find(&voice_uri))
    }

    fn filtered_voices(&self) -> Vec<Voice> {
        self.lang
            .get()
            .map(|lang| self.directory.voices_for_lang(&lang))
            .unwrap_or_default()
    }
}

impl UtteranceSource for FormFields {
    fn text(&self) -> String {
        self.text.get()
    }

    fn params(&self) -> SpeechParams {
        SpeechParams {
            voice: self.voice(),
            rate: self.rate.get(),
            pitch: self.pitch.get(),
            lang: self.lang.get(),
        }
    }
}

/// Speech form: persisted preferences, derived voice selection and a session
pub struct FormController {
    fields: Arc<FormFields>,
    session: SpeechSession,
    defaults: FormDefaults,
}

impl std::fmt::Debug for FormController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormController")
            .field("preferences", &self.snapshot())
            .field("session", &self.session)
            .finish()
    }
}

impl FormController {
    /// Create a form with default configuration and no priming
    #[must_use]
    pub fn new(
        store: &SpeechStore,
        preferences: Arc<dyn PreferenceStore>,
        engine: Arc<dyn SpeechEngine>,
    ) -> Self {
        Self::with_config(store, preferences, engine, None, &SpeechFormConfig::default())
    }

    /// Create a form from configuration.
    ///
    /// `primer` is used only when the session config enables priming.
    #[must_use]
    pub fn with_config(
        store: &SpeechStore,
        preferences: Arc<dyn PreferenceStore>,
        engine: Arc<dyn SpeechEngine>,
        primer: Option<Arc<dyn AudioPrimer>>,
        config: &SpeechFormConfig,
    ) -> Self {
        let defaults = config.defaults.clone();
        let fields = Arc::new(FormFields {
            rate: Persisted::new(preferences.clone(), KEY_RATE, defaults.rate),
            pitch: Persisted::new(preferences.clone(), KEY_PITCH, defaults.pitch),
            text: Persisted::new(preferences.clone(), KEY_TEXT, defaults.text.clone()),
            voice_uri: Persisted::new(preferences.clone(), KEY_VOICE_URI, None),
            lang: Persisted::new(preferences, KEY_LANG, None),
            directory: store.directory().clone(),
        });

        let mut builder = SpeechSession::builder(fields.clone(), engine)
            .with_config(config.session_config())
            .with_history_mirror(store.history().clone());
        if let Some(primer) = primer {
            builder = builder.with_primer(primer);
        }

        Self {
            fields,
            session: builder.build(),
            defaults,
        }
    }

    /// Voice matching the persisted identifier, if it still exists
    #[must_use]
    pub fn voice(&self) -> Option<Voice> {
        self.fields.voice()
    }

    /// Voices whose language equals the persisted language
    #[must_use]
    pub fn filtered_voices(&self) -> Vec<Voice> {
        self.fields.filtered_voices()
    }

    /// First filtered voice, else the first voice overall
    #[must_use]
    pub fn initial_voice(&self) -> Option<Voice> {
        self.filtered_voices()
            .into_iter()
            .next()
            .or_else(|| self.fields.directory.voices().first().cloned())
    }

    /// Sorted language tags of the current voice list
    #[must_use]
    pub fn langs(&self) -> Vec<String> {
        self.fields.directory.langs()
    }

    /// Snap the selected voice to the first voice of the current language
    pub fn on_change_lang(&self) {
        let voice_uri = self
            .filtered_voices()
            .into_iter()
            .next()
            .map(|voice| voice.voice_uri);
        info!("Language changed, selecting voice {voice_uri:?}");
        self.fields.voice_uri.set(voice_uri);
    }

    /// Set the language filter and snap the voice to it
    pub fn select_lang(&self, lang: Option<String>) {
        self.set_lang(lang);
        self.on_change_lang();
    }

    /// Stop speech and restore defaults
    pub fn reset(&self) {
        info!("Resetting speech form");
        self.session.reset();
        self.fields.rate.set(self.defaults.rate);
        self.fields.pitch.set(self.defaults.pitch);
        self.fields.text.set(self.defaults.text.clone());
        self.fields.lang.set(None);
        let voice_uri = self.initial_voice().map(|voice| voice.voice_uri);
        self.fields.voice_uri.set(voice_uri);
    }

    /// Speaking rate
    #[must_use]
    pub fn rate(&self) -> f32 {
        self.fields.rate.get()
    }

    /// Set the speaking rate
    ///
    /// # Errors
    ///
    /// Returns an error if rate is not in the valid range (0.1 to 10.0)
    pub fn set_rate(&self, rate: f32) -> SpeechResult<()> {
        SpeechParams::validate_rate(rate)?;
        self.fields.rate.set(rate);
        Ok(())
    }

    /// Pitch
    #[must_use]
    pub fn pitch(&self) -> f32 {
        self.fields.pitch.get()
    }

    /// Set the pitch
    ///
    /// # Errors
    ///
    /// Returns an error if pitch is not in the valid range (0.0 to 2.0)
    pub fn set_pitch(&self, pitch: f32) -> SpeechResult<()> {
        SpeechParams::validate_pitch(pitch)?;
        self.fields.pitch.set(pitch);
        Ok(())
    }

    /// Text to speak
    #[must_use]
    pub fn text(&self) -> String {
        self.fields.text.get()
    }

    /// Set the text to speak
    pub fn set_text(&self, text: impl Into<String>) {
        self.fields.text.set(text.into());
    }

    /// Selected voice identifier
    #[must_use]
    pub fn voice_uri(&self) -> Option<String> {
        self.fields.voice_uri.get()
    }

    /// Select a voice by identifier
    pub fn set_voice_uri(&self, voice_uri: Option<String>) {
        self.fields.voice_uri.set(voice_uri);
    }

    /// Language filter
    #[must_use]
    pub fn lang(&self) -> Option<String> {
        self.fields.lang.get()
    }

    /// Set the language filter without touching the voice
    pub fn set_lang(&self, lang: Option<String>) {
        self.fields.lang.set(lang);
    }

    /// Snapshot of every persisted field
    #[must_use]
    pub fn snapshot(&self) -> FormPreferences {
        FormPreferences {
            rate: self.rate(),
            pitch: self.pitch(),
            text: self.text(),
            voice_uri: self.voice_uri(),
            lang: self.lang(),
        }
    }

    /// Speak the current text
    pub fn speak(&self) {
        self.session.speak();
    }

    /// Cancel in-progress speech
    pub fn stop(&self) {
        self.session.stop();
    }

    /// Whether the engine is currently speaking
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.session.is_playing()
    }

    /// Last committed playback duration
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.session.elapsed()
    }

    /// Live playback duration while speaking, otherwise the committed one
    #[must_use]
    pub fn current_elapsed(&self) -> Duration {
        self.session.current_elapsed()
    }

    /// This form's own history
    #[must_use]
    pub fn history(&self) -> &HistoryLog {
        self.session.history()
    }

    /// Underlying speech session
    #[must_use]
    pub fn session(&self) -> &SpeechSession {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SpeechStatus;
    use crate::mock_host::{MockSpeechEngine, MockVoiceSource};
    use crate::preferences::MemoryPreferenceStore;
    use crate::voice_directory::DirectoryConfig;
    use rstest::rstest;

    fn store_with(voices: Vec<Voice>) -> SpeechStore {
        let source = Arc::new(MockVoiceSource::with_voices(voices));
        SpeechStore::new(VoiceDirectory::new(source, DirectoryConfig::default()))
    }

    fn two_voices() -> Vec<Voice> {
        vec![
            Voice::new("v1", "Samantha", "en-US"),
            Voice::new("v2", "Kyoko", "ja-JP"),
        ]
    }

    fn form(store: &SpeechStore) -> (FormController, Arc<MockSpeechEngine>) {
        let engine = Arc::new(MockSpeechEngine::auto_start());
        let form = FormController::new(
            store,
            Arc::new(MemoryPreferenceStore::new()),
            engine.clone(),
        );
        (form, engine)
    }

    #[test]
    fn test_defaults() {
        let store = store_with(two_voices());
        let (form, _) = form(&store);
        assert_eq!(
            form.snapshot(),
            FormPreferences {
                rate: 1.0,
                pitch: 1.0,
                text: "Hello, World!".to_string(),
                voice_uri: None,
                lang: None,
            }
        );
        assert!(form.voice().is_none());
        assert!(form.filtered_voices().is_empty());
    }

    #[test]
    fn test_change_lang_snaps_voice() {
        let store = store_with(two_voices());
        let (form, _) = form(&store);
        assert_eq!(form.langs(), vec!["en-US", "ja-JP"]);

        form.set_lang(Some("ja-JP".to_string()));
        form.on_change_lang();

        assert_eq!(form.voice_uri().as_deref(), Some("v2"));
        assert_eq!(form.voice().map(|v| v.name), Some("Kyoko".to_string()));
    }

    #[test]
    fn test_change_to_unknown_lang_clears_voice() {
        let store = store_with(two_voices());
        let (form, _) = form(&store);
        form.set_voice_uri(Some("v1".to_string()));

        form.select_lang(Some("fr-FR".to_string()));

        assert_eq!(form.voice_uri(), None);
        assert!(form.voice().is_none());
    }

    #[test]
    fn test_stale_voice_uri_yields_none() {
        let store = store_with(two_voices());
        let (form, _) = form(&store);
        form.set_voice_uri(Some("gone".to_string()));
        assert!(form.voice().is_none());
    }

    #[rstest]
    #[case(Some("ja-JP"), "v2")]
    #[case(Some("fr-FR"), "v1")]
    #[case(None, "v1")]
    fn test_initial_voice(#[case] lang: Option<&str>, #[case] expected: &str) {
        let store = store_with(two_voices());
        let (form, _) = form(&store);
        form.set_lang(lang.map(str::to_string));
        assert_eq!(form.initial_voice().map(|v| v.voice_uri).as_deref(), Some(expected));
    }

    #[test]
    fn test_initial_voice_without_voices() {
        let store = store_with(Vec::new());
        let (form, _) = form(&store);
        assert!(form.initial_voice().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_restores_defaults() {
        let store = store_with(two_voices());
        let (form, engine) = form(&store);
        form.set_rate(2.0).unwrap();
        form.set_pitch(0.5).unwrap();
        form.set_text("something else");
        form.select_lang(Some("ja-JP".to_string()));
        form.speak();

        form.reset();

        assert_eq!(engine.cancel_count(), 1);
        assert_eq!(form.rate(), 1.0);
        assert_eq!(form.pitch(), 1.0);
        assert_eq!(form.text(), "Hello, World!");
        assert_eq!(form.lang(), None);
        assert_eq!(form.voice_uri().as_deref(), Some("v1"));
        assert_eq!(form.elapsed(), Duration::ZERO);
        assert!(!form.is_playing());
    }

    #[test]
    fn test_set_rate_and_pitch_validate() {
        let store = store_with(two_voices());
        let (form, _) = form(&store);
        assert!(form.set_rate(0.0).is_err());
        assert!(form.set_pitch(3.0).is_err());
        assert_eq!(form.rate(), 1.0);
        assert_eq!(form.pitch(), 1.0);
    }

    #[test]
    fn test_speak_uses_persisted_fields() {
        let store = store_with(two_voices());
        let (form, engine) = form(&store);
        form.set_text("こんにちは");
        form.select_lang(Some("ja-JP".to_string()));
        form.set_rate(1.25).unwrap();

        form.speak();

        let spoken = engine.spoken();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].text, "こんにちは");
        assert_eq!(spoken[0].voice.as_ref().map(|v| v.voice_uri.as_str()), Some("v2"));
        assert_eq!(spoken[0].lang.as_deref(), Some("ja-JP"));
        assert_eq!(spoken[0].rate, 1.25);
        assert!(form.is_playing());
    }

    #[test]
    fn test_history_mirrored_into_store() {
        let store = store_with(two_voices());
        let (form, engine) = form(&store);

        form.speak();
        engine.emit(SpeechStatus::End);

        assert_eq!(form.history().len(), 2);
        assert_eq!(store.history().entries(), form.history().entries());
    }

    #[test]
    fn test_forms_share_preferences_through_store() {
        let store = store_with(two_voices());
        let preferences: Arc<dyn PreferenceStore> = Arc::new(MemoryPreferenceStore::new());
        let first = FormController::new(
            &store,
            preferences.clone(),
            Arc::new(MockSpeechEngine::new()),
        );
        let second = FormController::new(&store, preferences, Arc::new(MockSpeechEngine::new()));

        first.set_text("shared");
        assert_eq!(second.text(), "shared");
    }
}
